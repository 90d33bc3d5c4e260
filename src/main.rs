use clap::Parser;
use trunk_sync::domain::ports::{CredentialProvider, PbxApi};
use trunk_sync::utils::{logger, validation::Validate};
use trunk_sync::{CliConfig, Command, Reconciler, SyncError, SyncSettings, TrunkId, XapiClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(settings.verbose, settings.json_logs);
    tracing::info!("Starting trunk-sync");
    if let Some(path) = &cli.config {
        tracing::debug!("Loaded config file {}", path.display());
    }

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let result = match &cli.command {
        Command::Copy { .. } => copy(&settings).await,
        Command::Trunks { exclude } => list_trunks(&settings, *exclude).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ trunk-sync failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        std::process::exit(e.severity().exit_code());
    }

    Ok(())
}

async fn copy(settings: &SyncSettings) -> Result<(), SyncError> {
    let (source, destination) = settings.copy_targets()?;
    let client = settings.http_client()?;
    let credentials = settings.credentials(client.clone())?;
    let api = XapiClient::with_client(&settings.base_url, client);

    let reconciler = Reconciler::from_config(api, credentials, settings);
    let report = reconciler.run(source, destination).await?;

    println!(
        "✅ Trunk {}: {} numbers ({} new)",
        report.destination, report.merged_dids, report.added_dids
    );
    println!(
        "📞 Routes added: {} across {} peers",
        report.routes_added, report.peers_written
    );
    if report.skipped_bindings > 0 || report.unresolved_mappings > 0 {
        println!(
            "⚠️  Skipped {} numbers without an office hours extension, {} with no matching peer",
            report.skipped_bindings, report.unresolved_mappings
        );
    }
    if report.skipped_peers > 0 {
        println!("⚠️  Ignored {} peer records without an Id", report.skipped_peers);
    }
    if !report.failed_peers.is_empty() {
        println!("⚠️  Route update failed for peers: {:?}", report.failed_peers);
    }
    tracing::debug!("Report: {:?}", report);

    Ok(())
}

async fn list_trunks(
    settings: &SyncSettings,
    exclude: Option<TrunkId>,
) -> Result<(), SyncError> {
    let client = settings.http_client()?;
    let credentials = settings.credentials(client.clone())?;
    let api = XapiClient::with_client(&settings.base_url, client);

    let token = credentials.bearer_token().await?;
    let trunks = api.list_trunks(&token).await?;

    for trunk in trunks.iter().filter(|t| Some(t.id) != exclude) {
        println!("{}\t{}", trunk.id, trunk.display_name());
    }

    Ok(())
}
