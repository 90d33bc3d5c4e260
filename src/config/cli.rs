use crate::config::toml_config::TomlConfig;
use crate::config::{auth_settings, AuthSettings, SyncSettings};
use crate::domain::model::TrunkId;
use crate::utils::error::{Result, SyncError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "trunk-sync")]
#[command(about = "Copy DID numbers and office hours routes between 3CX trunks")]
pub struct CliConfig {
    #[arg(long, env = "TRUNK_SYNC_CONFIG", help = "TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TRUNK_SYNC_BASE_URL", help = "PBX address, e.g. https://pbx.example.3cx.eu")]
    pub base_url: Option<String>,

    #[arg(long, env = "TRUNK_SYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "TRUNK_SYNC_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "TRUNK_SYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long)]
    pub concurrent_requests: Option<usize>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Copy numbers and routes from the source trunk into the destination trunk
    Copy {
        #[arg(long)]
        source: Option<TrunkId>,

        #[arg(long)]
        destination: Option<TrunkId>,
    },
    /// List trunks that can be used as a destination
    Trunks {
        #[arg(long, help = "Hide this trunk (usually the source)")]
        exclude: Option<TrunkId>,
    },
}

impl CliConfig {
    /// 讀取設定檔（若有），再以命令列參數覆蓋
    pub fn resolve(&self) -> Result<SyncSettings> {
        let mut settings = match &self.config {
            Some(path) => SyncSettings::from_toml(&TomlConfig::from_file(path)?),
            None => SyncSettings::default(),
        };

        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            settings.timeout_seconds = timeout;
        }
        if let Some(concurrent) = self.concurrent_requests {
            settings.concurrent_requests = concurrent;
        }

        self.check_login_pair()?;
        let cli_auth = auth_settings(
            self.token.clone(),
            self.username.clone(),
            self.password.clone(),
        );
        if cli_auth != AuthSettings::Missing {
            settings.auth = cli_auth;
        }

        if let Command::Copy {
            source,
            destination,
        } = &self.command
        {
            settings.source = source.or(settings.source);
            settings.destination = destination.or(settings.destination);
        }

        settings.verbose |= self.verbose;
        settings.json_logs |= self.json_logs;

        Ok(settings)
    }

    /// 沒給 token 時，帳號與密碼必須同時出現在命令列，不和設定檔混用
    fn check_login_pair(&self) -> Result<()> {
        let has_token = self.token.as_deref().is_some_and(|t| !t.trim().is_empty());
        if has_token {
            return Ok(());
        }
        match (&self.username, &self.password) {
            (Some(_), None) => Err(SyncError::ConfigValidationError {
                field: "password".to_string(),
                message: "--username was given without --password".to_string(),
            }),
            (None, Some(_)) => Err(SyncError::ConfigValidationError {
                field: "username".to_string(),
                message: "--password was given without --username".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
