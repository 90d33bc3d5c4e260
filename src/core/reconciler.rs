use crate::core::merge::{self, PeerIndex};
use crate::domain::model::{PeerId, ReconcileReport, Route, Stage, TrunkId};
use crate::domain::ports::{ConfigProvider, CredentialProvider, PbxApi};
use crate::utils::error::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;

const PATCH_NO_CONTENT: u16 = 204;

/// 把來源 trunk 的 DID 與上班時段路由複製到目的 trunk，只新增、不刪除
pub struct Reconciler<A: PbxApi + 'static, C: CredentialProvider> {
    api: Arc<A>,
    credentials: C,
    concurrent_requests: usize,
}

impl<A: PbxApi + 'static, C: CredentialProvider> Reconciler<A, C> {
    pub fn new(api: A, credentials: C) -> Self {
        Self {
            api: Arc::new(api),
            credentials,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
        }
    }

    /// 以設定中的同時請求數建立
    pub fn from_config<P: ConfigProvider>(api: A, credentials: C, config: &P) -> Self {
        Self::new(api, credentials).with_concurrency(config.concurrent_requests())
    }

    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub async fn run(&self, source: TrunkId, destination: TrunkId) -> Result<ReconcileReport> {
        let token = self.credentials.bearer_token().await?;
        let mut report = ReconcileReport::new(source, destination);

        tracing::info!("📞 Copying numbers from trunk {} to trunk {}", source, destination);

        // 1. DID 合併；失敗就整個中止，後面的路由階段都不做
        self.merge_dids(&token, &mut report).await?;

        // 2. 路由探索
        report.last_stage = Stage::RouteDiscovery;
        let bindings = self.api.did_bindings(&token, source).await?;
        let discovery = merge::extract_mappings(&bindings);
        report.bindings_seen = bindings.len();
        report.skipped_bindings = discovery.skipped;
        report.mappings = discovery.mappings.len();

        if discovery.skipped > 0 {
            tracing::debug!(
                "Skipped {} bindings without a DID or office hours destination",
                discovery.skipped
            );
        }
        if discovery.mappings.is_empty() {
            tracing::info!("No routed numbers on trunk {}, nothing to route", source);
            return Ok(report.finish());
        }
        tracing::info!("🔎 Found {} routed numbers on trunk {}", report.mappings, source);

        // 3. 分機 -> peer id
        report.last_stage = Stage::PeerResolution;
        let extensions = merge::distinct_extensions(&discovery.mappings);
        let peers = self.api.resolve_peers(&token, &extensions).await?;
        let index = PeerIndex::from_peers(&peers);
        report.peers_resolved = index.ids().len();
        report.skipped_peers = index.skipped();

        if index.skipped() > 0 {
            tracing::warn!("⚠️ Skipped {} peer records without an Id", index.skipped());
        }

        if index.is_empty() {
            tracing::info!(
                "None of {} extensions resolved to a peer, nothing to route",
                extensions.len()
            );
            return Ok(report.finish());
        }

        // 4. 路由合併
        report.last_stage = Stage::RouteMerge;
        let current = self.api.peer_routes(&token, index.ids()).await?;
        let plan = merge::plan_route_merge(&discovery.mappings, &index, current, destination);
        report.routes_added = plan.routes_added;
        report.unresolved_mappings = plan.unresolved;
        report.skipped_peers += plan.skipped_entries;

        if plan.skipped_entries > 0 {
            tracing::warn!(
                "⚠️ Skipped {} route tables without a peer Id",
                plan.skipped_entries
            );
        }

        if plan.unresolved > 0 {
            tracing::debug!("{} numbers route to extensions with no peer", plan.unresolved);
        }

        let (written, failed) = self.write_routes(&token, plan.updates).await;
        report.peers_written = written;
        report.failed_peers = failed;

        tracing::info!(
            "✅ Trunk {} now has {} numbers; added {} routes across {} peers ({} failed)",
            destination,
            report.merged_dids,
            report.routes_added,
            report.peers_written,
            report.failed_peers.len()
        );

        Ok(report.finish())
    }

    async fn merge_dids(&self, token: &str, report: &mut ReconcileReport) -> Result<()> {
        let (source_dids, destination_dids) = tokio::try_join!(
            self.api.trunk_dids(token, report.source),
            self.api.trunk_dids(token, report.destination),
        )?;

        let merged = merge::union_dids(&destination_dids, &source_dids);
        tracing::debug!(
            "Merging {} source numbers into {} destination numbers",
            source_dids.len(),
            destination_dids.len()
        );

        let outcome = self
            .api
            .patch_trunk_dids(token, report.destination, &merged)
            .await?;

        if outcome.status != PATCH_NO_CONTENT {
            tracing::error!(
                "Destination trunk {} rejected the number list with status {}",
                report.destination,
                outcome.status
            );
            return Err(SyncError::DestinationPatchRejected {
                trunk: report.destination.to_string(),
                status: outcome.status,
                body: outcome.body,
            });
        }

        report.merged_dids = merged.len();
        report.added_dids = merged.len().saturating_sub(destination_dids.len());
        tracing::info!(
            "📋 Trunk {} numbers merged: {} total, {} new",
            report.destination,
            report.merged_dids,
            report.added_dids
        );
        Ok(())
    }

    /// 各 peer 獨立寫入，單一 peer 失敗只記錄；回傳成功數與失敗的 peer id
    async fn write_routes(
        &self,
        token: &str,
        updates: Vec<(PeerId, Vec<Route>)>,
    ) -> (usize, Vec<PeerId>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrent_requests));
        let mut tasks = JoinSet::new();

        for (peer, routes) in updates {
            let api = Arc::clone(&self.api);
            let token = token.to_string();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                tracing::debug!("Writing {} routes for peer {}", routes.len(), peer);
                let outcome = api.set_peer_routes(&token, peer, &routes).await;
                (peer, outcome)
            });
        }

        let mut written = 0;
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) if outcome.is_success() => written += 1,
                Ok((peer, Ok(outcome))) => {
                    tracing::warn!(
                        "Failed to set routes for peer {} (status {}): {}",
                        peer,
                        outcome.status,
                        outcome.body
                    );
                    failed.push(peer);
                }
                Ok((peer, Err(e))) => {
                    tracing::warn!("Failed to set routes for peer {}: {}", peer, e);
                    failed.push(peer);
                }
                Err(e) => {
                    tracing::error!("Route write task aborted: {}", e);
                }
            }
        }

        failed.sort_unstable();
        (written, failed)
    }
}
