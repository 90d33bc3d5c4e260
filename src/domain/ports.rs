use crate::domain::model::{
    DidBinding, Peer, PeerId, PeerRoutes, Route, TrunkId, TrunkSummary, WriteOutcome,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 遠端 PBX 設定 API
///
/// 每個呼叫都帶著呼叫端提供的 bearer token；實作只負責傳輸，
/// 寫入的狀態碼如何解讀由 `Reconciler` 決定。
#[async_trait]
pub trait PbxApi: Send + Sync {
    async fn list_trunks(&self, token: &str) -> Result<Vec<TrunkSummary>>;

    async fn trunk_dids(&self, token: &str, trunk: TrunkId) -> Result<Vec<String>>;

    /// 以 `dids` 整組取代 trunk 的 DID 清單
    async fn patch_trunk_dids(
        &self,
        token: &str,
        trunk: TrunkId,
        dids: &[String],
    ) -> Result<WriteOutcome>;

    async fn did_bindings(&self, token: &str, trunk: TrunkId) -> Result<Vec<DidBinding>>;

    async fn resolve_peers(&self, token: &str, extensions: &[String]) -> Result<Vec<Peer>>;

    async fn peer_routes(&self, token: &str, peers: &[PeerId]) -> Result<Vec<PeerRoutes>>;

    /// 以 `routes` 整組取代單一 peer 的路由表
    async fn set_peer_routes(
        &self,
        token: &str,
        peer: PeerId,
        routes: &[Route],
    ) -> Result<WriteOutcome>;
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn concurrent_requests(&self) -> usize;
}
