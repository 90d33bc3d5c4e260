use crate::domain::model::{
    DidBinding, ODataList, Peer, PeerId, PeerRoutes, Route, TrunkDids, TrunkId, TrunkSummary,
    WriteOutcome,
};
use crate::domain::ports::{ConfigProvider, PbxApi};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 3CX XAPI (`/xapi/v1`) 的 HTTP 客戶端
#[derive(Debug, Clone)]
pub struct XapiClient {
    base_url: String,
    client: Client,
}

impl XapiClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(config.base_url(), client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/xapi/v1/{}", self.base_url, path)
    }

    fn get(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    fn post<B: Serialize + ?Sized>(&self, token: &str, path: &str, body: &B) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(body)
    }

    /// 讀取一律要求 2xx，否則視為致命錯誤
    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!("{} response status: {}", operation, response.status());

        if !response.status().is_success() {
            return Err(unexpected_status(operation, response).await);
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, operation: &str, request: RequestBuilder) -> Result<WriteOutcome> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} response status: {}", operation, status);
        Ok(WriteOutcome { status, body })
    }
}

async fn unexpected_status(operation: &str, response: Response) -> SyncError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SyncError::UnexpectedStatus {
        operation: operation.to_string(),
        status,
        body,
    }
}

/// `Number eq 'a' or Number eq 'b'`，單引號依 OData 規則重複
pub fn peer_filter(extensions: &[String]) -> String {
    extensions
        .iter()
        .map(|ext| format!("Number eq '{}'", ext.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[async_trait]
impl PbxApi for XapiClient {
    async fn list_trunks(&self, token: &str) -> Result<Vec<TrunkSummary>> {
        let request = self.get(token, "Trunks").query(&[("$select", "Id,Gateway")]);
        let list: ODataList<TrunkSummary> = self.read_json("list trunks", request).await?;
        Ok(list.value)
    }

    async fn trunk_dids(&self, token: &str, trunk: TrunkId) -> Result<Vec<String>> {
        let request = self
            .get(token, &format!("Trunks({})", trunk))
            .query(&[("$select", "DidNumbers")]);
        let dids: TrunkDids = self.read_json("read trunk DIDs", request).await?;
        Ok(dids.did_numbers)
    }

    async fn patch_trunk_dids(
        &self,
        token: &str,
        trunk: TrunkId,
        dids: &[String],
    ) -> Result<WriteOutcome> {
        let body = serde_json::json!({ "DidNumbers": dids });
        let request = self
            .client
            .patch(self.url(&format!("Trunks({})", trunk)))
            .bearer_auth(token)
            .json(&body);
        self.write("patch trunk DIDs", request).await
    }

    async fn did_bindings(&self, token: &str, trunk: TrunkId) -> Result<Vec<DidBinding>> {
        let filter = format!("TrunkId eq {}", trunk);
        let request = self.get(token, "DidNumbers").query(&[
            ("$select", "Number,TrunkId"),
            ("$expand", "RoutingRule"),
            ("$filter", filter.as_str()),
        ]);
        let list: ODataList<DidBinding> = self.read_json("read DID routing", request).await?;
        Ok(list.value)
    }

    async fn resolve_peers(&self, token: &str, extensions: &[String]) -> Result<Vec<Peer>> {
        let filter = peer_filter(extensions);
        let request = self
            .get(token, "Peers")
            .query(&[("$filter", filter.as_str()), ("$select", "Type,Id,Number")]);
        let list: ODataList<Peer> = self.read_json("resolve peers", request).await?;
        Ok(list.value)
    }

    async fn peer_routes(&self, token: &str, peers: &[PeerId]) -> Result<Vec<PeerRoutes>> {
        let body = serde_json::json!({ "ids": peers });
        let request = self.post(token, "Defs/Pbx.GetRoutes", &body);
        let list: ODataList<PeerRoutes> = self.read_json("read peer routes", request).await?;
        Ok(list.value)
    }

    async fn set_peer_routes(
        &self,
        token: &str,
        peer: PeerId,
        routes: &[Route],
    ) -> Result<WriteOutcome> {
        let body = serde_json::json!({
            "routes": {
                "Id": peer,
                "Routes": routes,
            }
        });
        let request = self.post(token, "Trunks/Pbx.SetRoutes", &body);
        self.write("set peer routes", request).await
    }
}
