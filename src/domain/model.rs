use crate::utils::error::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trunk 的數字識別碼（XAPI 的 `Trunks(<id>)`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrunkId(pub i64);

impl fmt::Display for TrunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrunkId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TrunkId)
            .map_err(|_| SyncError::InvalidTrunkId {
                value: s.to_string(),
            })
    }
}

pub type PeerId = i64;

/// OData 列表回應的外層 `{ "value": [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ODataList<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrunkDids {
    #[serde(default, deserialize_with = "null_as_default")]
    pub did_numbers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Gateway {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrunkSummary {
    pub id: TrunkId,
    #[serde(default)]
    pub gateway: Option<Gateway>,
}

impl TrunkSummary {
    pub fn display_name(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Trunk {}", self.id))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    #[serde(default)]
    pub office_hours_destination: Option<Destination>,
}

/// DID 與其路由規則的綁定
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DidBinding {
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default)]
    pub routing_rule: Option<RoutingRule>,
}

impl DidBinding {
    pub fn office_hours_extension(&self) -> Option<&str> {
        self.routing_rule
            .as_ref()?
            .office_hours_destination
            .as_ref()?
            .number
            .as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Peer {
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub id: Option<PeerId>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
}

/// Peer 路由表中的一筆路由
///
/// 未知欄位會保留在 `extra`，寫回時原樣送出。DID 與 TrunkId 保留原始 JSON 值
/// （字串或數字都有可能），只在比對時轉成文字。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "DID", default, skip_serializing_if = "Option::is_none")]
    pub did: Option<serde_json::Value>,
    #[serde(rename = "TrunkId", default, skip_serializing_if = "Option::is_none")]
    pub trunk_id: Option<serde_json::Value>,
    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Route {
    pub fn new(did: &str, trunk: TrunkId) -> Self {
        Self {
            did: Some(serde_json::Value::String(did.to_string())),
            trunk_id: Some(serde_json::Value::from(trunk.0)),
            display_name: Some(String::new()),
            extra: serde_json::Map::new(),
        }
    }

    /// 只比對 DID 與 trunk，不比對顯示名稱
    pub fn targets(&self, did: &str, trunk: TrunkId) -> bool {
        scalar_text(self.did.as_ref()).as_deref() == Some(did)
            && scalar_text(self.trunk_id.as_ref()).as_deref() == Some(trunk.to_string().as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerRoutes {
    #[serde(default)]
    pub id: Option<PeerId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<Route>,
}

/// 來源 trunk 上一個 DID 對應到的分機
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidMapping {
    pub did: String,
    pub extension: String,
}

/// 一次遠端寫入的結果，狀態碼的判斷交給呼叫端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub status: u16,
    pub body: String,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    DidMerge,
    RouteDiscovery,
    PeerResolution,
    RouteMerge,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub source: TrunkId,
    pub destination: TrunkId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 最後一個執行到的階段
    pub last_stage: Stage,
    pub merged_dids: usize,
    pub added_dids: usize,
    pub bindings_seen: usize,
    pub skipped_bindings: usize,
    pub mappings: usize,
    pub peers_resolved: usize,
    /// 回應中缺 Id 而被略過的 peer 記錄
    pub skipped_peers: usize,
    pub unresolved_mappings: usize,
    pub routes_added: usize,
    pub peers_written: usize,
    pub failed_peers: Vec<PeerId>,
}

impl ReconcileReport {
    pub fn new(source: TrunkId, destination: TrunkId) -> Self {
        Self {
            source,
            destination,
            started_at: Utc::now(),
            finished_at: None,
            last_stage: Stage::DidMerge,
            merged_dids: 0,
            added_dids: 0,
            bindings_seen: 0,
            skipped_bindings: 0,
            mappings: 0,
            peers_resolved: 0,
            skipped_peers: 0,
            unresolved_mappings: 0,
            routes_added: 0,
            peers_written: 0,
            failed_peers: Vec::new(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 字串照收，數字轉成字串，其餘（null、空字串、物件）視為缺值
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn scalar_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
