use crate::domain::model::{DidBinding, DidMapping, Peer, PeerId, PeerRoutes, Route, TrunkId};
use std::collections::{HashMap, HashSet};

/// 目的端 DID 在前、來源端新增的接在後面，完全相同的字串視為同一個號碼
pub fn union_dids(destination: &[String], source: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(destination.len() + source.len());
    destination
        .iter()
        .chain(source.iter())
        .filter(|did| seen.insert(did.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub mappings: Vec<DidMapping>,
    /// 缺 DID 或缺上班時段分機而被略過的綁定數
    pub skipped: usize,
}

pub fn extract_mappings(bindings: &[DidBinding]) -> Discovery {
    let mut discovery = Discovery::default();

    for binding in bindings {
        match (binding.number.as_deref(), binding.office_hours_extension()) {
            (Some(did), Some(extension)) if !did.is_empty() && !extension.is_empty() => {
                discovery.mappings.push(DidMapping {
                    did: did.to_string(),
                    extension: extension.to_string(),
                });
            }
            _ => discovery.skipped += 1,
        }
    }

    discovery
}

/// 依首次出現順序去重
pub fn distinct_extensions(mappings: &[DidMapping]) -> Vec<String> {
    let mut seen = HashSet::new();
    mappings
        .iter()
        .filter(|m| seen.insert(m.extension.as_str()))
        .map(|m| m.extension.clone())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PeerIndex {
    by_extension: HashMap<String, PeerId>,
    ids: Vec<PeerId>,
    skipped: usize,
}

impl PeerIndex {
    /// 同一個分機號碼出現多次時以最後一筆為準；沒有 Id 的記錄略過
    pub fn from_peers(peers: &[Peer]) -> Self {
        let mut by_extension = HashMap::new();
        let mut skipped = 0;
        for peer in peers {
            match (&peer.number, peer.id) {
                (Some(number), Some(id)) => {
                    by_extension.insert(number.clone(), id);
                }
                (_, None) => skipped += 1,
                _ => {}
            }
        }

        let mut seen = HashSet::new();
        let ids = peers
            .iter()
            .filter_map(|p| {
                let id = p.id?;
                let winner = by_extension.get(p.number.as_ref()?)?;
                (*winner == id).then_some(id)
            })
            .filter(|id| seen.insert(*id))
            .collect();

        Self {
            by_extension,
            ids,
            skipped,
        }
    }

    pub fn get(&self, extension: &str) -> Option<PeerId> {
        self.by_extension.get(extension).copied()
    }

    pub fn ids(&self) -> &[PeerId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 缺 Id 而被略過的 peer 數
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// 若沒有相同 (DID, trunk) 的路由就附加一筆，回傳是否有新增
pub fn add_route_if_missing(routes: &mut Vec<Route>, did: &str, trunk: TrunkId) -> bool {
    if routes.iter().any(|r| r.targets(did, trunk)) {
        return false;
    }
    routes.push(Route::new(did, trunk));
    true
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePlan {
    /// 每個 peer 寫回的完整路由表，依第一次被對應到的順序
    pub updates: Vec<(PeerId, Vec<Route>)>,
    pub routes_added: usize,
    pub unresolved: usize,
    /// 路由表回應中缺 Id 的項目數
    pub skipped_entries: usize,
}

pub fn plan_route_merge(
    mappings: &[DidMapping],
    peers: &PeerIndex,
    current: Vec<PeerRoutes>,
    destination: TrunkId,
) -> RoutePlan {
    let mut plan = RoutePlan::default();
    let mut tables: HashMap<PeerId, Vec<Route>> = HashMap::new();
    for entry in current {
        match entry.id {
            Some(id) => {
                tables.insert(id, entry.routes);
            }
            None => plan.skipped_entries += 1,
        }
    }

    let mut order: Vec<PeerId> = Vec::new();

    for mapping in mappings {
        let Some(peer) = peers.get(&mapping.extension) else {
            plan.unresolved += 1;
            continue;
        };

        let routes = tables.entry(peer).or_default();
        if add_route_if_missing(routes, &mapping.did, destination) {
            plan.routes_added += 1;
        }
        if !order.contains(&peer) {
            order.push(peer);
        }
    }

    plan.updates = order
        .into_iter()
        .map(|peer| (peer, tables.remove(&peer).unwrap_or_default()))
        .collect();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn mapping(did: &str, extension: &str) -> DidMapping {
        DidMapping {
            did: did.to_string(),
            extension: extension.to_string(),
        }
    }

    fn peer(id: PeerId, number: &str) -> Peer {
        Peer {
            r#type: Some("Extension".to_string()),
            id: Some(id),
            number: Some(number.to_string()),
        }
    }

    fn existing(did: &str, trunk: i64, name: &str) -> Route {
        Route {
            did: Some(serde_json::Value::from(did)),
            trunk_id: Some(serde_json::Value::from(trunk)),
            display_name: Some(name.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_union_keeps_destination_first() {
        let merged = union_dids(&dids(&["200"]), &dids(&["100", "101"]));
        assert_eq!(merged, dids(&["200", "100", "101"]));
    }

    #[test]
    fn test_union_has_no_duplicates_and_is_idempotent() {
        let destination = dids(&["300", "100", "300"]);
        let source = dids(&["100", "101", "101"]);

        let once = union_dids(&destination, &source);
        assert_eq!(once, dids(&["300", "100", "101"]));

        let twice = union_dids(&once, &source);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_union_never_drops_destination_numbers() {
        let destination = dids(&["+3225551000", "3225551000", "200"]);
        let merged = union_dids(&destination, &dids(&["100"]));
        for did in &destination {
            assert!(merged.contains(did));
        }
        // 不做格式正規化
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_union_with_empty_sides() {
        assert_eq!(union_dids(&[], &dids(&["1"])), dids(&["1"]));
        assert_eq!(union_dids(&dids(&["2"]), &[]), dids(&["2"]));
        assert!(union_dids(&[], &[]).is_empty());
    }

    #[test]
    fn test_extract_mappings_skips_incomplete_bindings() {
        let bindings: Vec<DidBinding> = serde_json::from_value(serde_json::json!([
            {"Number": "100", "RoutingRule": {"OfficeHoursDestination": {"Number": "10"}}},
            {"Number": "101", "RoutingRule": null},
            {"Number": "102", "RoutingRule": {"OfficeHoursDestination": {}}},
            {"RoutingRule": {"OfficeHoursDestination": {"Number": "12"}}},
            {"Number": "104", "RoutingRule": {"OfficeHoursDestination": {"Number": "10"}}}
        ]))
        .unwrap();

        let discovery = extract_mappings(&bindings);
        assert_eq!(
            discovery.mappings,
            vec![mapping("100", "10"), mapping("104", "10")]
        );
        assert_eq!(discovery.skipped, 3);
    }

    #[test]
    fn test_distinct_extensions_preserves_first_seen_order() {
        let mappings = vec![
            mapping("1", "20"),
            mapping("2", "10"),
            mapping("3", "20"),
            mapping("4", "30"),
        ];
        assert_eq!(distinct_extensions(&mappings), dids(&["20", "10", "30"]));
    }

    #[test]
    fn test_peer_index_last_duplicate_wins() {
        let index = PeerIndex::from_peers(&[peer(1, "10"), peer(2, "20"), peer(3, "10")]);
        assert_eq!(index.get("10"), Some(3));
        assert_eq!(index.get("20"), Some(2));
        assert_eq!(index.get("99"), None);
        assert_eq!(index.ids(), &[2, 3]);
    }

    #[test]
    fn test_peer_without_id_is_skipped_next_to_valid_peer() {
        let peers: Vec<Peer> = serde_json::from_value(serde_json::json!([
            {"Type": "Extension", "Id": 42, "Number": "10"},
            {"Type": "Extension", "Id": null, "Number": "11"}
        ]))
        .unwrap();

        let index = PeerIndex::from_peers(&peers);
        assert_eq!(index.get("10"), Some(42));
        assert_eq!(index.get("11"), None);
        assert_eq!(index.ids(), &[42]);
        assert_eq!(index.skipped(), 1);

        // 缺 Id 的那筆不會蓋掉同號碼較早的有效記錄
        let index = PeerIndex::from_peers(&[
            peer(42, "10"),
            Peer {
                r#type: None,
                id: None,
                number: Some("10".to_string()),
            },
        ]);
        assert_eq!(index.get("10"), Some(42));
        assert_eq!(index.ids(), &[42]);
    }

    #[test]
    fn test_plan_route_merge_ignores_entries_without_id() {
        let mappings = vec![mapping("100", "10")];
        let peers = PeerIndex::from_peers(&[peer(42, "10")]);
        let current = vec![
            PeerRoutes {
                id: None,
                routes: vec![existing("999", 15, "Orphan")],
            },
            PeerRoutes {
                id: Some(42),
                routes: vec![existing("900", 7, "Old")],
            },
        ];

        let plan = plan_route_merge(&mappings, &peers, current, TrunkId(15));

        assert_eq!(plan.skipped_entries, 1);
        assert_eq!(plan.routes_added, 1);
        assert_eq!(
            plan.updates,
            vec![(
                42,
                vec![existing("900", 7, "Old"), Route::new("100", TrunkId(15))]
            )]
        );
    }

    #[test]
    fn test_add_route_appends_after_existing_routes() {
        let mut routes = vec![existing("900", 7, "Old"), existing("901", 15, "")];
        let before = routes.clone();

        assert!(add_route_if_missing(&mut routes, "100", TrunkId(15)));

        let mut expected = before;
        expected.push(Route::new("100", TrunkId(15)));
        assert_eq!(routes, expected);
    }

    #[test]
    fn test_add_route_does_not_duplicate_existing_pair() {
        let mut routes = vec![existing("100", 15, "Reception")];
        assert!(!add_route_if_missing(&mut routes, "100", TrunkId(15)));
        assert_eq!(routes.len(), 1);
        // 顯示名稱不同也視為已存在
        assert_eq!(routes[0].display_name.as_deref(), Some("Reception"));

        // 同一個 DID 指向其他 trunk 不算重複
        assert!(add_route_if_missing(&mut routes, "100", TrunkId(16)));
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_numeric_did_counts_as_existing_route() {
        let numeric: Route =
            serde_json::from_value(serde_json::json!({"DID": 3225551000u64, "TrunkId": 15}))
                .unwrap();
        let mut routes = vec![numeric.clone()];

        assert!(!add_route_if_missing(&mut routes, "3225551000", TrunkId(15)));
        assert_eq!(routes, vec![numeric]);
    }

    #[test]
    fn test_plan_route_merge_groups_by_peer() {
        let mappings = vec![
            mapping("100", "10"),
            mapping("101", "11"),
            mapping("102", "10"),
            mapping("103", "99"),
        ];
        let peers = PeerIndex::from_peers(&[peer(42, "10"), peer(43, "11")]);
        let current = vec![PeerRoutes {
            id: Some(42),
            routes: vec![existing("100", 15, "")],
        }];

        let plan = plan_route_merge(&mappings, &peers, current, TrunkId(15));

        assert_eq!(plan.routes_added, 2);
        assert_eq!(plan.unresolved, 1);
        assert_eq!(
            plan.updates,
            vec![
                (
                    42,
                    vec![existing("100", 15, ""), Route::new("102", TrunkId(15))]
                ),
                (43, vec![Route::new("101", TrunkId(15))]),
            ]
        );
    }

    #[test]
    fn test_plan_route_merge_rerun_adds_nothing() {
        let mappings = vec![mapping("100", "10")];
        let peers = PeerIndex::from_peers(&[peer(42, "10")]);

        let first = plan_route_merge(&mappings, &peers, Vec::new(), TrunkId(15));
        let (_, routes) = first.updates[0].clone();

        let second = plan_route_merge(
            &mappings,
            &peers,
            vec![PeerRoutes {
                id: Some(42),
                routes,
            }],
            TrunkId(15),
        );
        assert_eq!(second.routes_added, 0);
        assert_eq!(second.updates[0].1.len(), 1);
    }
}
