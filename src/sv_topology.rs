use chrono::Duration;
use hashbrown::HashSet;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Deserialize;

use crate::sv_error::ViewError;
use crate::sv_interface::{NodeId, SvTime, MIN_GROUP_SIZE, NOISE_GROUP, TIMEOUT_SECS};
use crate::sv_records::{AuthStatus, LinkStatus, Payload, Record};

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for liveness and grouping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// A node is alive while `last_update + timeout_secs > now` (default: 4)
    pub timeout_secs: i64,

    /// Components below this size are drawn as noise (default: 3)
    pub min_group_size: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: TIMEOUT_SECS,
            min_group_size: MIN_GROUP_SIZE,
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// Last known state of one simulated node
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) enabled: bool,
    pub(crate) group: usize,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) links: Vec<NodeId>,
    pub(crate) required_1d: HashSet<NodeId>,
    pub(crate) required_2d: HashSet<NodeId>,
    pub(crate) seed_link_status: LinkStatus,
    pub(crate) node_link_status: LinkStatus,
    pub(crate) auth_status: AuthStatus,
    pub(crate) is_only_one: bool,
    pub(crate) last_update: SvTime,
}

impl Node {
    fn new(id: NodeId, first_seen: SvTime) -> Self {
        Self {
            id,
            enabled: true,
            group: NOISE_GROUP,
            x: 0.0,
            y: 0.0,
            links: Vec::new(),
            required_1d: HashSet::new(),
            required_2d: HashSet::new(),
            seed_link_status: LinkStatus::default(),
            node_link_status: LinkStatus::default(),
            auth_status: AuthStatus::default(),
            is_only_one: false,
            last_update: first_seen,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn links(&self) -> &[NodeId] {
        &self.links
    }

    pub fn seed_link_status(&self) -> LinkStatus {
        self.seed_link_status
    }

    pub fn node_link_status(&self) -> LinkStatus {
        self.node_link_status
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.auth_status
    }

    pub fn is_only_one(&self) -> bool {
        self.is_only_one
    }

    pub fn last_update(&self) -> SvTime {
        self.last_update
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.links.iter().any(|l| l == id)
    }

    pub fn has_required_1d(&self, id: &str) -> bool {
        self.required_1d.contains(id)
    }

    pub fn has_required_2d(&self, id: &str) -> bool {
        self.required_2d.contains(id)
    }

    fn apply(&mut self, payload: Payload) {
        match payload {
            Payload::CurrentPosition { x, y } => {
                self.x = x;
                self.y = y;
            }
            Payload::Links(nids) => self.links = nids,
            Payload::Routing1DRequired(nids) => self.required_1d = nids.into_iter().collect(),
            Payload::Routing2DRequired(nids) => self.required_2d = nids.into_iter().collect(),
            Payload::LinkStatus {
                seed,
                node,
                auth,
                only_one,
            } => {
                self.seed_link_status = seed;
                self.node_link_status = node;
                self.auth_status = auth;
                self.is_only_one = only_one;
            }
            Payload::Ignored => {}
        }
    }
}

// ============================================================================
// Topology
// ============================================================================

/// Live node graph rebuilt from the log, one tick at a time
///
/// Nodes are kept in first-seen order and never removed; a node that stops
/// reporting is only marked disabled. `enabled` and `group` are recomputed in
/// full every tick.
pub struct Topology {
    pub(crate) config: TopologyConfig,
    pub(crate) nodes: IndexMap<NodeId, Node>,
}

impl Topology {
    pub fn new() -> Self {
        Self::with_config(TopologyConfig::default())
    }

    pub fn with_config(config: TopologyConfig) -> Self {
        Self {
            config,
            nodes: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in first-seen order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.nodes.values().filter(|n| n.enabled).count()
    }

    /// Fold one tick's records into the graph.
    ///
    /// Records are applied in the order given; a later record for the same
    /// field wins. A payload that fails to decode aborts the whole tick.
    /// Returns the number of records applied.
    pub fn ingest(&mut self, records: &[Record]) -> Result<usize, ViewError> {
        let mut applied = 0;
        for record in records {
            let payload = record.decode()?;
            if payload == Payload::Ignored {
                trace!(
                    "skipping `{}` record from node {}",
                    record.message,
                    record.node_id
                );
                continue;
            }

            let node = self
                .nodes
                .entry(record.node_id.clone())
                .or_insert_with(|| Node::new(record.node_id.clone(), record.timestamp));
            node.last_update = record.timestamp;
            node.apply(payload);
            applied += 1;
        }

        debug!(
            "ingested {} of {} records, {} nodes known",
            applied,
            records.len(),
            self.nodes.len()
        );
        Ok(applied)
    }

    /// Recompute every node's `enabled` flag for `current`.
    ///
    /// A node whose own heartbeat timed out stays enabled when a fresh
    /// neighbour it links to still links back to it. Only the neighbour's
    /// timestamp and links are consulted, never its `enabled` flag, so the
    /// result does not depend on iteration order.
    pub fn refresh_liveness(&mut self, current: SvTime) {
        let timeout = Duration::seconds(self.config.timeout_secs);
        let is_fresh = |node: &Node| node.last_update + timeout > current;

        let liveness: Vec<bool> = self
            .nodes
            .values()
            .map(|node| {
                is_fresh(node)
                    || node.links.iter().any(|nid| {
                        self.nodes
                            .get(nid)
                            .map_or(false, |next| is_fresh(next) && next.has_link(&node.id))
                    })
            })
            .collect();

        for (node, alive) in self.nodes.values_mut().zip(liveness) {
            node.enabled = alive;
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv_records::{Coordinate, CurrentPositionParam, LinkStatusParam, MessageKind, NidsParam};
    use chrono::NaiveDate;

    fn at(sec: u32) -> SvTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    fn links(nid: &str, time: SvTime, to: &[&str]) -> Record {
        let param = NidsParam {
            nids: to.iter().map(|s| s.to_string()).collect(),
        };
        Record::with_param(nid, MessageKind::Links, time, &param).unwrap()
    }

    fn position(nid: &str, time: SvTime, x: f64, y: f64) -> Record {
        let param = CurrentPositionParam {
            coordinate: Coordinate { x, y },
        };
        Record::with_param(nid, MessageKind::CurrentPosition, time, &param).unwrap()
    }

    #[test]
    fn test_ingest_creates_node_with_defaults() {
        let mut topology = Topology::new();
        topology.ingest(&[links("a", at(0), &["b"])]).unwrap();

        let a = topology.node("a").unwrap();
        assert!(a.is_enabled());
        assert_eq!(a.group(), NOISE_GROUP);
        assert_eq!(a.position(), (0.0, 0.0));
        assert_eq!(a.links(), &["b".to_string()]);
        assert_eq!(a.last_update(), at(0));
        // a link target is not a node until it reports
        assert!(topology.node("b").is_none());
    }

    #[test]
    fn test_ingest_last_write_wins() {
        let mut topology = Topology::new();
        topology
            .ingest(&[
                position("a", at(0), 1.0, 2.0),
                links("a", at(0), &["b", "c"]),
                position("a", at(0), 3.0, 4.0),
                links("a", at(0), &["d"]),
            ])
            .unwrap();

        let a = topology.node("a").unwrap();
        assert_eq!(a.position(), (3.0, 4.0));
        assert_eq!(a.links(), &["d".to_string()]);
    }

    #[test]
    fn test_ingest_same_record_twice_is_idempotent() {
        let record = links("a", at(1), &["b", "c"]);

        let mut once = Topology::new();
        once.ingest(&[record.clone()]).unwrap();
        let mut twice = Topology::new();
        twice.ingest(&[record.clone(), record]).unwrap();

        let (a1, a2) = (once.node("a").unwrap(), twice.node("a").unwrap());
        assert_eq!(a1.links(), a2.links());
        assert_eq!(a1.last_update(), a2.last_update());
        assert_eq!(a1.position(), a2.position());
    }

    #[test]
    fn test_ingest_link_status_overwrites_all_fields() {
        let mut topology = Topology::new();
        let status = |seed, node, auth, onlyone| LinkStatusParam {
            seed,
            node,
            auth,
            onlyone,
        };
        topology
            .ingest(&[
                Record::with_param("a", MessageKind::LinkStatus, at(0), &status(2, 2, 1, true))
                    .unwrap(),
                Record::with_param("a", MessageKind::LinkStatus, at(1), &status(0, 3, 2, false))
                    .unwrap(),
            ])
            .unwrap();

        let a = topology.node("a").unwrap();
        assert_eq!(a.seed_link_status(), LinkStatus::Offline);
        assert_eq!(a.node_link_status(), LinkStatus::Closing);
        assert_eq!(a.auth_status(), AuthStatus::Failure);
        assert!(!a.is_only_one());
    }

    #[test]
    fn test_ingest_routing_requirements() {
        let mut topology = Topology::new();
        let required_1d = NidsParam {
            nids: vec!["b".to_string()],
        };
        let required_2d = serde_json::json!({"nids": {"c": {"x": 0.5, "y": 0.5}}});
        topology
            .ingest(&[
                Record::with_param("a", MessageKind::Routing1DRequired, at(0), &required_1d)
                    .unwrap(),
                Record::with_param("a", MessageKind::Routing2DRequired, at(0), &required_2d)
                    .unwrap(),
            ])
            .unwrap();

        let a = topology.node("a").unwrap();
        assert!(a.has_required_1d("b"));
        assert!(!a.has_required_1d("c"));
        assert!(a.has_required_2d("c"));
        assert!(!a.has_required_2d("b"));
    }

    #[test]
    fn test_ingest_decode_error_aborts() {
        let mut topology = Topology::new();
        let bad = Record::new("a", MessageKind::Links, at(0), b"{\"nids\": 5}".to_vec());
        let result = topology.ingest(&[bad]);
        assert!(matches!(result, Err(ViewError::Decode(_))));
        assert!(topology.is_empty());
    }

    #[test]
    fn test_ingest_skips_unknown_messages() {
        let mut topology = Topology::new();
        let other = Record::new(
            "a",
            MessageKind::Other("debug".to_string()),
            at(0),
            b"{}".to_vec(),
        );
        assert_eq!(topology.ingest(&[other]).unwrap(), 0);
        assert!(topology.node("a").is_none());
    }

    #[test]
    fn test_liveness_direct_timeout() {
        let mut topology = Topology::new();
        topology.ingest(&[links("a", at(0), &[])]).unwrap();

        topology.refresh_liveness(at(3));
        assert!(topology.node("a").unwrap().is_enabled());

        // last_update + 4 > current is strict
        topology.refresh_liveness(at(4));
        assert!(!topology.node("a").unwrap().is_enabled());
    }

    #[test]
    fn test_liveness_reciprocal_rescue() {
        let mut topology = Topology::new();
        topology
            .ingest(&[links("a", at(0), &["b"]), links("b", at(10), &["a"])])
            .unwrap();

        topology.refresh_liveness(at(10));
        assert!(topology.node("a").unwrap().is_enabled());
        assert!(topology.node("b").unwrap().is_enabled());
    }

    #[test]
    fn test_liveness_no_rescue_without_reciprocity() {
        let mut topology = Topology::new();
        topology
            .ingest(&[links("a", at(0), &["b"]), links("b", at(10), &[])])
            .unwrap();

        topology.refresh_liveness(at(10));
        assert!(!topology.node("a").unwrap().is_enabled());
        assert!(topology.node("b").unwrap().is_enabled());
    }

    #[test]
    fn test_liveness_rescue_requires_fresh_peer() {
        // both stale: mutual links alone do not keep either alive
        let mut topology = Topology::new();
        topology
            .ingest(&[links("a", at(0), &["b"]), links("b", at(1), &["a"])])
            .unwrap();

        topology.refresh_liveness(at(10));
        assert!(!topology.node("a").unwrap().is_enabled());
        assert!(!topology.node("b").unwrap().is_enabled());
    }

    #[test]
    fn test_liveness_timeline() {
        // a reports once at t0; b lists a every tick through t5
        let mut topology = Topology::new();
        topology.ingest(&[links("a", at(0), &["b"])]).unwrap();

        for t in 0..=5 {
            topology.ingest(&[links("b", at(t), &["a"])]).unwrap();
            topology.refresh_liveness(at(t));
            assert!(topology.node("a").unwrap().is_enabled(), "a at t{}", t);
            assert!(topology.node("b").unwrap().is_enabled(), "b at t{}", t);
        }

        // b still fresh at t6..t8, so a stays rescued
        topology.refresh_liveness(at(8));
        assert!(topology.node("a").unwrap().is_enabled());

        // b's last update (t5) times out at t9, taking a with it
        topology.refresh_liveness(at(9));
        assert!(!topology.node("a").unwrap().is_enabled());
        assert!(!topology.node("b").unwrap().is_enabled());
    }

    #[test]
    fn test_liveness_custom_timeout() {
        let mut topology = Topology::with_config(TopologyConfig {
            timeout_secs: 10,
            ..Default::default()
        });
        topology.ingest(&[links("a", at(0), &[])]).unwrap();
        topology.refresh_liveness(at(9));
        assert!(topology.node("a").unwrap().is_enabled());
        topology.refresh_liveness(at(10));
        assert!(!topology.node("a").unwrap().is_enabled());
    }

    #[test]
    fn test_nodes_keep_first_seen_order() {
        let mut topology = Topology::new();
        topology
            .ingest(&[
                links("c", at(0), &[]),
                links("a", at(0), &[]),
                links("b", at(0), &[]),
                links("a", at(1), &[]),
            ])
            .unwrap();

        let order: Vec<&str> = topology.nodes().map(|n| n.id()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
