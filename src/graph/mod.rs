// Network graph model
//
// Turns the active window of traffic events into a classified node set and a
// weighted link set. Nodes are kept in a map keyed by address and reconciled
// by set difference on every update; links are rebuilt from scratch each
// time so their weights only ever reflect the current window.

pub mod layout;

use crate::traffic::{SubnetPlan, TrafficEvent};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Number of most recent events that define the visible graph
pub const DEFAULT_WINDOW_SIZE: usize = 200;

/// Node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeClass {
    /// The fixed network gateway, always present and pinned at the center
    Gateway,
    /// Host inside the local subnet
    LocalHost,
    /// Host outside the local subnet
    ExternalHost,
    /// Source of at least one attack-flagged event in the window
    Attacker,
}

impl NodeClass {
    /// Visual radius in layout units
    pub fn radius(&self) -> f64 {
        match self {
            Self::Gateway => 25.0,
            Self::Attacker => 20.0,
            Self::LocalHost => 14.0,
            Self::ExternalHost => 8.0,
        }
    }

    /// Short name for legends and detail panels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gateway => "Gateway",
            Self::LocalHost => "Local",
            Self::ExternalHost => "External",
            Self::Attacker => "Attacker",
        }
    }
}

/// A host in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Network address, also the node's identity
    pub id: String,
    pub class: NodeClass,
    pub label: String,
}

/// Unordered pair of node addresses
///
/// The endpoints are stored sorted so `(a, b)` and `(b, a)` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    a: String,
    b: String,
}

impl LinkKey {
    /// Build a key for two distinct addresses; self-links have no key
    pub fn new(x: &str, y: &str) -> Option<Self> {
        match x.cmp(y) {
            std::cmp::Ordering::Less => Some(Self {
                a: x.to_string(),
                b: y.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                a: y.to_string(),
                b: x.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

/// A weighted, undirected link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLink {
    pub key: LinkKey,
    /// Number of window events mapped onto this link
    pub weight: u32,
}

impl GraphLink {
    pub fn source(&self) -> &str {
        self.key.endpoints().0
    }

    pub fn target(&self) -> &str {
        self.key.endpoints().1
    }
}

/// How a single event contributes to the link set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// One link between the two endpoints
    Direct(LinkKey),
    /// Traffic crossing the subnet boundary, drawn as two hops via the gateway
    ViaGateway {
        local_leg: Option<LinkKey>,
        external_leg: Option<LinkKey>,
    },
    /// Source and destination are the same address
    SelfTraffic,
}

impl Route {
    /// Every link key this route puts one unit of weight on
    pub fn legs(&self) -> impl Iterator<Item = &LinkKey> {
        let pair: [Option<&LinkKey>; 2] = match self {
            Route::Direct(key) => [Some(key), None],
            Route::ViaGateway {
                local_leg,
                external_leg,
            } => [local_leg.as_ref(), external_leg.as_ref()],
            Route::SelfTraffic => [None, None],
        };
        pair.into_iter().flatten()
    }
}

/// Map an event onto the link(s) it contributes to
///
/// Local-to-local and external-to-external traffic is a direct link. Traffic
/// between a local and an external host (in either direction) is split into a
/// local-to-gateway leg and a gateway-to-external leg, each counted once. A
/// leg that would connect the gateway to itself is omitted.
pub fn route_event(event: &TrafficEvent, plan: &SubnetPlan) -> Route {
    let src = event.source_ip.as_str();
    let dst = event.dest_ip.as_str();
    let src_local = plan.is_local(src);
    let dst_local = plan.is_local(dst);

    if src_local != dst_local {
        let (local, external) = if src_local { (src, dst) } else { (dst, src) };
        return Route::ViaGateway {
            local_leg: LinkKey::new(local, &plan.gateway),
            external_leg: LinkKey::new(&plan.gateway, external),
        };
    }

    match LinkKey::new(src, dst) {
        Some(key) => Route::Direct(key),
        None => Route::SelfTraffic,
    }
}

/// Graph builder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    pub plan: SubnetPlan,

    /// Number of most recent events that form the active window
    pub window_size: usize,

    /// Keep the gateway classified as `Gateway` even if it shows up as an
    /// attack source. Defaults to true, which keeps exactly one `Gateway`
    /// node at all times; the plain tie-break ranks `Attacker` above
    /// `Gateway`, and setting this to false restores it (the gateway node is
    /// then drawn as an attacker while the spoofed events stay in the window).
    pub protect_gateway: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            plan: SubnetPlan::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            protect_gateway: true,
        }
    }
}

/// What changed in the last reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// (address, previous class, new class)
    pub reclassified: Vec<(String, NodeClass, NodeClass)>,
    pub links_changed: bool,
}

impl GraphDelta {
    /// Whether anything visible to the layout changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.reclassified.is_empty()
            && !self.links_changed
    }
}

/// Classify an address against the current window's evidence
///
/// Order: attacker, gateway, local subnet, external. With `protect_gateway`
/// the gateway check is moved ahead of the attacker check.
pub fn classify(
    address: &str,
    attackers: &HashSet<&str>,
    plan: &SubnetPlan,
    protect_gateway: bool,
) -> NodeClass {
    if protect_gateway && plan.is_gateway(address) {
        NodeClass::Gateway
    } else if attackers.contains(address) {
        NodeClass::Attacker
    } else if plan.is_gateway(address) {
        NodeClass::Gateway
    } else if plan.is_local(address) {
        NodeClass::LocalHost
    } else {
        NodeClass::ExternalHost
    }
}

/// Classified nodes and weighted links for the current window
#[derive(Debug, Clone)]
pub struct GraphModel {
    config: GraphConfig,
    nodes: BTreeMap<String, GraphNode>,
    links: Vec<GraphLink>,
}

impl GraphModel {
    /// Create a graph holding only the gateway
    pub fn new(config: GraphConfig) -> Self {
        let mut model = Self {
            config,
            nodes: BTreeMap::new(),
            links: Vec::new(),
        };
        let gateway = model.config.plan.gateway.clone();
        let label = model.config.plan.resolve_label(&gateway);
        model.nodes.insert(
            gateway.clone(),
            GraphNode {
                id: gateway,
                class: NodeClass::Gateway,
                label,
            },
        );
        model
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn gateway(&self) -> &str {
        &self.config.plan.gateway
    }

    /// Rebuild the graph from the active window
    ///
    /// Existing addresses keep their identity and only have their class
    /// updated; new addresses get fresh nodes; addresses absent from the
    /// window are dropped. Links are recomputed from scratch.
    pub fn update<'a, I>(&mut self, window: I) -> GraphDelta
    where
        I: IntoIterator<Item = &'a TrafficEvent>,
    {
        let plan = &self.config.plan;

        let mut active: BTreeSet<&str> = BTreeSet::new();
        let mut attackers: HashSet<&str> = HashSet::new();
        let mut weights: BTreeMap<LinkKey, u32> = BTreeMap::new();
        active.insert(plan.gateway.as_str());

        for event in window {
            active.insert(event.source_ip.as_str());
            active.insert(event.dest_ip.as_str());
            if event.is_attack {
                attackers.insert(event.source_ip.as_str());
            }
            for key in route_event(event, plan).legs() {
                *weights.entry(key.clone()).or_insert(0) += 1;
            }
        }

        let mut delta = GraphDelta::default();

        // Drop nodes that left the window
        let stale: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| !active.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.nodes.remove(&id);
            delta.removed.push(id);
        }

        // Add new nodes, reclassify existing ones
        for id in &active {
            let class = classify(id, &attackers, plan, self.config.protect_gateway);
            match self.nodes.get_mut(*id) {
                Some(node) => {
                    if node.class != class {
                        delta.reclassified.push((node.id.clone(), node.class, class));
                        node.class = class;
                    }
                }
                None => {
                    self.nodes.insert(
                        id.to_string(),
                        GraphNode {
                            id: id.to_string(),
                            class,
                            label: plan.resolve_label(id),
                        },
                    );
                    delta.added.push(id.to_string());
                }
            }
        }

        let links: Vec<GraphLink> = weights
            .into_iter()
            .filter(|(key, _)| {
                let (a, b) = key.endpoints();
                self.nodes.contains_key(a) && self.nodes.contains_key(b)
            })
            .map(|(key, weight)| GraphLink { key, weight })
            .collect();
        delta.links_changed = links != self.links;
        self.links = links;

        if !delta.is_empty() {
            debug!(
                nodes = self.nodes.len(),
                links = self.links.len(),
                added = delta.added.len(),
                removed = delta.removed.len(),
                reclassified = delta.reclassified.len(),
                "Graph reconciled"
            );
        }

        delta
    }

    /// Reduce the graph to the gateway alone
    pub fn reset(&mut self) -> GraphDelta {
        self.update(std::iter::empty())
    }

    /// Nodes in address order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Links sorted by key
    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    /// Weight of the link between two addresses, 0 if absent
    #[cfg(test)]
    pub fn link_weight(&self, x: &str, y: &str) -> u32 {
        LinkKey::new(x, y)
            .and_then(|key| {
                self.links
                    .binary_search_by(|l| l.key.cmp(&key))
                    .ok()
                    .map(|idx| self.links[idx].weight)
            })
            .unwrap_or(0)
    }

    /// Links with the given node as an endpoint
    pub fn incident_links<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphLink> + 'a {
        self.links.iter().filter(move |l| l.key.touches(id))
    }

    pub fn count_by_class(&self, class: NodeClass) -> usize {
        self.nodes.values().filter(|n| n.class == class).count()
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}
