//! The Topology Store (spec.md §4.1): owns the network graph and its derived minimum spanning
//! tree, and computes the exact set of port-flood commands needed to keep flooding confined to the
//! tree after any topology mutation.

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{NodeRef, Port, SwitchId};
use crate::mac::MacAddr;

use super::types::{DirectedEdge, PortFloodCommand, SwitchLink, TopologyError, TopologySnapshot};

/// In-memory directed graph of switches and hosts, plus the derived MST and blocked-port set.
///
/// All mutating methods return the [`PortFloodCommand`]s the caller must execute against a
/// southbound implementation to bring switch port state back in sync with the new topology. The
/// store performs no I/O itself (spec.md §9: "cyclic-graph ownership" keeps indices, not handles,
/// inside the store).
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    graph: DiGraph<NodeRef, DirectedEdge>,
    id2idx: FxHashMap<NodeRef, NodeIndex>,
    switches: FxHashSet<SwitchId>,
    switch_links: Vec<SwitchLink>,
    hosts: FxHashMap<MacAddr, (SwitchId, Port)>,
    mst_links: FxHashSet<(SwitchId, SwitchId)>,
    blocked_ports: FxHashMap<SwitchId, FxHashSet<Port>>,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new switch and rebuilds the topology (spec.md §4.1).
    pub fn on_switch_up(&mut self, id: SwitchId) -> Result<Vec<PortFloodCommand>, TopologyError> {
        if !self.switches.insert(id) {
            return Err(TopologyError::DuplicateSwitch(id));
        }
        Ok(self.rebuild())
    }

    /// Removes a switch, any links that touch it, and any hosts learned behind it, then rebuilds.
    ///
    /// SUPPLEMENT (SPEC_FULL.md §4.1): spec.md's southbound interface lists `switch_down` but the
    /// component descriptions only spell out switch-up. Generalizing the same atomic rebuild to
    /// removal is the natural reading of spec.md §5's "switch-down ... removes its Datapath
    /// Registry entry".
    pub fn on_switch_down(&mut self, id: SwitchId) -> Vec<PortFloodCommand> {
        self.switches.remove(&id);
        self.switch_links.retain(|l| l.a != id && l.b != id);
        self.hosts.retain(|_, &mut (sw, _)| sw != id);
        self.rebuild()
    }

    /// Registers a physical link between two switches and rebuilds the topology.
    pub fn on_link_up(
        &mut self,
        a: SwitchId,
        b: SwitchId,
        a_port: Port,
        b_port: Port,
    ) -> Result<Vec<PortFloodCommand>, TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLink(a));
        }
        if !self.switches.contains(&a) {
            return Err(TopologyError::UnknownSwitch(a));
        }
        if !self.switches.contains(&b) {
            return Err(TopologyError::UnknownSwitch(b));
        }
        if self.switch_links.iter().any(|l| l.contains(a, b)) {
            return Err(TopologyError::DuplicateLink(a, b));
        }
        self.switch_links.push(SwitchLink {
            a,
            b,
            a_port,
            b_port,
        });
        Ok(self.rebuild())
    }

    /// SUPPLEMENT: the reverse of `on_link_up`, for the `link_down` southbound event (spec.md
    /// §6.1 lists it; no component section spells out its handling).
    pub fn on_link_down(&mut self, a: SwitchId, b: SwitchId) -> Vec<PortFloodCommand> {
        self.switch_links.retain(|l| !l.contains(a, b));
        self.rebuild()
    }

    /// Records a host learned at `(switch_id, port)` and rebuilds if this is new information.
    /// Idempotent: re-seeing a host at the same location is a no-op (no commands, no rebuild).
    pub fn on_host_seen(
        &mut self,
        mac: MacAddr,
        switch_id: SwitchId,
        port: Port,
    ) -> Vec<PortFloodCommand> {
        if self.hosts.get(&mac) == Some(&(switch_id, port)) {
            return Vec::new();
        }
        self.hosts.insert(mac, (switch_id, port));
        self.rebuild()
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        let mut switches: Vec<_> = self.switches.iter().copied().collect();
        switches.sort();
        let mut hosts: Vec<_> = self
            .hosts
            .iter()
            .map(|(&mac, &(sw, port))| (mac, sw, port))
            .collect();
        hosts.sort_by_key(|&(mac, _, _)| mac);
        let mut mst_links: Vec<_> = self.mst_links.iter().copied().collect();
        mst_links.sort();
        TopologySnapshot {
            switches,
            switch_links: self.switch_links.clone(),
            hosts,
            mst_links,
        }
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.id2idx.contains_key(&node)
    }

    pub fn neighbors(&self, node: NodeRef) -> Vec<NodeRef> {
        let Some(&idx) = self.id2idx.get(&node) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n])
            .collect()
    }

    pub fn edge_port(&self, u: NodeRef, v: NodeRef) -> Option<Port> {
        let &a = self.id2idx.get(&u)?;
        let &b = self.id2idx.get(&v)?;
        let eidx = self.graph.find_edge(a, b)?;
        Some(self.graph[eidx].src_port)
    }

    pub fn is_in_mst(&self, a: SwitchId, b: SwitchId) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.mst_links.contains(&(lo, hi))
    }

    pub fn is_blocked(&self, switch: SwitchId, port: Port) -> bool {
        self.blocked_ports
            .get(&switch)
            .map(|ports| ports.contains(&port))
            .unwrap_or(false)
    }

    pub(crate) fn graph(&self) -> &DiGraph<NodeRef, DirectedEdge> {
        &self.graph
    }

    pub(crate) fn node_index(&self, node: NodeRef) -> Option<NodeIndex> {
        self.id2idx.get(&node).copied()
    }

    /// The atomic five-step update from spec.md §4.1: unblock everything previously blocked,
    /// rebuild the graph from the canonical switch/link/host lists, recompute the MST, then
    /// re-derive the blocked port set from scratch.
    fn rebuild(&mut self) -> Vec<PortFloodCommand> {
        let mut commands = Vec::new();

        // (1) Unblock all previously blocked ports.
        for (&switch, ports) in self.blocked_ports.iter() {
            for &port in ports {
                commands.push(PortFloodCommand {
                    switch,
                    port,
                    flood_enabled: true,
                });
            }
        }
        self.blocked_ports.clear();

        // (2) Rebuild the graph from the canonical switch/link list.
        self.graph = DiGraph::new();
        self.id2idx.clear();
        let mut switches: Vec<_> = self.switches.iter().copied().collect();
        switches.sort();
        for sw in switches {
            let idx = self.graph.add_node(NodeRef::Switch(sw));
            self.id2idx.insert(NodeRef::Switch(sw), idx);
        }
        for link in &self.switch_links {
            let a = self.id2idx[&NodeRef::Switch(link.a)];
            let b = self.id2idx[&NodeRef::Switch(link.b)];
            self.graph.add_edge(
                a,
                b,
                DirectedEdge {
                    src_port: link.a_port,
                    dst_port: link.b_port,
                },
            );
            self.graph.add_edge(
                b,
                a,
                DirectedEdge {
                    src_port: link.b_port,
                    dst_port: link.a_port,
                },
            );
        }

        // (3) Reinsert learned hosts.
        let mut hosts: Vec<_> = self.hosts.iter().map(|(&mac, &loc)| (mac, loc)).collect();
        hosts.sort_by_key(|&(mac, _)| mac);
        for (mac, (switch, port)) in hosts {
            let host_idx = self.graph.add_node(NodeRef::Host(mac));
            self.id2idx.insert(NodeRef::Host(mac), host_idx);
            let Some(&switch_idx) = self.id2idx.get(&NodeRef::Switch(switch)) else {
                // The host's switch isn't up yet; keep the host isolated until it is.
                continue;
            };
            // The host side has no meaningful port; any neighbor lookup from the switch side
            // uses `port` below.
            self.graph.add_edge(
                switch_idx,
                host_idx,
                DirectedEdge {
                    src_port: port,
                    dst_port: Port::ZERO,
                },
            );
            self.graph.add_edge(
                host_idx,
                switch_idx,
                DirectedEdge {
                    src_port: Port::ZERO,
                    dst_port: port,
                },
            );
        }

        // (4) Compute the MST over the switch-only undirected subgraph, tie-breaking by
        // lexicographic (min, max) endpoint ids.
        self.mst_links = self.compute_mst();

        // (5) For every switch-to-switch edge not in the MST, emit flood-disable commands for
        // both ends' relevant ports.
        for link in &self.switch_links {
            let (lo, hi) = link.sorted_endpoints();
            if self.mst_links.contains(&(lo, hi)) {
                continue;
            }
            for (switch, port) in [(link.a, link.a_port), (link.b, link.b_port)] {
                self.blocked_ports.entry(switch).or_default().insert(port);
                commands.push(PortFloodCommand {
                    switch,
                    port,
                    flood_enabled: false,
                });
            }
        }

        commands
    }

    /// Kruskal's algorithm with union-find, over unit-weight edges. Every switch link has the
    /// same weight, so ties are broken purely by the deterministic processing order: switch links
    /// sorted by `(min(a,b), max(a,b))`.
    fn compute_mst(&self) -> FxHashSet<(SwitchId, SwitchId)> {
        let mut switches: Vec<_> = self.switches.iter().copied().collect();
        switches.sort();
        let mut parent: FxHashMap<SwitchId, SwitchId> =
            switches.iter().map(|&s| (s, s)).collect();

        fn find(parent: &mut FxHashMap<SwitchId, SwitchId>, x: SwitchId) -> SwitchId {
            if parent[&x] != x {
                let root = find(parent, parent[&x]);
                parent.insert(x, root);
            }
            parent[&x]
        }

        let mut candidate_links = self.switch_links.clone();
        candidate_links.sort_by_key(|l| l.sorted_endpoints());

        let mut mst = FxHashSet::default();
        for link in candidate_links {
            let (lo, hi) = link.sorted_endpoints();
            let ra = find(&mut parent, lo);
            let rb = find(&mut parent, hi);
            if ra != rb {
                parent.insert(ra, rb);
                mst.insert((lo, hi));
            }
        }
        mst
    }
}
