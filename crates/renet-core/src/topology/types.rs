//! Types making up the network graph: nodes, directed edges, and the canonical switch links the
//! graph is rebuilt from on every topology mutation.

use crate::ids::{NodeRef, Port, SwitchId};
use crate::mac::MacAddr;

/// A directed edge `u -> v` in the network graph. Carries the port on `u` that leads to `v`.
///
/// Invariant (spec.md §3): for every edge `u -> v` where both are switches, the graph also holds
/// the reverse edge `v -> u` with `src_port`/`dst_port` swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedEdge {
    pub src_port: Port,
    pub dst_port: Port,
}

impl DirectedEdge {
    pub fn reversed(self) -> Self {
        Self {
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

/// A physical switch-to-switch link, as declared by `on_link_up`. The graph always stores both
/// directions; this is the single canonical (undirected) record the graph is rebuilt from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchLink {
    pub a: SwitchId,
    pub b: SwitchId,
    pub a_port: Port,
    pub b_port: Port,
}

impl SwitchLink {
    /// The endpoints in lexicographic `(min, max)` order, used to break MST ties deterministically
    /// (spec.md §4.1).
    pub fn sorted_endpoints(&self) -> (SwitchId, SwitchId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    pub fn contains(&self, a: SwitchId, b: SwitchId) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// An instruction to enable or disable flooding on a switch port. Emitted by [`TopologyStore`]
/// rebuilds (spec.md §4.1, steps 1 and 5) and executed by the caller against a [`Southbound`]
/// implementation — the store itself performs no I/O.
///
/// [`TopologyStore`]: super::store::TopologyStore
/// [`Southbound`]: crate::southbound::Southbound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortFloodCommand {
    pub switch: SwitchId,
    pub port: Port,
    pub flood_enabled: bool,
}

/// A read-only view of the topology, returned by [`TopologyStore::snapshot`]. Cheap to clone: used
/// by diagnostics and by components (e.g. the Link Store) that need to read edge/port data without
/// taking a lock on the store itself.
///
/// [`TopologyStore::snapshot`]: super::store::TopologyStore::snapshot
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub switches: Vec<SwitchId>,
    pub switch_links: Vec<SwitchLink>,
    pub hosts: Vec<(MacAddr, SwitchId, Port)>,
    pub mst_links: Vec<(SwitchId, SwitchId)>,
}

impl TopologySnapshot {
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.switches
            .iter()
            .map(|&s| NodeRef::Switch(s))
            .chain(self.hosts.iter().map(|&(mac, _, _)| NodeRef::Host(mac)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("switch {0} is already up")]
    DuplicateSwitch(SwitchId),

    #[error("switch {0} is not known to the topology")]
    UnknownSwitch(SwitchId),

    #[error("link between {0} and {1} already exists")]
    DuplicateLink(SwitchId, SwitchId),

    #[error("a switch cannot link to itself ({0})")]
    SelfLink(SwitchId),
}
