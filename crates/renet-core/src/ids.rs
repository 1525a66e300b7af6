//! Identifier newtypes used throughout the controller.

identifier!(SwitchId, u64);
identifier!(Port, u16);
identifier!(TransportPort, u16);

use crate::mac::MacAddr;

/// A node in the network graph is either a switch (by its stable dpid) or a host (by MAC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum NodeRef {
    Switch(SwitchId),
    Host(MacAddr),
}

impl NodeRef {
    pub fn is_switch(&self) -> bool {
        matches!(self, NodeRef::Switch(_))
    }

    pub fn as_switch(&self) -> Option<SwitchId> {
        match self {
            NodeRef::Switch(id) => Some(*id),
            NodeRef::Host(_) => None,
        }
    }

    pub fn as_host(&self) -> Option<MacAddr> {
        match self {
            NodeRef::Host(mac) => Some(*mac),
            NodeRef::Switch(_) => None,
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Switch(id) => write!(f, "switch:{id}"),
            NodeRef::Host(mac) => write!(f, "host:{mac}"),
        }
    }
}

impl From<SwitchId> for NodeRef {
    fn from(id: SwitchId) -> Self {
        NodeRef::Switch(id)
    }
}

impl From<MacAddr> for NodeRef {
    fn from(mac: MacAddr) -> Self {
        NodeRef::Host(mac)
    }
}
