//! The Topology Store: the network graph, its derived minimum spanning tree, and the blocked-port
//! set that confines flooding to that tree.

mod store;
mod types;

pub use store::TopologyStore;
pub use types::{DirectedEdge, PortFloodCommand, SwitchLink, TopologyError, TopologySnapshot};
