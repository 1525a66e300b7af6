#![warn(unreachable_pub, missing_debug_implementations)]

//! The core RENET library: a centralized layer-2 SDN control plane. Discovers switch/host
//! topology, keeps flooding loop-free via a spanning tree, polls per-flow and per-link
//! statistics, and selects (and re-selects) bandwidth-aware forwarding paths per flow.

#[macro_use]
mod ident;

pub mod config;
pub mod datapath;
pub mod diagnostics;
pub mod flow_store;
pub mod hosts;
pub mod ids;
pub mod installer;
pub mod link_store;
pub mod mac;
pub mod oracle;
pub mod path_selector;
pub mod router;
pub mod southbound;
pub mod testing;
pub mod topology;
pub mod units;

pub use config::ControllerConfig;
pub use router::ControlLoop;
pub use topology::TopologyStore;
