//! The Datapath Registry (spec.md §4.2): a map from switch id to the opaque handle used to reach
//! it over the southbound transport.

use rustc_hash::FxHashMap;

use crate::ids::{Port, SwitchId};

/// Ports reported by a switch at switch-up time.
#[derive(Debug, Clone, Default)]
pub struct SwitchPorts(pub Vec<Port>);

/// Tracks which switches are currently up and the handle used to address each one.
///
/// Generic over the handle type so `renet-core` stays agnostic to the concrete southbound
/// transport (mirrors the teacher's `LinkSim` boundary, see [`crate::southbound`]).
#[derive(Debug, Clone)]
pub struct DatapathRegistry<H> {
    handles: FxHashMap<SwitchId, H>,
    ports: FxHashMap<SwitchId, SwitchPorts>,
}

impl<H> Default for DatapathRegistry<H> {
    fn default() -> Self {
        Self {
            handles: FxHashMap::default(),
            ports: FxHashMap::default(),
        }
    }
}

impl<H> DatapathRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_switch_up(&mut self, id: SwitchId, handle: H, ports: Vec<Port>) {
        self.handles.insert(id, handle);
        self.ports.insert(id, SwitchPorts(ports));
    }

    pub fn on_switch_down(&mut self, id: SwitchId) {
        self.handles.remove(&id);
        self.ports.remove(&id);
    }

    /// Looks up a switch's handle. A miss is a transient condition per spec.md §4.2: the caller
    /// must treat it as "switch is transitioning" and skip the action, not panic.
    pub fn handle(&self, id: SwitchId) -> Option<&H> {
        self.handles.get(&id)
    }

    pub fn ports(&self, id: SwitchId) -> Option<&[Port]> {
        self.ports.get(&id).map(|p| p.0.as_slice())
    }

    pub fn is_up(&self, id: SwitchId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn switch_ids(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.handles.keys().copied()
    }
}
