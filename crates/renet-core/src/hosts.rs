//! The Host Learning Table (spec.md §4.3): a single-writer map from MAC to the switch/port a host
//! was last seen behind.

use rustc_hash::FxHashMap;

use crate::ids::{Port, SwitchId};
use crate::mac::MacAddr;

/// MAC -> (switch id, ingress port). Never aged out (spec.md §3: "hosts are assumed stable for
/// the experiment window").
#[derive(Debug, Clone, Default)]
pub struct HostTable {
    hosts: FxHashMap<MacAddr, (SwitchId, Port)>,
}

/// Whether observing a host produced new information the Topology Store needs to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostObservation {
    /// First time this MAC has been seen, or it moved to a different (switch, port).
    New,
    /// Already known at this exact location; no topology update needed.
    Unchanged,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a packet-in source MAC. Returns [`HostObservation::New`] the first time a MAC is
    /// seen, or whenever it reappears behind a different switch/port (spec.md §3: "replaced on any
    /// later packet-in from a different (switch, port)").
    pub fn observe(&mut self, mac: MacAddr, switch_id: SwitchId, port: Port) -> HostObservation {
        match self.hosts.insert(mac, (switch_id, port)) {
            Some(prev) if prev == (switch_id, port) => HostObservation::Unchanged,
            _ => HostObservation::New,
        }
    }

    pub fn location(&self, mac: MacAddr) -> Option<(SwitchId, Port)> {
        self.hosts.get(&mac).copied()
    }

    pub fn contains(&self, mac: MacAddr) -> bool {
        self.hosts.contains_key(&mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MacAddr, SwitchId, Port)> + '_ {
        self.hosts.iter().map(|(&mac, &(sw, port))| (mac, sw, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_new() {
        let mut table = HostTable::new();
        let mac = MacAddr::new([0, 0, 0, 0, 0, 1]);
        assert_eq!(
            table.observe(mac, SwitchId::new(1), Port::new(1)),
            HostObservation::New
        );
    }

    #[test]
    fn repeat_at_same_location_is_unchanged() {
        let mut table = HostTable::new();
        let mac = MacAddr::new([0, 0, 0, 0, 0, 1]);
        table.observe(mac, SwitchId::new(1), Port::new(1));
        assert_eq!(
            table.observe(mac, SwitchId::new(1), Port::new(1)),
            HostObservation::Unchanged
        );
    }

    #[test]
    fn move_to_new_port_is_new() {
        let mut table = HostTable::new();
        let mac = MacAddr::new([0, 0, 0, 0, 0, 1]);
        table.observe(mac, SwitchId::new(1), Port::new(1));
        assert_eq!(
            table.observe(mac, SwitchId::new(1), Port::new(2)),
            HostObservation::New
        );
    }
}
