//! Fixtures for exercising the controller without a real southbound transport (SPEC_FULL.md
//! module 14): a couple of seed topologies matching spec.md §8's scenarios, and a
//! `MockSwitch`/`MockSouthbound` pair that records every outbound operation for assertions.
//!
//! Not `#[cfg(test)]`-gated: `renet-controller`'s own smoke-test mode reuses [`MockSouthbound`]
//! as a stand-in for "the emulated network harness" spec.md §1 places out of scope.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::ids::{Port, SwitchId};
use crate::southbound::{FlowRule, PacketOut, Southbound, SouthboundError};
use crate::topology::TopologyStore;

/// Builds the triangle topology from spec.md §8 scenarios 1-4: switches 1, 2, 3 each pairwise
/// linked, 10 Mbps per edge.
pub fn triangle_topology() -> TopologyStore {
    let mut store = TopologyStore::new();
    for id in [1, 2, 3] {
        store.on_switch_up(SwitchId::new(id)).unwrap();
    }
    store
        .on_link_up(SwitchId::new(1), SwitchId::new(2), Port::new(1), Port::new(1))
        .unwrap();
    store
        .on_link_up(SwitchId::new(2), SwitchId::new(3), Port::new(2), Port::new(2))
        .unwrap();
    store
        .on_link_up(SwitchId::new(1), SwitchId::new(3), Port::new(3), Port::new(3))
        .unwrap();
    store
}

/// Builds the square-with-diagonal topology from spec.md §8 scenario 5: switches 1-2-3-4 in a
/// ring, plus a 1-3 diagonal.
pub fn square_with_diagonal_topology() -> TopologyStore {
    let mut store = TopologyStore::new();
    for id in [1, 2, 3, 4] {
        store.on_switch_up(SwitchId::new(id)).unwrap();
    }
    store
        .on_link_up(SwitchId::new(1), SwitchId::new(2), Port::new(1), Port::new(1))
        .unwrap();
    store
        .on_link_up(SwitchId::new(2), SwitchId::new(3), Port::new(2), Port::new(2))
        .unwrap();
    store
        .on_link_up(SwitchId::new(3), SwitchId::new(4), Port::new(3), Port::new(3))
        .unwrap();
    store
        .on_link_up(SwitchId::new(4), SwitchId::new(1), Port::new(4), Port::new(4))
        .unwrap();
    store
        .on_link_up(SwitchId::new(1), SwitchId::new(3), Port::new(5), Port::new(5))
        .unwrap();
    store
}

/// One recorded outbound operation, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    InstallFlowRule(SwitchId, FlowRule),
    SetPortFlood(SwitchId, Port, bool),
    RequestFlowStats(SwitchId),
    RequestPortStats(SwitchId),
    SendPacketOut(SwitchId, PacketOut),
}

/// An in-memory [`Southbound`] implementation that records every call instead of talking to a
/// real switch. Stands in for "the emulated network harness" spec.md §1 places out of scope.
#[derive(Debug, Default)]
pub struct MockSouthbound {
    ops: Mutex<Vec<RecordedOp>>,
    /// Per-switch table of simulated port-flood state, for assertions that don't want to replay
    /// the whole op log.
    flood_state: Mutex<FxHashMap<(SwitchId, Port), bool>>,
}

impl MockSouthbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn is_flooding(&self, switch: SwitchId, port: Port) -> bool {
        *self
            .flood_state
            .lock()
            .unwrap()
            .get(&(switch, port))
            .unwrap_or(&true)
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

impl Southbound for MockSouthbound {
    type SwitchHandle = SwitchId;

    fn install_flow_rule(
        &self,
        switch: &SwitchId,
        rule: FlowRule,
    ) -> Result<(), SouthboundError> {
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::InstallFlowRule(*switch, rule));
        Ok(())
    }

    fn set_port_flood(
        &self,
        switch: &SwitchId,
        port: Port,
        enabled: bool,
    ) -> Result<(), SouthboundError> {
        self.flood_state.lock().unwrap().insert((*switch, port), enabled);
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::SetPortFlood(*switch, port, enabled));
        Ok(())
    }

    fn request_flow_stats(&self, switch: &SwitchId) -> Result<(), SouthboundError> {
        self.ops.lock().unwrap().push(RecordedOp::RequestFlowStats(*switch));
        Ok(())
    }

    fn request_port_stats(&self, switch: &SwitchId) -> Result<(), SouthboundError> {
        self.ops.lock().unwrap().push(RecordedOp::RequestPortStats(*switch));
        Ok(())
    }

    fn send_packet_out(&self, switch: &SwitchId, packet: PacketOut) -> Result<(), SouthboundError> {
        self.ops
            .lock()
            .unwrap()
            .push(RecordedOp::SendPacketOut(*switch, packet));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_has_three_switches_three_links() {
        let topo = triangle_topology();
        let snap = topo.snapshot();
        assert_eq!(snap.switches.len(), 3);
        assert_eq!(snap.switch_links.len(), 3);
        assert_eq!(snap.mst_links.len(), 2);
    }

    #[test]
    fn square_with_diagonal_has_one_blocked_edge() {
        let topo = square_with_diagonal_topology();
        let snap = topo.snapshot();
        assert_eq!(snap.switch_links.len(), 5);
        assert_eq!(snap.mst_links.len(), 3, "4 switches -> 3-edge spanning tree");
    }

    #[test]
    fn mock_records_port_flood_state() {
        let mock = MockSouthbound::new();
        mock.set_port_flood(&SwitchId::new(1), Port::new(1), false).unwrap();
        assert!(!mock.is_flooding(SwitchId::new(1), Port::new(1)));
        assert!(mock.is_flooding(SwitchId::new(1), Port::new(2)), "unknown ports default open");
    }
}
