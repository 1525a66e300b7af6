//! The Flow Installer (spec.md §4.8): pushes per-hop forwarding rules along a chosen path.

use crate::datapath::DatapathRegistry;
use crate::flow_store::FlowKey;
use crate::ids::{NodeRef, SwitchId};
use crate::southbound::{Action, FlowMatch, FlowRule, Southbound, PRIORITY_PER_FLOW};
use crate::topology::TopologyStore;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("no edge from {0} towards {1}")]
    MissingEdge(NodeRef, NodeRef),

    #[error("switch {0} has no known datapath handle")]
    UnknownSwitch(SwitchId),

    #[error(transparent)]
    Southbound(#[from] crate::southbound::SouthboundError),
}

/// Installs forward and reverse rules for `key` along `path` (spec.md §4.8). `path`'s endpoints
/// are host MACs; every interior switch hop gets a rule matching `key` and outputting to the port
/// leading to the next hop. The reverse direction mirrors the path with source/destination MACs
/// swapped but transport ports unchanged, "as the source uses the latter to demultiplex replies".
pub fn install_path<S: Southbound>(
    topology: &TopologyStore,
    registry: &DatapathRegistry<S::SwitchHandle>,
    southbound: &S,
    path: &[NodeRef],
    key: FlowKey,
) -> Result<(), InstallError> {
    install_direction(topology, registry, southbound, path, key)?;
    let reversed_path: Vec<NodeRef> = path.iter().rev().copied().collect();
    install_direction(topology, registry, southbound, &reversed_path, key.reversed())
}

fn install_direction<S: Southbound>(
    topology: &TopologyStore,
    registry: &DatapathRegistry<S::SwitchHandle>,
    southbound: &S,
    path: &[NodeRef],
    key: FlowKey,
) -> Result<(), InstallError> {
    for window in path.windows(2) {
        let (node, next) = (window[0], window[1]);
        let Some(switch_id) = node.as_switch() else {
            continue;
        };
        let out_port = topology
            .edge_port(node, next)
            .ok_or(InstallError::MissingEdge(node, next))?;
        let handle = registry
            .handle(switch_id)
            .ok_or(InstallError::UnknownSwitch(switch_id))?;
        let rule = FlowRule {
            matching: FlowMatch::for_flow(key.src_mac, key.dst_mac, (key.src_port, key.dst_port)),
            action: Action::OutputPort(out_port),
            priority: PRIORITY_PER_FLOW,
        };
        southbound.install_flow_rule(handle, rule)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Port, TransportPort};
    use crate::mac::MacAddr;
    use crate::southbound::{PacketOut, SouthboundError};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSouthbound {
        installed: Mutex<Vec<(u64, FlowRule)>>,
    }

    impl Southbound for RecordingSouthbound {
        type SwitchHandle = u64;

        fn install_flow_rule(
            &self,
            switch: &u64,
            rule: FlowRule,
        ) -> Result<(), SouthboundError> {
            self.installed.lock().unwrap().push((*switch, rule));
            Ok(())
        }

        fn set_port_flood(&self, _: &u64, _: Port, _: bool) -> Result<(), SouthboundError> {
            Ok(())
        }

        fn request_flow_stats(&self, _: &u64) -> Result<(), SouthboundError> {
            Ok(())
        }

        fn request_port_stats(&self, _: &u64) -> Result<(), SouthboundError> {
            Ok(())
        }

        fn send_packet_out(&self, _: &u64, _: PacketOut) -> Result<(), SouthboundError> {
            Ok(())
        }
    }

    #[test]
    fn installs_forward_and_reverse_rules_same_ports() {
        let mut topology = TopologyStore::new();
        topology.on_switch_up(SwitchId::new(1)).unwrap();
        topology.on_switch_up(SwitchId::new(2)).unwrap();
        topology
            .on_link_up(SwitchId::new(1), SwitchId::new(2), Port::new(1), Port::new(1))
            .unwrap();

        let mut registry = DatapathRegistry::new();
        registry.on_switch_up(SwitchId::new(1), 100u64, vec![]);
        registry.on_switch_up(SwitchId::new(2), 200u64, vec![]);

        let southbound = RecordingSouthbound::default();
        let mac_a = MacAddr::new([0, 0, 0, 0, 0, 1]);
        let mac_b = MacAddr::new([0, 0, 0, 0, 0, 2]);
        let key = FlowKey::new(mac_a, mac_b, TransportPort::new(1234), TransportPort::new(80));
        let path = vec![
            NodeRef::Host(mac_a),
            NodeRef::Switch(SwitchId::new(1)),
            NodeRef::Switch(SwitchId::new(2)),
            NodeRef::Host(mac_b),
        ];

        install_path(&topology, &registry, &southbound, &path, key).unwrap();

        let installed = southbound.installed.lock().unwrap();
        assert_eq!(installed.len(), 2, "one rule per interior switch");
        assert_eq!(installed[0].0, 100);
        assert_eq!(installed[1].0, 200);
        assert_eq!(installed[0].1.matching.src_mac, Some(mac_a));
        assert_eq!(installed[1].1.matching.src_mac, Some(mac_b), "reverse rule swaps MACs");
    }
}
