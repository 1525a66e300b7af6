//! Scripted southbound events, for driving a [`renet_core::router::ControlLoop`] without a real
//! switch fabric attached. JSON-serializable the same way the teacher's `NetworkSpec`/`Flow` round
//! trip through `serde_json` in `parsimon-driver::read_network_spec`/`read_flows`.

use std::fs;
use std::path::Path;

use renet_core::ids::{Port, SwitchId, TransportPort};
use renet_core::mac::MacAddr;
use renet_core::southbound::{InboundEvent, PacketIn};

use crate::Error;

/// One southbound event, in the shape a JSON scenario file carries it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind")]
pub enum ScenarioEvent {
    SwitchUp {
        id: SwitchId,
        #[serde(default)]
        ports: Vec<Port>,
    },
    SwitchDown {
        id: SwitchId,
    },
    LinkUp {
        a: SwitchId,
        b: SwitchId,
        a_port: Port,
        b_port: Port,
    },
    LinkDown {
        a: SwitchId,
        b: SwitchId,
    },
    PacketIn {
        switch: SwitchId,
        in_port: Port,
        src_mac: MacAddr,
        dst_mac: MacAddr,
        #[serde(default = "default_ether_type")]
        ether_type: u16,
        #[serde(default)]
        src_port: Option<TransportPort>,
        #[serde(default)]
        dst_port: Option<TransportPort>,
    },
}

fn default_ether_type() -> u16 {
    0x0800
}

impl ScenarioEvent {
    /// Converts to the event shape [`renet_core::router::ControlLoop`] actually consumes. The
    /// handle for a given switch is its own [`SwitchId`]: that is what
    /// [`renet_core::testing::MockSouthbound`] uses as `SwitchHandle`.
    pub fn into_inbound(self) -> InboundEvent<SwitchId> {
        match self {
            ScenarioEvent::SwitchUp { id, ports } => InboundEvent::SwitchUp { id, handle: id, ports },
            ScenarioEvent::SwitchDown { id } => InboundEvent::SwitchDown { id },
            ScenarioEvent::LinkUp { a, b, a_port, b_port } => {
                InboundEvent::LinkUp { a, b, a_port, b_port }
            }
            ScenarioEvent::LinkDown { a, b } => InboundEvent::LinkDown { a, b },
            ScenarioEvent::PacketIn {
                switch,
                in_port,
                src_mac,
                dst_mac,
                ether_type,
                src_port,
                dst_port,
            } => InboundEvent::PacketIn {
                switch,
                packet: PacketIn {
                    in_port,
                    buffer_id: None,
                    src_mac,
                    dst_mac,
                    ether_type,
                    transport_ports: src_port.zip(dst_port),
                },
            },
        }
    }
}

/// Loads a scenario file: a JSON array of [`ScenarioEvent`]s, applied in order.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Vec<ScenarioEvent>, Error> {
    let contents = fs::read_to_string(path.as_ref())?;
    let events = serde_json::from_str(&contents)?;
    Ok(events)
}

/// The triangle from spec.md §8 scenario 1: three switches, pairwise linked, with host `h1`
/// already known (learned via an earlier broadcast) before `h1 -> h2` traffic starts.
pub fn triangle_scenario() -> Vec<ScenarioEvent> {
    let h1 = MacAddr::new([0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    let h2 = MacAddr::new([0x00, 0x00, 0x00, 0x00, 0x00, 0x02]);
    vec![
        ScenarioEvent::SwitchUp { id: SwitchId::new(1), ports: vec![] },
        ScenarioEvent::SwitchUp { id: SwitchId::new(2), ports: vec![] },
        ScenarioEvent::SwitchUp { id: SwitchId::new(3), ports: vec![] },
        ScenarioEvent::LinkUp {
            a: SwitchId::new(1),
            b: SwitchId::new(2),
            a_port: Port::new(1),
            b_port: Port::new(1),
        },
        ScenarioEvent::LinkUp {
            a: SwitchId::new(2),
            b: SwitchId::new(3),
            a_port: Port::new(2),
            b_port: Port::new(2),
        },
        ScenarioEvent::LinkUp {
            a: SwitchId::new(1),
            b: SwitchId::new(3),
            a_port: Port::new(3),
            b_port: Port::new(3),
        },
        // h2 broadcasts first, so it is already in the Host Learning Table by the time h1's
        // traffic arrives (spec.md §8 scenario 1's narrative assumes this).
        ScenarioEvent::PacketIn {
            switch: SwitchId::new(3),
            in_port: Port::new(10),
            src_mac: h2,
            dst_mac: MacAddr::BROADCAST,
            ether_type: 0x0806,
            src_port: None,
            dst_port: None,
        },
        ScenarioEvent::PacketIn {
            switch: SwitchId::new(1),
            in_port: Port::new(10),
            src_mac: h1,
            dst_mac: h2,
            ether_type: 0x0800,
            src_port: Some(TransportPort::new(40_000)),
            dst_port: Some(TransportPort::new(80)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_scenario_round_trips_through_json() {
        let events = triangle_scenario();
        let json = serde_json::to_string(&events).unwrap();
        let parsed: Vec<ScenarioEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), events.len());
    }

    #[test]
    fn packet_in_without_transport_ports_converts_to_none() {
        let event = ScenarioEvent::PacketIn {
            switch: SwitchId::new(1),
            in_port: Port::new(1),
            src_mac: MacAddr::new([0, 0, 0, 0, 0, 1]),
            dst_mac: MacAddr::BROADCAST,
            ether_type: 0x0806,
            src_port: None,
            dst_port: Some(TransportPort::new(80)),
        };
        let InboundEvent::PacketIn { packet, .. } = event.into_inbound() else {
            panic!("expected PacketIn");
        };
        assert!(packet.transport_ports.is_none(), "zip requires both ports present");
    }
}
