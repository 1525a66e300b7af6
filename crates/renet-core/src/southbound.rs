//! The southbound transport boundary (spec.md §6.1): a trait the event router is generic over,
//! directly grounded in the teacher's `LinkSim` trait — an external collaborator injected
//! generically rather than a concrete dependency, so `renet-core` never depends on any particular
//! wire protocol.

use crate::ids::{Port, SwitchId, TransportPort};
use crate::mac::MacAddr;

/// Priorities for installed rules (spec.md §6.1).
pub const PRIORITY_DEFAULT: u16 = 0;
pub const PRIORITY_PER_FLOW: u16 = 1;
pub const PRIORITY_DISCOVERY_DROP: u16 = 100;

/// Match fields used by installed rules (spec.md §6.1): source/destination MAC and, for per-flow
/// rules, the transport ports that key a [`crate::flow_store::FlowKey`]. `None` in any field
/// means "wildcard" (matches any value); `ether_type` exists only for the discovery-drop rule
/// (SUPPLEMENT, SPEC_FULL.md §3), which spec.md §6.1 lists by priority but whose match fields
/// the distilled spec never spells out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowMatch {
    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    pub ether_type: Option<u16>,
    pub transport_ports: Option<(TransportPort, TransportPort)>,
}

impl FlowMatch {
    /// A per-flow match keyed exactly as `FlowKey` is (spec.md §4.8).
    pub fn for_flow(src_mac: MacAddr, dst_mac: MacAddr, ports: (TransportPort, TransportPort)) -> Self {
        Self {
            src_mac: Some(src_mac),
            dst_mac: Some(dst_mac),
            ether_type: None,
            transport_ports: Some(ports),
        }
    }

    /// The discovery-drop match: any frame of the discovery EtherType, regardless of MAC.
    pub fn discovery() -> Self {
        Self {
            src_mac: None,
            dst_mac: None,
            ether_type: Some(ETHER_TYPE_DISCOVERY),
            transport_ports: None,
        }
    }
}

/// Actions a rule or packet-out can carry (spec.md §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OutputPort(Port),
    OutputFlood,
    OutputTableLookup,
}

/// A forwarding rule to install on one switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub matching: FlowMatch,
    pub action: Action,
    pub priority: u16,
}

/// A buffered packet to emit, identified either by the switch's buffer id or by its raw bytes
/// (spec.md §6.1: `buffer_id | raw_frame`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketPayload {
    Buffered(u32),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub payload: PacketPayload,
    pub in_port: Port,
    pub action: Action,
}

/// One entry of a flow-statistics reply (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStatsEntry {
    pub matching: FlowMatch,
    pub byte_count: u64,
    pub duration_millis: u64,
}

/// One entry of a port-statistics reply (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatsEntry {
    pub port: Port,
    pub rx_bytes: u64,
}

/// A packet-in event, carrying the raw Ethernet frame and framing metadata (spec.md §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub in_port: Port,
    pub buffer_id: Option<u32>,
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ether_type: u16,
    pub transport_ports: Option<(TransportPort, TransportPort)>,
}

/// The controller-plane discovery EtherType (spec.md §4.9): packet-ins carrying this are dropped
/// silently rather than learned or flooded.
pub const ETHER_TYPE_DISCOVERY: u16 = 0x88cc;

/// Inbound events delivered by the southbound transport (spec.md §6.1), tagged with the switch
/// they originated from.
#[derive(Debug, Clone)]
pub enum InboundEvent<H> {
    SwitchUp {
        id: SwitchId,
        handle: H,
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
        packet: PacketIn,
    },
    FlowStatsReply {
        switch: SwitchId,
        entries: Vec<FlowStatsEntry>,
    },
    PortStatsReply {
        switch: SwitchId,
        entries: Vec<PortStatsEntry>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SouthboundError {
    #[error("switch {0} is not reachable")]
    UnreachableSwitch(SwitchId),

    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Outbound operations the event router issues on a switch handle (spec.md §6.1).
///
/// One associated type, `SwitchHandle`, mirrors the teacher's `LinkSim` trait shape: the
/// transport is an external collaborator the core depends on only through this interface.
pub trait Southbound {
    type SwitchHandle: Clone + std::fmt::Debug + Send + Sync + 'static;

    fn install_flow_rule(
        &self,
        switch: &Self::SwitchHandle,
        rule: FlowRule,
    ) -> Result<(), SouthboundError>;

    fn set_port_flood(
        &self,
        switch: &Self::SwitchHandle,
        port: Port,
        enabled: bool,
    ) -> Result<(), SouthboundError>;

    fn request_flow_stats(&self, switch: &Self::SwitchHandle) -> Result<(), SouthboundError>;

    fn request_port_stats(&self, switch: &Self::SwitchHandle) -> Result<(), SouthboundError>;

    fn send_packet_out(
        &self,
        switch: &Self::SwitchHandle,
        packet: PacketOut,
    ) -> Result<(), SouthboundError>;
}

impl<T: Southbound> Southbound for std::sync::Arc<T> {
    type SwitchHandle = T::SwitchHandle;

    fn install_flow_rule(
        &self,
        switch: &Self::SwitchHandle,
        rule: FlowRule,
    ) -> Result<(), SouthboundError> {
        (**self).install_flow_rule(switch, rule)
    }

    fn set_port_flood(
        &self,
        switch: &Self::SwitchHandle,
        port: Port,
        enabled: bool,
    ) -> Result<(), SouthboundError> {
        (**self).set_port_flood(switch, port, enabled)
    }

    fn request_flow_stats(&self, switch: &Self::SwitchHandle) -> Result<(), SouthboundError> {
        (**self).request_flow_stats(switch)
    }

    fn request_port_stats(&self, switch: &Self::SwitchHandle) -> Result<(), SouthboundError> {
        (**self).request_port_stats(switch)
    }

    fn send_packet_out(
        &self,
        switch: &Self::SwitchHandle,
        packet: PacketOut,
    ) -> Result<(), SouthboundError> {
        (**self).send_packet_out(switch, packet)
    }
}
