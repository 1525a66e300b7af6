//! Optional northbound diagnostics (spec.md §6.2: "None required... may expose an optional
//! read-only diagnostic surface"). Builds a serializable snapshot from the shallow copies spec.md
//! §5 already mandates readers use.

use serde::Serialize;

use crate::ids::{NodeRef, SwitchId};
use crate::link_store::LinkStore;
use crate::topology::TopologyStore;
use crate::units::BytesPerSec;
use crate::flow_store::{FlowKey, FlowStore};

#[derive(Debug, Clone, Serialize)]
pub struct SwitchView {
    pub id: SwitchId,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub from: SwitchId,
    pub to: SwitchId,
    pub capacity: BytesPerSec,
    pub usage: BytesPerSec,
    pub active_flows: u32,
    pub in_mst: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    #[serde(with = "flow_key_as_string")]
    pub key: FlowKey,
    pub current_rate: BytesPerSec,
    pub desired_rate: BytesPerSec,
    pub path: Vec<NodeRef>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    pub switches: Vec<SwitchView>,
    pub links: Vec<LinkView>,
    pub flows: Vec<FlowView>,
}

/// Takes a shallow, read-only copy of controller state for diagnostic export.
pub fn snapshot(topology: &TopologyStore, links: &LinkStore, flows: &FlowStore) -> DiagnosticsSnapshot {
    let topo_snapshot = topology.snapshot();
    let switches = topo_snapshot
        .switches
        .iter()
        .map(|&id| SwitchView { id })
        .collect();

    let link_views = links
        .iter()
        .map(|(link, record)| LinkView {
            from: link.from,
            to: link.to,
            capacity: record.capacity,
            usage: record.usage,
            active_flows: record.active_flows,
            in_mst: topology.is_in_mst(link.from, link.to),
        })
        .collect();

    let flow_views = flows
        .iter()
        .map(|(&key, record)| FlowView {
            key,
            current_rate: record.current_rate,
            desired_rate: record.desired_rate,
            path: record.path.clone(),
            active: record.active,
        })
        .collect();

    DiagnosticsSnapshot {
        switches,
        links: link_views,
        flows: flow_views,
    }
}

mod flow_key_as_string {
    use super::FlowKey;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(key: &FlowKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!(
            "{}:{}->{}:{}",
            key.src_mac, key.src_port, key.dst_mac, key.dst_port
        ))
    }
}
