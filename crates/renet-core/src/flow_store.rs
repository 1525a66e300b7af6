//! The Flow Store (spec.md §4.5, §3): per-flow records keyed by [`FlowKey`], maintained by the
//! event router as each flow-statistics reply arrives.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::ids::{NodeRef, TransportPort};
use crate::mac::MacAddr;
use crate::units::BytesPerSec;

/// (src MAC, dst MAC, src transport port, dst transport port). Only TCP/UDP packet-ins produce a
/// `FlowKey`; other L4 types are flooded and never tracked (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_port: TransportPort,
    pub dst_port: TransportPort,
}

impl FlowKey {
    pub fn new(
        src_mac: MacAddr,
        dst_mac: MacAddr,
        src_port: TransportPort,
        dst_port: TransportPort,
    ) -> Self {
        Self {
            src_mac,
            dst_mac,
            src_port,
            dst_port,
        }
    }

    /// The same flow, as observed from the other endpoint: MACs swapped, transport ports kept as
    /// the source uses them to demultiplex replies (spec.md §4.8).
    pub fn reversed(self) -> Self {
        Self {
            src_mac: self.dst_mac,
            dst_mac: self.src_mac,
            src_port: self.src_port,
            dst_port: self.dst_port,
        }
    }
}

/// A per-flow record. `path` is a host-to-host node sequence: endpoints are always
/// [`NodeRef::Host`], interior hops are always [`NodeRef::Switch`] (spec.md §3).
#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub current_rate: BytesPerSec,
    pub desired_rate: BytesPerSec,
    pub path: Vec<NodeRef>,
    pub update_time: DateTime<Utc>,
    pub active: bool,
    pub active_countdown: u32,
    pub reroute_cooldown: u32,
}

impl FlowRecord {
    /// Interior switch-to-switch hops of `path`, as consecutive `(a, b)` switch pairs. Empty for
    /// a direct two-hop host-to-host edge (spec.md §4.7 step 3: "∞ if no interior hops").
    pub fn interior_switch_hops(&self) -> impl Iterator<Item = (NodeRef, NodeRef)> + '_ {
        self.path
            .windows(2)
            .filter(|w| w[0].is_switch() && w[1].is_switch())
            .map(|w| (w[0], w[1]))
    }
}

/// Per-flow records, single-writer (the event router), keyed by [`FlowKey`] (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct FlowStore {
    flows: FxHashMap<FlowKey, FlowRecord>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FlowKey) -> Option<&FlowRecord> {
        self.flows.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, &FlowRecord)> {
        self.flows.iter()
    }

    /// Applies a flow-statistics reply entry for `key` (spec.md §4.5): `current_rate =
    /// byte_count / max(duration, eps)`; resets `active`/`active_countdown`/`update_time`;
    /// preserves `path` and `reroute_cooldown` from any prior record (decrementing the cooldown
    /// here, if nonzero); installs defaults (empty path, no cooldown) on first sight.
    pub fn record_stats_reply(
        &mut self,
        key: FlowKey,
        byte_count: u64,
        duration_secs: f64,
        now: DateTime<Utc>,
        desired_rate: BytesPerSec,
        active_countdown_ticks: u32,
    ) -> &FlowRecord {
        const EPS: f64 = 1e-6;
        let current_rate = BytesPerSec::new(byte_count as f64 / duration_secs.max(EPS));

        let entry = self.flows.entry(key).or_insert_with(|| FlowRecord {
            current_rate: BytesPerSec::ZERO,
            desired_rate,
            path: Vec::new(),
            update_time: now,
            active: false,
            active_countdown: active_countdown_ticks,
            reroute_cooldown: 0,
        });
        entry.current_rate = current_rate;
        entry.active = true;
        entry.active_countdown = active_countdown_ticks;
        entry.update_time = now;
        if entry.reroute_cooldown > 0 {
            entry.reroute_cooldown -= 1;
        }
        entry
    }

    /// Installs or updates the path taken by a flow (and its reverse, mirrored by the caller) as
    /// part of flow installation / re-routing.
    pub fn set_path(&mut self, key: FlowKey, path: Vec<NodeRef>, now: DateTime<Utc>) {
        let entry = self.flows.entry(key).or_insert_with(|| FlowRecord {
            current_rate: BytesPerSec::ZERO,
            desired_rate: BytesPerSec::ZERO,
            path: Vec::new(),
            update_time: now,
            active: true,
            active_countdown: 0,
            reroute_cooldown: 0,
        });
        entry.path = path;
    }

    pub fn set_reroute_cooldown(&mut self, key: &FlowKey, ticks: u32) {
        if let Some(entry) = self.flows.get_mut(key) {
            entry.reroute_cooldown = ticks;
        }
    }

    /// End-of-tick bookkeeping (spec.md §4.4): decrements every active flow's
    /// `active_countdown`; flows that reach zero become inactive. Returns the keys that just
    /// transitioned active -> inactive, which is the "flow-set-changed" signal that wakes the
    /// re-router.
    pub fn tick(&mut self) -> Vec<FlowKey> {
        let mut newly_inactive = Vec::new();
        for (key, record) in self.flows.iter_mut() {
            if !record.active {
                continue;
            }
            if record.active_countdown == 0 {
                record.active = false;
                newly_inactive.push(*key);
                continue;
            }
            record.active_countdown -= 1;
            if record.active_countdown == 0 {
                record.active = false;
                newly_inactive.push(*key);
            }
        }
        newly_inactive
    }

    /// Candidates for the re-routing pass (spec.md §4.10 step 1): active, off cooldown, and
    /// under-performing relative to `desired_rate`.
    pub fn reroute_candidates(&self, rate_trigger_ratio: f64) -> Vec<FlowKey> {
        self.flows
            .iter()
            .filter(|(_, r)| {
                r.active
                    && r.reroute_cooldown == 0
                    && r.current_rate.into_f64() < rate_trigger_ratio * r.desired_rate.into_f64()
            })
            .map(|(k, _)| *k)
            .collect()
    }

    /// Every active flow whose path traverses the directed edge `(a, b)` — used by capacity-drop
    /// triggered rerouting (spec.md §4.6) and by the global `active_flows` audit (spec.md §9).
    pub fn flows_traversing(&self, a: NodeRef, b: NodeRef) -> Vec<FlowKey> {
        self.flows
            .iter()
            .filter(|(_, r)| r.active && r.path.windows(2).any(|w| w[0] == a && w[1] == b))
            .map(|(k, _)| *k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SwitchId;

    fn key() -> FlowKey {
        FlowKey::new(
            MacAddr::new([0, 0, 0, 0, 0, 1]),
            MacAddr::new([0, 0, 0, 0, 0, 2]),
            TransportPort::new(1234),
            TransportPort::new(80),
        )
    }

    #[test]
    fn reversed_swaps_macs_keeps_ports() {
        let k = key();
        let r = k.reversed();
        assert_eq!(r.src_mac, k.dst_mac);
        assert_eq!(r.dst_mac, k.src_mac);
        assert_eq!(r.src_port, k.src_port);
        assert_eq!(r.dst_port, k.dst_port);
    }

    #[test]
    fn tick_deactivates_after_countdown_exhausted() {
        let mut store = FlowStore::new();
        let now = Utc::now();
        store.record_stats_reply(key(), 1000, 1.0, now, BytesPerSec::new(1_000_000.0), 2);
        assert!(store.tick().is_empty(), "countdown 2 -> 1, still active");
        let inactive = store.tick();
        assert_eq!(inactive, vec![key()], "countdown 1 -> 0, now inactive");
        assert!(!store.get(&key()).unwrap().active);
    }

    #[test]
    fn reroute_cooldown_decrements_once_per_reply_and_floors_at_zero() {
        let mut store = FlowStore::new();
        let now = Utc::now();
        store.record_stats_reply(key(), 1000, 1.0, now, BytesPerSec::new(1_000_000.0), 2);
        store.set_reroute_cooldown(&key(), 1);
        store.record_stats_reply(key(), 1000, 1.0, now, BytesPerSec::new(1_000_000.0), 2);
        assert_eq!(store.get(&key()).unwrap().reroute_cooldown, 0);
        store.record_stats_reply(key(), 1000, 1.0, now, BytesPerSec::new(1_000_000.0), 2);
        assert_eq!(store.get(&key()).unwrap().reroute_cooldown, 0, "never negative");
    }

    #[test]
    fn interior_switch_hops_skips_host_endpoints() {
        let mac_a = MacAddr::new([0, 0, 0, 0, 0, 1]);
        let mac_b = MacAddr::new([0, 0, 0, 0, 0, 2]);
        let record = FlowRecord {
            current_rate: BytesPerSec::ZERO,
            desired_rate: BytesPerSec::ZERO,
            path: vec![
                NodeRef::Host(mac_a),
                NodeRef::Switch(SwitchId::new(1)),
                NodeRef::Switch(SwitchId::new(2)),
                NodeRef::Host(mac_b),
            ],
            update_time: Utc::now(),
            active: true,
            active_countdown: 2,
            reroute_cooldown: 0,
        };
        let hops: Vec<_> = record.interior_switch_hops().collect();
        assert_eq!(
            hops,
            vec![(NodeRef::Switch(SwitchId::new(1)), NodeRef::Switch(SwitchId::new(2)))]
        );
    }
}
