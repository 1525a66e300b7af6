//! The Link Store (spec.md §4.6, §3): per-directed-edge capacity/usage/active-flow records,
//! refreshed by port-statistics replies.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::ids::SwitchId;
use crate::units::BytesPerSec;

/// A directed switch-to-switch edge, used as the Link Store's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectedLink {
    pub from: SwitchId,
    pub to: SwitchId,
}

impl DirectedLink {
    pub fn new(from: SwitchId, to: SwitchId) -> Self {
        Self { from, to }
    }

    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

/// Per-directed-edge measurements (spec.md §3). `capacity ≥ 0`, `usage ≥ 0`, `active_flows ≥ 0`
/// are maintained as invariants by every mutator below.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub capacity: BytesPerSec,
    pub usage: BytesPerSec,
    pub update_time: DateTime<Utc>,
    pub active_flows: u32,
    prev_rx_bytes: u64,
}

impl LinkRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            capacity: BytesPerSec::ZERO,
            usage: BytesPerSec::ZERO,
            update_time: now,
            active_flows: 0,
            prev_rx_bytes: 0,
        }
    }

    /// `available = max(0, capacity - usage)` (spec.md §4.7 step 2).
    pub fn available(&self) -> BytesPerSec {
        BytesPerSec::new((self.capacity.into_f64() - self.usage.into_f64()).max(0.0))
    }

    /// `fair_share = capacity / (active_flows + 1)` (spec.md §4.7 step 2): the share this link
    /// would give a new contending flow if every existing flow backed off evenly.
    pub fn fair_share(&self) -> BytesPerSec {
        BytesPerSec::new(self.capacity.into_f64() / (self.active_flows as f64 + 1.0))
    }
}

/// Per-directed-edge records, single-writer (the event router).
#[derive(Debug, Clone, Default)]
pub struct LinkStore {
    links: FxHashMap<DirectedLink, LinkRecord>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, link: DirectedLink) -> Option<&LinkRecord> {
        self.links.get(&link)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DirectedLink, &LinkRecord)> {
        self.links.iter()
    }

    /// Applies a port-statistics reply entry for the directed edge `this -> neighbor` (spec.md
    /// §4.6): `usage = max(0, rx_bytes - prev_rx_bytes) / interval_secs`, `prev_rx_bytes =
    /// rx_bytes`, `capacity` from the oracle, `update_time = now`. Returns `true` if `capacity`
    /// dropped relative to its previous value, signaling the caller to trigger an immediate
    /// reroute consideration (spec.md §4.6).
    pub fn record_port_stats_reply(
        &mut self,
        link: DirectedLink,
        rx_bytes: u64,
        interval_secs: f64,
        capacity: BytesPerSec,
        now: DateTime<Utc>,
    ) -> bool {
        let record = self
            .links
            .entry(link)
            .or_insert_with(|| LinkRecord::new(now));
        let delta = rx_bytes.saturating_sub(record.prev_rx_bytes);
        record.usage = BytesPerSec::new(delta as f64 / interval_secs.max(1e-6));
        record.prev_rx_bytes = rx_bytes;
        let capacity_dropped = capacity.into_f64() < record.capacity.into_f64();
        record.capacity = capacity;
        record.update_time = now;
        capacity_dropped
    }

    pub fn increment_active_flows(&mut self, link: DirectedLink, now: DateTime<Utc>) {
        let record = self
            .links
            .entry(link)
            .or_insert_with(|| LinkRecord::new(now));
        record.active_flows += 1;
    }

    /// Decrements `active_flows`, clamping to zero. spec.md §7 treats a would-be-negative count
    /// as a programming invariant violation: assert in debug, clamp in release.
    pub fn decrement_active_flows(&mut self, link: DirectedLink) {
        if let Some(record) = self.links.get_mut(&link) {
            debug_assert!(record.active_flows > 0, "active_flows underflow on {link:?}");
            record.active_flows = record.active_flows.saturating_sub(1);
        }
    }

    /// Debug-audit pass (spec.md §9): recomputes every link's `active_flows` from scratch by
    /// scanning the Flow Store, rather than trusting the incrementally maintained counter.
    pub fn recompute_active_flows_from(&mut self, flows: &crate::flow_store::FlowStore) {
        for record in self.links.values_mut() {
            record.active_flows = 0;
        }
        for (_, flow) in flows.iter() {
            if !flow.active {
                continue;
            }
            for (a, b) in flow.interior_switch_hops() {
                let (Some(a), Some(b)) = (a.as_switch(), b.as_switch()) else {
                    continue;
                };
                let link = DirectedLink::new(a, b);
                self.links
                    .entry(link)
                    .or_insert_with(|| LinkRecord::new(Utc::now()))
                    .active_flows += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_delta_over_interval() {
        let mut store = LinkStore::new();
        let link = DirectedLink::new(SwitchId::new(1), SwitchId::new(2));
        let now = Utc::now();
        store.record_port_stats_reply(link, 1000, 5.0, BytesPerSec::new(10_000.0), now);
        store.record_port_stats_reply(link, 6000, 5.0, BytesPerSec::new(10_000.0), now);
        assert_eq!(store.get(link).unwrap().usage, BytesPerSec::new(1000.0));
    }

    #[test]
    fn capacity_drop_is_reported() {
        let mut store = LinkStore::new();
        let link = DirectedLink::new(SwitchId::new(1), SwitchId::new(2));
        let now = Utc::now();
        store.record_port_stats_reply(link, 0, 5.0, BytesPerSec::new(10_000.0), now);
        let dropped = store.record_port_stats_reply(link, 0, 5.0, BytesPerSec::new(1_000.0), now);
        assert!(dropped);
    }

    #[test]
    fn fair_share_is_capacity_over_n_plus_one() {
        let mut store = LinkStore::new();
        let link = DirectedLink::new(SwitchId::new(1), SwitchId::new(2));
        let now = Utc::now();
        store.record_port_stats_reply(link, 0, 5.0, BytesPerSec::new(3_000.0), now);
        store.increment_active_flows(link, now);
        store.increment_active_flows(link, now);
        // Two existing flows + the candidate considering this link: capacity / 3.
        assert_eq!(store.get(link).unwrap().fair_share(), BytesPerSec::new(1_000.0));
    }

    #[test]
    fn decrement_never_goes_negative() {
        let mut store = LinkStore::new();
        let link = DirectedLink::new(SwitchId::new(1), SwitchId::new(2));
        store.record_port_stats_reply(link, 0, 5.0, BytesPerSec::ZERO, Utc::now());
        store.decrement_active_flows(link);
        assert_eq!(store.get(link).unwrap().active_flows, 0);
    }
}
