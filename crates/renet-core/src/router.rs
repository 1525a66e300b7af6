//! The Control Loop / Event Router (spec.md §4.10, §5): the single task that serializes every
//! mutation to the Topology Store, Host Learning Table, Flow Store, and Link Store, and runs the
//! periodic re-routing pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::datapath::DatapathRegistry;
use crate::flow_store::{FlowKey, FlowStore};
use crate::hosts::{HostObservation, HostTable};
use crate::ids::{NodeRef, SwitchId};
use crate::installer::{self, InstallError};
use crate::link_store::{DirectedLink, LinkStore};
use crate::oracle::LinkCapacityOracle;
use crate::path_selector::{self, PathSelectionError};
use crate::southbound::{
    Action, FlowMatch, InboundEvent, PacketIn, PacketOut, PacketPayload, Southbound,
    SouthboundError, FlowRule, ETHER_TYPE_DISCOVERY, PRIORITY_DISCOVERY_DROP,
};
use crate::topology::{PortFloodCommand, TopologyStore};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Southbound(#[from] SouthboundError),

    #[error(transparent)]
    PathSelection(#[from] PathSelectionError),
}

/// What caused a re-routing pass to run (spec.md §4.10).
enum RerouteTrigger {
    /// End of a stats tick: scan every off-cooldown, under-performing flow.
    Tick,
    /// A port-stats reply observed a capacity drop on this directed edge: reroute every flow
    /// crossing it regardless of its current rate (spec.md §4.6).
    CapacityDrop(DirectedLink),
}

/// Owns every piece of mutable controller state. Constructed once, then driven by [`run`].
pub struct ControlLoop<S: Southbound + Send + Sync + 'static> {
    config: ControllerConfig,
    southbound: Arc<S>,
    topology: TopologyStore,
    registry: DatapathRegistry<S::SwitchHandle>,
    hosts: HostTable,
    flows: FlowStore,
    links: LinkStore,
    oracle: LinkCapacityOracle,
    stats_tasks: FxHashMap<SwitchId, JoinHandle<()>>,
    tick_tx: mpsc::UnboundedSender<SwitchId>,
    tick_rx: mpsc::UnboundedReceiver<SwitchId>,
}

impl<S: Southbound + Send + Sync + 'static> ControlLoop<S> {
    pub fn new(config: ControllerConfig, southbound: S) -> Self {
        let oracle = LinkCapacityOracle::new(config.oracle_file_path.clone());
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            config,
            southbound: Arc::new(southbound),
            topology: TopologyStore::new(),
            registry: DatapathRegistry::new(),
            hosts: HostTable::new(),
            flows: FlowStore::new(),
            links: LinkStore::new(),
            oracle,
            stats_tasks: FxHashMap::default(),
            tick_tx,
            tick_rx,
        }
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn flows(&self) -> &FlowStore {
        &self.flows
    }

    pub fn links(&self) -> &LinkStore {
        &self.links
    }

    /// Drains `inbound` until it closes, applying every event and every stats-collector tick in
    /// arrival order. Graceful shutdown (spec.md §5): aborts all per-switch tasks before
    /// returning. Returns `self` so a caller (e.g. `renet-controller`'s scenario replay mode) can
    /// inspect final state via [`ControlLoop::topology`]/[`ControlLoop::flows`]/[`ControlLoop::links`]
    /// after the run completes.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundEvent<S::SwitchHandle>>) -> Self {
        loop {
            tokio::select! {
                event = inbound.recv() => {
                    match event {
                        Some(event) => self.handle_inbound(event),
                        None => break,
                    }
                }
                Some(switch) = self.tick_rx.recv() => {
                    self.handle_tick(switch);
                }
            }
        }
        for (_, task) in self.stats_tasks.drain() {
            task.abort();
        }
        self
    }

    fn handle_inbound(&mut self, event: InboundEvent<S::SwitchHandle>) {
        match event {
            InboundEvent::SwitchUp { id, handle, ports } => self.on_switch_up(id, handle, ports),
            InboundEvent::SwitchDown { id } => self.on_switch_down(id),
            InboundEvent::LinkUp { a, b, a_port, b_port } => self.on_link_up(a, b, a_port, b_port),
            InboundEvent::LinkDown { a, b } => self.on_link_down(a, b),
            InboundEvent::PacketIn { switch, packet } => self.on_packet_in(switch, packet),
            InboundEvent::FlowStatsReply { switch, entries } => {
                self.on_flow_stats_reply(switch, entries)
            }
            InboundEvent::PortStatsReply { switch, entries } => {
                self.on_port_stats_reply(switch, entries)
            }
        }
    }

    fn on_switch_up(&mut self, id: SwitchId, handle: S::SwitchHandle, ports: Vec<crate::ids::Port>) {
        info!("switch {id} up");
        match self.topology.on_switch_up(id) {
            Ok(commands) => self.apply_flood_commands(commands),
            Err(err) => {
                warn!("switch_up({id}): {err}");
                return;
            }
        }
        self.registry.on_switch_up(id, handle.clone(), ports);

        // SUPPLEMENT (SPEC_FULL.md §3): install the discovery-drop default flow, grounded in
        // `install_default_flows` from the original controller.
        let rule = FlowRule {
            matching: FlowMatch::discovery(),
            action: Action::OutputTableLookup,
            priority: PRIORITY_DISCOVERY_DROP,
        };
        if let Err(err) = self.southbound.install_flow_rule(&handle, rule) {
            warn!("discovery-drop install on {id}: {err}");
        }

        self.spawn_stats_collector(id, handle);
    }

    fn on_switch_down(&mut self, id: SwitchId) {
        info!("switch {id} down");
        if let Some(task) = self.stats_tasks.remove(&id) {
            task.abort();
        }
        self.registry.on_switch_down(id);
        let commands = self.topology.on_switch_down(id);
        self.apply_flood_commands(commands);
    }

    fn on_link_up(&mut self, a: SwitchId, b: SwitchId, a_port: crate::ids::Port, b_port: crate::ids::Port) {
        info!("link {a}<->{b} up");
        match self.topology.on_link_up(a, b, a_port, b_port) {
            Ok(commands) => self.apply_flood_commands(commands),
            Err(err) => warn!("link_up({a},{b}): {err}"),
        }
    }

    fn on_link_down(&mut self, a: SwitchId, b: SwitchId) {
        info!("link {a}<->{b} down");
        let commands = self.topology.on_link_down(a, b);
        self.apply_flood_commands(commands);
    }

    fn apply_flood_commands(&self, commands: Vec<PortFloodCommand>) {
        for cmd in commands {
            let Some(handle) = self.registry.handle(cmd.switch) else {
                // Transient: switch is transitioning. spec.md §4.2/§7.
                continue;
            };
            if let Err(err) = self.southbound.set_port_flood(handle, cmd.port, cmd.flood_enabled) {
                warn!("set_port_flood({}, {}): {err}", cmd.switch, cmd.port);
            }
        }
    }

    fn spawn_stats_collector(&mut self, id: SwitchId, handle: S::SwitchHandle) {
        let southbound = self.southbound.clone();
        let tx = self.tick_tx.clone();
        let period = Duration::from_secs(self.config.stats_interval_seconds.max(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately; skip it, poll on cadence after
            loop {
                ticker.tick().await;
                if let Err(err) = southbound.request_flow_stats(&handle) {
                    warn!("request_flow_stats({id}): {err}");
                }
                if let Err(err) = southbound.request_port_stats(&handle) {
                    warn!("request_port_stats({id}): {err}");
                }
                if tx.send(id).is_err() {
                    break;
                }
            }
        });
        self.stats_tasks.insert(id, task);
    }

    /// End-of-tick bookkeeping (spec.md §4.4): every switch's collector loop decrements
    /// `active_countdown` on every active flow, globally — matching the original controller's
    /// per-switch-triggered, store-wide sweep rather than partitioning by switch.
    fn handle_tick(&mut self, switch: SwitchId) {
        debug!("stats tick for switch {switch}");
        let newly_inactive = self.flows.tick();
        if !newly_inactive.is_empty() {
            debug!("{} flow(s) went inactive", newly_inactive.len());
            self.run_rerouting_pass(RerouteTrigger::Tick);
        }
    }

    fn on_packet_in(&mut self, switch: SwitchId, packet: PacketIn) {
        if packet.ether_type == ETHER_TYPE_DISCOVERY {
            return;
        }

        if self.hosts.observe(packet.src_mac, switch, packet.in_port) == HostObservation::New {
            let commands = self.topology.on_host_seen(packet.src_mac, switch, packet.in_port);
            self.apply_flood_commands(commands);
        }

        let dst_known = self.hosts.contains(packet.dst_mac);
        let Some((src_port, dst_port)) = packet.transport_ports else {
            self.flood(switch, &packet);
            return;
        };
        if !dst_known {
            self.flood(switch, &packet);
            return;
        }

        let key = FlowKey::new(packet.src_mac, packet.dst_mac, src_port, dst_port);
        match self.select_and_install(
            NodeRef::Host(packet.src_mac),
            NodeRef::Host(packet.dst_mac),
            key,
        ) {
            Ok(()) => {
                let Some(handle) = self.registry.handle(switch) else {
                    return;
                };
                let out = PacketOut {
                    payload: packet
                        .buffer_id
                        .map(PacketPayload::Buffered)
                        .unwrap_or(PacketPayload::Raw(Vec::new())),
                    in_port: packet.in_port,
                    action: Action::OutputTableLookup,
                };
                if let Err(err) = self.southbound.send_packet_out(handle, out) {
                    warn!("send_packet_out({switch}): {err}");
                }
            }
            Err(err) => {
                // spec.md §7: "No path" -> log, leave uninstalled, flood as last resort.
                warn!("no path for {key:?}: {err}");
                self.flood(switch, &packet);
            }
        }
    }

    fn flood(&self, switch: SwitchId, packet: &PacketIn) {
        let Some(handle) = self.registry.handle(switch) else {
            return;
        };
        let out = PacketOut {
            payload: packet
                .buffer_id
                .map(PacketPayload::Buffered)
                .unwrap_or(PacketPayload::Raw(Vec::new())),
            in_port: packet.in_port,
            action: Action::OutputFlood,
        };
        if let Err(err) = self.southbound.send_packet_out(handle, out) {
            warn!("flood send_packet_out({switch}): {err}");
        }
    }

    /// Selects a path for `(src, dst)` and installs it (spec.md §4.9's "otherwise" branch).
    fn select_and_install(
        &mut self,
        src: NodeRef,
        dst: NodeRef,
        key: FlowKey,
    ) -> Result<(), RouterError> {
        let candidate = path_selector::select_path(
            &self.topology,
            &self.links,
            src,
            dst,
            self.config.k_shortest_paths,
            self.config.desired_rate(),
        )?;
        self.apply_path_change(key, candidate.path);
        Ok(())
    }

    /// Rewrites `key`'s (and its reverse's) installed path: decrements `active_flows` on the old
    /// path's interior hops, increments on the new path's, updates the Flow Store, and installs
    /// the new rules in both directions (spec.md §4.8, §4.9, §4.10 step 3).
    fn apply_path_change(&mut self, key: FlowKey, new_path: Vec<NodeRef>) {
        let now = Utc::now();
        let old_path = self.flows.get(&key).map(|r| r.path.clone()).unwrap_or_default();

        if !old_path.is_empty() {
            self.adjust_active_flows(&old_path, false);
        }
        self.adjust_active_flows(&new_path, true);

        let reversed_path: Vec<NodeRef> = new_path.iter().rev().copied().collect();
        self.flows.set_path(key, new_path.clone(), now);
        self.flows.set_path(key.reversed(), reversed_path, now);

        if let Err(err) =
            installer::install_path(&self.topology, &self.registry, &*self.southbound, &new_path, key)
        {
            warn!("install_path({key:?}): {err}");
        }
    }

    fn adjust_active_flows(&mut self, path: &[NodeRef], increment: bool) {
        for window in path.windows(2) {
            let (Some(a), Some(b)) = (window[0].as_switch(), window[1].as_switch()) else {
                continue;
            };
            let link = DirectedLink::new(a, b);
            if increment {
                self.links.increment_active_flows(link, Utc::now());
            } else {
                self.links.decrement_active_flows(link);
            }
        }
    }

    fn on_flow_stats_reply(&mut self, switch: SwitchId, entries: Vec<crate::southbound::FlowStatsEntry>) {
        let now = Utc::now();
        for entry in entries {
            let (Some((src_port, dst_port)), Some(src_mac), Some(dst_mac)) = (
                entry.matching.transport_ports,
                entry.matching.src_mac,
                entry.matching.dst_mac,
            ) else {
                // spec.md §7: match can't be parsed into a FlowKey -> ignore this entry.
                continue;
            };
            let key = FlowKey::new(src_mac, dst_mac, src_port, dst_port);
            self.flows.record_stats_reply(
                key,
                entry.byte_count,
                entry.duration_millis as f64 / 1000.0,
                now,
                self.config.desired_rate(),
                self.config.active_countdown_ticks,
            );
        }
        let _ = switch;
    }

    fn on_port_stats_reply(&mut self, switch: SwitchId, entries: Vec<crate::southbound::PortStatsEntry>) {
        let now = Utc::now();
        let switch_node = NodeRef::Switch(switch);
        for entry in entries {
            let neighbor = self
                .topology
                .neighbors(switch_node)
                .into_iter()
                .find(|&n| self.topology.edge_port(switch_node, n) == Some(entry.port));
            let Some(NodeRef::Switch(neighbor)) = neighbor else {
                // Host-facing port, or not yet in the graph: spec.md §4.6 "skip".
                continue;
            };
            let link = DirectedLink::new(switch, neighbor);
            let capacity_mbps = self.oracle.capacity_or_zero(switch, neighbor);
            let capacity: crate::units::BytesPerSec = capacity_mbps.into();
            let dropped = self.links.record_port_stats_reply(
                link,
                entry.rx_bytes,
                self.config.stats_interval_seconds as f64,
                capacity,
                now,
            );
            if dropped {
                info!("capacity drop on {switch}->{neighbor}");
                self.run_rerouting_pass(RerouteTrigger::CapacityDrop(link));
            }
        }
    }

    fn run_rerouting_pass(&mut self, trigger: RerouteTrigger) {
        let mut candidates = self.flows.reroute_candidates(self.config.reroute_ratio_trigger);
        if let RerouteTrigger::CapacityDrop(link) = trigger {
            let forced = self
                .flows
                .flows_traversing(NodeRef::Switch(link.from), NodeRef::Switch(link.to));
            for key in forced {
                if self.flows.get(&key).map(|r| r.reroute_cooldown == 0).unwrap_or(false)
                    && !candidates.contains(&key)
                {
                    candidates.push(key);
                }
            }
        }

        candidates.sort_by(|a, b| {
            let ratio = |k: &FlowKey| {
                self.flows
                    .get(k)
                    .map(|r| r.current_rate.into_f64() / r.desired_rate.into_f64().max(1e-9))
                    .unwrap_or(f64::INFINITY)
            };
            ratio(a).partial_cmp(&ratio(b)).unwrap()
        });

        for key in candidates {
            let Some(record) = self.flows.get(&key) else { continue };
            let current_rate = record.current_rate;
            let candidate = match path_selector::select_path(
                &self.topology,
                &self.links,
                NodeRef::Host(key.src_mac),
                NodeRef::Host(key.dst_mac),
                self.config.k_shortest_paths,
                self.config.desired_rate(),
            ) {
                Ok(c) => c,
                Err(PathSelectionError::NoPath(_, _))
                | Err(PathSelectionError::UnknownSource(_))
                | Err(PathSelectionError::UnknownDestination(_)) => continue,
            };

            if candidate.expected_throughput.into_f64()
                > self.config.reroute_ratio_improvement * current_rate.into_f64()
            {
                info!("rerouting {key:?}: {current_rate} -> {}", candidate.expected_throughput);
                self.apply_path_change(key, candidate.path);
                self.flows.set_reroute_cooldown(&key, self.config.reroute_cooldown_ticks);
                self.flows
                    .set_reroute_cooldown(&key.reversed(), self.config.reroute_cooldown_ticks);
            }
        }
    }
}
