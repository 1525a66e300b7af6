//! The Path Selector (spec.md §4.7): enumerates up to K loop-free shortest paths between two
//! nodes and scores each by bottleneck expected throughput.
//!
//! K-shortest-simple-paths has no petgraph builtin, so it is hand-rolled here as Yen's algorithm
//! over a BFS shortest-path primitive (hop count is the only edge weight spec.md §4.7 calls for).

use std::collections::{HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::ids::NodeRef;
use crate::link_store::{DirectedLink, LinkStore};
use crate::topology::{DirectedEdge, TopologyStore};
use crate::units::BytesPerSec;

#[derive(Debug, thiserror::Error)]
pub enum PathSelectionError {
    #[error("source node {0} is not in the topology")]
    UnknownSource(NodeRef),

    #[error("destination node {0} is not in the topology")]
    UnknownDestination(NodeRef),

    #[error("no path found from {0} to {1}")]
    NoPath(NodeRef, NodeRef),
}

/// A scored candidate path: a host-to-host node sequence plus its expected bottleneck throughput.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCandidate {
    pub path: Vec<NodeRef>,
    pub expected_throughput: BytesPerSec,
}

/// Computes the best path from `src` to `dst` per spec.md §4.7: up to `k` simple shortest paths,
/// scored by bottleneck `max(available, fair_share)` per interior hop, preferring the smallest
/// throughput that still clears `desired_rate` (falling back to the best-scoring candidate).
pub fn select_path(
    topology: &TopologyStore,
    link_store: &LinkStore,
    src: NodeRef,
    dst: NodeRef,
    k: usize,
    desired_rate: BytesPerSec,
) -> Result<PathCandidate, PathSelectionError> {
    let src_idx = topology
        .node_index(src)
        .ok_or(PathSelectionError::UnknownSource(src))?;
    let dst_idx = topology
        .node_index(dst)
        .ok_or(PathSelectionError::UnknownDestination(dst))?;

    let index_paths = k_shortest_simple_paths(topology.graph(), src_idx, dst_idx, k);

    let mut candidates: Vec<PathCandidate> = index_paths
        .into_iter()
        .filter_map(|idx_path| {
            let path: Vec<NodeRef> = idx_path.iter().map(|&i| topology.graph()[i]).collect();
            score_path(link_store, &path)
        })
        .collect();

    if candidates.is_empty() {
        return Err(PathSelectionError::NoPath(src, dst));
    }

    candidates.sort_by(|a, b| {
        a.expected_throughput
            .into_f64()
            .partial_cmp(&b.expected_throughput.into_f64())
            .unwrap()
    });

    let chosen = candidates
        .iter()
        .find(|c| c.expected_throughput.into_f64() > desired_rate.into_f64())
        .or_else(|| candidates.last())
        .expect("candidates is non-empty")
        .clone();

    Ok(chosen)
}

/// Scores one candidate path. Returns `None` if any interior hop references a link the Link
/// Store has never heard from (spec.md §4.7: "treat its capacity as unknown and skip the
/// candidate").
fn score_path(link_store: &LinkStore, path: &[NodeRef]) -> Option<PathCandidate> {
    let mut bottleneck = f64::INFINITY;
    for window in path.windows(2) {
        let (a, b) = (window[0], window[1]);
        let (Some(a_sw), Some(b_sw)) = (a.as_switch(), b.as_switch()) else {
            continue;
        };
        let link = link_store.get(DirectedLink::new(a_sw, b_sw))?;
        let per_link_throughput = link.available().into_f64().max(link.fair_share().into_f64());
        bottleneck = bottleneck.min(per_link_throughput);
    }
    Some(PathCandidate {
        path: path.to_vec(),
        expected_throughput: BytesPerSec::new(bottleneck),
    })
}

fn bfs_shortest_path(
    graph: &DiGraph<NodeRef, DirectedEdge>,
    start: NodeIndex,
    goal: NodeIndex,
    removed_nodes: &HashSet<NodeIndex>,
    removed_edges: &HashSet<(NodeIndex, NodeIndex)>,
) -> Option<Vec<NodeIndex>> {
    if removed_nodes.contains(&start) || removed_nodes.contains(&goal) {
        return None;
    }
    let mut visited = HashSet::new();
    visited.insert(start);
    let mut predecessor = std::collections::HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        if node == goal {
            let mut path = vec![goal];
            let mut cur = goal;
            while let Some(&prev) = predecessor.get(&cur) {
                path.push(prev);
                cur = prev;
            }
            path.reverse();
            return Some(path);
        }
        for next in graph.neighbors(node) {
            if removed_nodes.contains(&next) || visited.contains(&next) {
                continue;
            }
            if removed_edges.contains(&(node, next)) {
                continue;
            }
            visited.insert(next);
            predecessor.insert(next, node);
            queue.push_back(next);
        }
    }
    None
}

/// Yen's K-shortest-simple-paths algorithm, hop-count weighted.
fn k_shortest_simple_paths(
    graph: &DiGraph<NodeRef, DirectedEdge>,
    start: NodeIndex,
    goal: NodeIndex,
    k: usize,
) -> Vec<Vec<NodeIndex>> {
    if k == 0 {
        return Vec::new();
    }
    let Some(first) = bfs_shortest_path(graph, start, goal, &HashSet::new(), &HashSet::new())
    else {
        return Vec::new();
    };

    let mut found: Vec<Vec<NodeIndex>> = vec![first];
    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();

    while found.len() < k {
        let prev_path = found.last().unwrap().clone();

        for i in 0..prev_path.len().saturating_sub(1) {
            let spur_node = prev_path[i];
            let root_path = &prev_path[..=i];

            let mut removed_edges = HashSet::new();
            for path in &found {
                if path.len() > i && path[..=i] == *root_path {
                    removed_edges.insert((path[i], path[i + 1]));
                }
            }
            let removed_nodes: HashSet<NodeIndex> = root_path[..i].iter().copied().collect();

            if let Some(spur_path) =
                bfs_shortest_path(graph, spur_node, goal, &removed_nodes, &removed_edges)
            {
                let mut total_path = root_path[..i].to_vec();
                total_path.extend(spur_path);
                if !found.contains(&total_path) && !candidates.contains(&total_path) {
                    candidates.push(total_path);
                }
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by_key(|p| p.len());
        found.push(candidates.remove(0));
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Port, SwitchId};
    use crate::mac::MacAddr;
    use chrono::Utc;

    fn triangle() -> TopologyStore {
        let mut store = TopologyStore::new();
        store.on_switch_up(SwitchId::new(1)).unwrap();
        store.on_switch_up(SwitchId::new(2)).unwrap();
        store.on_switch_up(SwitchId::new(3)).unwrap();
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

    #[test]
    fn k_equals_one_degenerates_to_hop_count_shortest_path() {
        let store = triangle();
        let idx1 = store.node_index(NodeRef::Switch(SwitchId::new(1))).unwrap();
        let idx3 = store.node_index(NodeRef::Switch(SwitchId::new(3))).unwrap();
        let paths = k_shortest_simple_paths(store.graph(), idx1, idx3, 1);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2, "direct 1-hop edge wins on hop count");
    }

    #[test]
    fn two_contending_flows_see_fair_share_capacity_over_three() {
        let mut link_store = LinkStore::new();
        let link = DirectedLink::new(SwitchId::new(1), SwitchId::new(2));
        link_store.record_port_stats_reply(link, 0, 1.0, BytesPerSec::new(3_000.0), Utc::now());
        link_store.increment_active_flows(link, Utc::now());
        link_store.increment_active_flows(link, Utc::now());
        let path = vec![
            NodeRef::Host(MacAddr::new([0, 0, 0, 0, 0, 1])),
            NodeRef::Switch(SwitchId::new(1)),
            NodeRef::Switch(SwitchId::new(2)),
            NodeRef::Host(MacAddr::new([0, 0, 0, 0, 0, 2])),
        ];
        let scored = score_path(&link_store, &path).unwrap();
        assert_eq!(scored.expected_throughput, BytesPerSec::new(1_000.0));
    }

    #[test]
    fn missing_link_record_skips_candidate() {
        let link_store = LinkStore::new();
        let path = vec![
            NodeRef::Switch(SwitchId::new(1)),
            NodeRef::Switch(SwitchId::new(2)),
        ];
        assert!(score_path(&link_store, &path).is_none());
    }

    #[test]
    fn triangle_routing_table_shape() {
        let mut store = triangle();
        let h1 = MacAddr::new([0, 0, 0, 0, 0, 1]);
        let h2 = MacAddr::new([0, 0, 0, 0, 0, 2]);
        store.on_host_seen(h1, SwitchId::new(1), Port::new(10));
        store.on_host_seen(h2, SwitchId::new(3), Port::new(10));

        let mut link_store = LinkStore::new();
        for (a, b) in [(1, 2), (2, 1), (2, 3), (3, 2), (1, 3), (3, 1)] {
            link_store.record_port_stats_reply(
                DirectedLink::new(SwitchId::new(a), SwitchId::new(b)),
                0,
                1.0,
                BytesPerSec::new(1_250_000.0),
                Utc::now(),
            );
        }

        let chosen = select_path(
            &store,
            &link_store,
            NodeRef::Host(h1),
            NodeRef::Host(h2),
            5,
            BytesPerSec::new(125_000.0),
        )
        .unwrap();
        let rendered: Vec<String> = chosen.path.iter().map(|n| n.to_string()).collect();
        insta::assert_yaml_snapshot!(rendered, @r###"
        - "host:00:00:00:00:00:01"
        - "switch:1"
        - "switch:3"
        - "host:00:00:00:00:00:02"
        "###);
    }
}
