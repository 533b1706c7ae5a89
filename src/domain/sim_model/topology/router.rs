use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::domain::sim_model::topology::topology::Topology;
use crate::domain::sim_model::utils::id::{LinkId, NodeId};
use crate::error::SimError;

/// Edge weight used to pick the shortest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingWeight {
    /// Fewest links.
    #[default]
    Hops,
    /// Smallest summed link distance.
    Distance,
    /// Smallest summed base latency.
    Latency,
}

/// A route through the network as the ordered links to traverse.
///
/// An empty path means source and destination are the same node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    pub links: Vec<LinkId>,
}

impl Path {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    pub fn hops(&self) -> usize {
        self.links.len()
    }

    pub fn is_local(&self) -> bool {
        self.links.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Computes paths between nodes. The topology is static during a run, so paths may be cached per pair.
#[derive(Debug, Clone)]
pub struct Router {
    weight: RoutingWeight,
    path_cache: Option<HashMap<(NodeId, NodeId), Path>>,
}

impl Router {
    pub fn new(weight: RoutingWeight, cache_paths: bool) -> Self {
        Self { weight, path_cache: cache_paths.then(HashMap::new) }
    }

    /// Shortest path from `src` to `dst`, or `NoPath` if they are disconnected.
    pub fn route(&mut self, topology: &Topology, src: NodeId, dst: NodeId) -> Result<Path, SimError> {
        if src == dst {
            return Ok(Path::new());
        }

        if let Some(path) = self.path_cache.as_ref().and_then(|cache| cache.get(&(src, dst))) {
            return Ok(path.clone());
        }

        let path = match self.weight {
            RoutingWeight::Hops => Self::breadth_first(topology, src, dst),
            RoutingWeight::Distance | RoutingWeight::Latency => self.dijkstra(topology, src, dst),
        };

        let Some(path) = path else {
            let name = |id: NodeId| topology.node(id).map(|n| n.name.to_string()).unwrap_or_default();
            log::debug!("NoPathFound: {} => {}", name(src), name(dst));
            return Err(SimError::NoPath { src: name(src), dst: name(dst) });
        };

        if let Some(cache) = self.path_cache.as_mut() {
            cache.insert((src, dst), path.clone());
        }

        Ok(path)
    }

    fn breadth_first(topology: &Topology, src: NodeId, dst: NodeId) -> Option<Path> {
        let mut via: HashMap<NodeId, LinkId> = HashMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::from([src]);

        while let Some(current) = queue.pop_front() {
            if current == dst {
                return Some(Self::unwind(topology, &via, src, dst));
            }

            for link_id in topology.outgoing(current) {
                let Some(link) = topology.link(*link_id) else { continue };
                if link.dst != src && !via.contains_key(&link.dst) {
                    via.insert(link.dst, *link_id);
                    queue.push_back(link.dst);
                }
            }
        }

        None
    }

    fn dijkstra(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Path> {
        let mut best: HashMap<NodeId, f64> = HashMap::from([(src, 0.0)]);
        let mut via: HashMap<NodeId, LinkId> = HashMap::new();
        let mut heap = BinaryHeap::from([Frontier { cost: 0.0, seq: 0, node: src }]);
        let mut seq = 1;

        while let Some(Frontier { cost, node, .. }) = heap.pop() {
            if node == dst {
                return Some(Self::unwind(topology, &via, src, dst));
            }
            if best.get(&node).is_some_and(|b| cost > *b) {
                continue;
            }

            for link_id in topology.outgoing(node) {
                let Some(link) = topology.link(*link_id) else { continue };
                let edge = match self.weight {
                    RoutingWeight::Hops => 1.0,
                    RoutingWeight::Distance => link.distance,
                    RoutingWeight::Latency => link.base_latency,
                };
                let next_cost = cost + edge;

                // Strict improvement only, so equal-cost ties keep the first path found.
                if best.get(&link.dst).is_none_or(|b| next_cost < *b) {
                    best.insert(link.dst, next_cost);
                    via.insert(link.dst, *link_id);
                    heap.push(Frontier { cost: next_cost, seq, node: link.dst });
                    seq += 1;
                }
            }
        }

        None
    }

    fn unwind(topology: &Topology, via: &HashMap<NodeId, LinkId>, src: NodeId, dst: NodeId) -> Path {
        let mut links = Vec::new();
        let mut current = dst;

        while current != src {
            let Some(link_id) = via.get(&current) else { break };
            links.push(*link_id);
            match topology.link(*link_id) {
                Some(link) => current = link.src,
                None => break,
            }
        }

        links.reverse();
        Path { links }
    }

    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.path_cache.as_mut() {
            cache.clear();
        }
    }
}
