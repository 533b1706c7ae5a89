use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

use crate::api::scenario_dto::{NodeDto, ScenarioDto};
use crate::domain::sim_model::resource::link::Link;
use crate::domain::sim_model::resource::node::Node;
use crate::domain::sim_model::utils::id::{LinkId, NodeId, NodeName};
use crate::domain::sim_model::utils::location::{DistanceMetric, Location};
use crate::error::{Error, Result, SimError};

/// Distance assigned to a link when an endpoint has no location.
const DEFAULT_LINK_DISTANCE: f64 = 1.0;

/// The graph of nodes and directed links owned by one run.
///
/// Nodes and links live in arenas and refer to each other only by key:
/// * **Nodes**: compute resources, looked up by key or by name.
/// * **Links**: bandwidth pools between two nodes, at most one per ordered pair.
/// * **Adjacency**: outgoing links per node, in insertion order so routing is deterministic.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: SlotMap<NodeId, Node>,
    links: SlotMap<LinkId, Link>,
    name_index: HashMap<NodeName, NodeId>,
    adjacency: SecondaryMap<NodeId, Vec<LinkId>>,
    link_index: HashMap<(NodeId, NodeId), LinkId>,
    distance_metric: DistanceMetric,
}

impl TryFrom<(ScenarioDto, DistanceMetric)> for Topology {
    type Error = Error;

    fn try_from(args: (ScenarioDto, DistanceMetric)) -> Result<Self> {
        let (dto, distance_metric) = args;
        let mut topology = Topology::new(distance_metric);

        // 1. Nodes first, links refer to them by name.
        for node_dto in dto.nodes.iter() {
            topology.add_node(Topology::node_from_dto(node_dto))?;
        }

        // 2. Links, expanding bidirectional entries into two directed links.
        for link_dto in dto.links.iter() {
            topology.add_link(&link_dto.src, &link_dto.dst, link_dto.bandwidth, link_dto.base_latency)?;

            if link_dto.bidirectional {
                topology.add_link(&link_dto.dst, &link_dto.src, link_dto.bandwidth, link_dto.base_latency)?;
            }
        }

        if topology.links.is_empty() {
            log::info!("Topology without links: tasks can only run on their source node.");
        }

        log::info!("Topology constructed with {} nodes and {} links.", topology.nodes.len(), topology.links.len());
        Ok(topology)
    }
}

impl Topology {
    pub fn new(distance_metric: DistanceMetric) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            links: SlotMap::with_key(),
            name_index: HashMap::new(),
            adjacency: SecondaryMap::new(),
            link_index: HashMap::new(),
            distance_metric,
        }
    }

    fn node_from_dto(dto: &NodeDto) -> Node {
        let mut node = Node::new(dto.id, NodeName::new(dto.name.clone()), dto.max_cpu_freq)
            .with_buffer_size(dto.max_buffer_size)
            .with_power(dto.idle_power, dto.exe_power)
            .with_energy_budget(dto.energy_budget);

        if let Some(location) = dto.location {
            node = node.with_location(Location::new(location.x, location.y));
        }
        node
    }

    /// Adds a node. Names and numeric ids must be unique.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if self.name_index.contains_key(&node.name) {
            return Err(Error::ModelConstructionError(format!("duplicate node name {}", node.name)));
        }
        if self.nodes.values().any(|n| n.id == node.id) {
            return Err(Error::ModelConstructionError(format!("duplicate node id {} for node {}", node.id, node.name)));
        }
        if !(node.max_cpu_freq().is_finite() && node.max_cpu_freq() > 0.0) {
            return Err(Error::ModelConstructionError(format!("node {} needs a positive maxCpuFreq", node.name)));
        }
        let non_negative = [
            ("idlePower", Some(node.idle_power)),
            ("exePower", Some(node.exe_power)),
            ("maxBufferSize", node.buffer.status().max_size),
            ("energyBudget", node.energy.budget()),
        ];
        if let Some((field, value)) = non_negative.iter().find_map(|(f, v)| v.filter(|v| !(*v >= 0.0)).map(|v| (f, v))) {
            return Err(Error::ModelConstructionError(format!("node {} has an invalid {} of {}", node.name, field, value)));
        }

        let name = node.name.clone();
        let key = self.nodes.insert(node);
        self.name_index.insert(name, key);
        self.adjacency.insert(key, Vec::new());

        Ok(key)
    }

    /// Adds a directed link between two existing nodes.
    pub fn add_link(&mut self, src_name: &str, dst_name: &str, bandwidth: f64, base_latency: f64) -> Result<LinkId> {
        let src = self.node_id(src_name).map_err(|_| Error::ModelConstructionError(format!("link source {} not found", src_name)))?;
        let dst = self.node_id(dst_name).map_err(|_| Error::ModelConstructionError(format!("link target {} not found", dst_name)))?;

        if src == dst {
            return Err(Error::ModelConstructionError(format!("self-loop link on node {}", src_name)));
        }
        if self.link_index.contains_key(&(src, dst)) {
            return Err(Error::ModelConstructionError(format!("duplicate link {} --> {}", src_name, dst_name)));
        }
        if bandwidth < 0.0 || base_latency < 0.0 {
            return Err(Error::ModelConstructionError(format!("link {} --> {} has a negative bandwidth or latency", src_name, dst_name)));
        }

        let distance = match (self.nodes[src].location, self.nodes[dst].location) {
            (Some(a), Some(b)) => a.distance(&b, self.distance_metric),
            _ => DEFAULT_LINK_DISTANCE,
        };

        let key = self.links.insert(Link::new(src, dst, bandwidth, base_latency, distance));
        self.link_index.insert((src, dst), key);
        if let Some(outgoing) = self.adjacency.get_mut(src) {
            outgoing.push(key);
        }

        Ok(key)
    }

    pub fn node_id(&self, name: &str) -> std::result::Result<NodeId, SimError> {
        self.name_index.get(&NodeName::new(name)).copied().ok_or_else(|| SimError::UnknownNode(name.to_string()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_id(name).ok().and_then(|id| self.nodes.get(id))
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }

    /// The link from `src` to `dst`, if one exists.
    pub fn link_between(&self, src: NodeId, dst: NodeId) -> Option<LinkId> {
        self.link_index.get(&(src, dst)).copied()
    }

    /// Outgoing links of a node, in insertion order.
    pub fn outgoing(&self, id: NodeId) -> &[LinkId] {
        self.adjacency.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> {
        self.nodes.iter_mut()
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node_names(&self) -> Vec<NodeName> {
        self.nodes.values().map(|n| n.name.clone()).collect()
    }

    /// Clears every flow, buffer, CPU reservation and energy meter.
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
        for link in self.links.values_mut() {
            link.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scenario_dto::{LinkDto, LocationDto};

    fn node_dto(id: u32, name: &str, location: Option<(f64, f64)>) -> NodeDto {
        NodeDto {
            id,
            name: name.to_string(),
            max_cpu_freq: 10.0,
            max_buffer_size: None,
            location: location.map(|(x, y)| LocationDto { x, y }),
            idle_power: 0.0,
            exe_power: 0.0,
            energy_budget: None,
        }
    }

    fn link_dto(src: &str, dst: &str, bidirectional: bool) -> LinkDto {
        LinkDto { src: src.to_string(), dst: dst.to_string(), bandwidth: 100.0, base_latency: 0.5, bidirectional }
    }

    #[test]
    fn test_bidirectional_links_are_expanded() {
        let dto = ScenarioDto {
            nodes: vec![node_dto(0, "n0", Some((0.0, 0.0))), node_dto(1, "n1", Some((3.0, 4.0))), node_dto(2, "n2", None)],
            links: vec![link_dto("n0", "n1", true), link_dto("n1", "n2", false)],
        };

        let topology = Topology::try_from((dto, DistanceMetric::Euclidean)).unwrap();

        assert_eq!(topology.node_count(), 3);
        assert_eq!(topology.link_count(), 3);

        let n0 = topology.node_id("n0").unwrap();
        let n1 = topology.node_id("n1").unwrap();
        let n2 = topology.node_id("n2").unwrap();

        let forward = topology.link_between(n0, n1).unwrap();
        assert_eq!(topology.link(forward).unwrap().distance, 5.0);
        assert!(topology.link_between(n1, n0).is_some());
        assert!(topology.link_between(n2, n1).is_none());

        // n2 has no location
        let to_n2 = topology.link_between(n1, n2).unwrap();
        assert_eq!(topology.link(to_n2).unwrap().distance, DEFAULT_LINK_DISTANCE);
    }

    #[test]
    fn test_links_to_unknown_nodes_are_rejected() {
        let dto = ScenarioDto { nodes: vec![node_dto(0, "n0", None)], links: vec![link_dto("n0", "missing", false)] };

        assert!(matches!(Topology::try_from((dto, DistanceMetric::Euclidean)), Err(Error::ModelConstructionError(_))));
    }

    #[test]
    fn test_duplicate_nodes_are_rejected() {
        let dto = ScenarioDto { nodes: vec![node_dto(0, "n0", None), node_dto(1, "n0", None)], links: vec![] };
        assert!(Topology::try_from((dto, DistanceMetric::Euclidean)).is_err());

        let dto = ScenarioDto { nodes: vec![node_dto(0, "n0", None), node_dto(0, "n1", None)], links: vec![] };
        assert!(Topology::try_from((dto, DistanceMetric::Euclidean)).is_err());
    }

    #[test]
    fn test_negative_node_parameters_are_rejected() {
        let cases: [fn(&mut NodeDto); 5] = [
            |n| n.idle_power = -1.0,
            |n| n.exe_power = -0.5,
            |n| n.max_buffer_size = Some(-10.0),
            |n| n.energy_budget = Some(-1.0),
            |n| n.max_cpu_freq = f64::NAN,
        ];

        for mutate in cases {
            let mut node = node_dto(0, "n0", None);
            mutate(&mut node);
            let dto = ScenarioDto { nodes: vec![node], links: vec![] };

            assert!(matches!(Topology::try_from((dto, DistanceMetric::Euclidean)), Err(Error::ModelConstructionError(_))));
        }

        let mut zero = node_dto(0, "n0", None);
        zero.max_buffer_size = Some(0.0);
        zero.energy_budget = Some(0.0);
        assert!(Topology::try_from((ScenarioDto { nodes: vec![zero], links: vec![] }, DistanceMetric::Euclidean)).is_ok());
    }
}
