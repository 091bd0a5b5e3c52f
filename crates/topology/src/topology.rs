//! Weighted undirected graph over regions.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};

use log::debug;
use petgraph::{
    algo::astar,
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::{
    error::{Result, TopologyError},
    network_link::{LinkId, NetworkLink, RegionId},
};

/// Weighted undirected graph over regions.
///
/// Edge `i` of the graph is link `i + 1`; links are never removed. Shortest paths are memoized
/// per ordered `(origin, target)` pair. The cache lives as long as the graph is unchanged:
/// adding a region or a link drops it, nothing else does.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<RegionId, NodeIndex>,
    graph: UnGraph<RegionId, u64>,
    links: Vec<NetworkLink>,
    shortest_paths: RefCell<HashMap<(RegionId, RegionId), Vec<RegionId>>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a region as an isolated node.
    pub fn add_region(&mut self, region: RegionId) -> Result<()> {
        if self.nodes.contains_key(&region) {
            return Err(TopologyError::DuplicateRegion(region));
        }
        let node = self.graph.add_node(region);
        self.nodes.insert(region, node);
        self.shortest_paths.get_mut().clear();
        Ok(())
    }

    /// Connects two known regions with a link of the given delay and returns the link id.
    pub fn add_link(&mut self, a: RegionId, b: RegionId, delay: u64) -> Result<LinkId> {
        let from = self.node(a)?;
        let to = self.node(b)?;
        if a == b {
            return Err(TopologyError::SelfLoop(a));
        }
        if self.graph.contains_edge(from, to) {
            return Err(TopologyError::DuplicateLink(a, b));
        }

        let id = self.graph.add_edge(from, to, delay).index() + 1;
        self.links.push(NetworkLink { id, nodes: (a, b), delay });
        self.shortest_paths.get_mut().clear();
        Ok(id)
    }

    pub fn contains_region(&self, region: RegionId) -> bool {
        self.nodes.contains_key(&region)
    }

    pub fn regions(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn region_count(&self) -> usize {
        self.nodes.len()
    }

    /// All links in creation order.
    pub fn links(&self) -> &[NetworkLink] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&NetworkLink> {
        id.checked_sub(1).and_then(|index| self.links.get(index))
    }

    /// Returns the link joining `a` and `b` directly, if any.
    pub fn link_between(&self, a: RegionId, b: RegionId) -> Option<&NetworkLink> {
        let edge = self.graph.find_edge(*self.nodes.get(&a)?, *self.nodes.get(&b)?)?;
        self.link(edge.index() + 1)
    }

    /// Directly linked regions of `region` together with the link delay, ordered by region.
    pub fn neighbours(&self, region: RegionId) -> Vec<(RegionId, u64)> {
        let Some(&node) = self.nodes.get(&region) else {
            return Vec::new();
        };
        let mut neighbours = self
            .graph
            .edges(node)
            .map(|edge| {
                let other = if edge.source() == node { edge.target() } else { edge.source() };
                (self.graph[other], *edge.weight())
            })
            .collect::<Vec<_>>();
        neighbours.sort_unstable();
        neighbours
    }

    /// Finds the minimum-delay path from `origin` to `target`.
    ///
    /// The returned path includes both ends. When `origin == target` the path is empty, so that
    /// its delay is 0 under [Topology::path_delay].
    pub fn shortest_path(&self, origin: RegionId, target: RegionId) -> Result<Vec<RegionId>> {
        let start = self.node(origin)?;
        self.node(target)?;
        if origin == target {
            return Ok(Vec::new());
        }
        if let Some(path) = self.shortest_paths.borrow().get(&(origin, target)) {
            return Ok(path.clone());
        }

        let (_, nodes) = astar(
            &self.graph,
            start,
            |node| self.graph[node] == target,
            |edge| *edge.weight() as u128,
            |_| 0,
        )
        .ok_or(TopologyError::NoPathFound { origin, target })?;
        let path = nodes.into_iter().map(|node| self.graph[node]).collect::<Vec<_>>();
        debug!("shortest path {} -> {}: {:?}", origin, target, path);

        let mut cache = self.shortest_paths.borrow_mut();
        cache.insert((target, origin), path.iter().rev().copied().collect());
        cache.insert((origin, target), path.clone());
        Ok(path)
    }

    /// Sums link delays over consecutive regions of `path`, saturating at `u64::MAX`.
    /// Paths shorter than two regions have delay 0.
    pub fn path_delay(&self, path: &[RegionId]) -> Result<u64> {
        path.windows(2).try_fold(0u64, |total, pair| {
            let link = self.link_between(pair[0], pair[1]).ok_or(TopologyError::MissingLink {
                from: pair[0],
                to: pair[1],
            })?;
            Ok(total.saturating_add(link.delay))
        })
    }

    /// Delay of the shortest path between two regions.
    pub fn delay_between(&self, origin: RegionId, target: RegionId) -> Result<u64> {
        let path = self.shortest_path(origin, target)?;
        self.path_delay(&path)
    }

    /// Number of memoized `(origin, target)` pairs.
    pub fn cached_paths(&self) -> usize {
        self.shortest_paths.borrow().len()
    }

    /// Removes all regions and links.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.graph.clear();
        self.links.clear();
        self.shortest_paths.get_mut().clear();
    }

    fn node(&self, region: RegionId) -> Result<NodeIndex> {
        self.nodes
            .get(&region)
            .copied()
            .ok_or(TopologyError::UnknownRegion(region))
    }
}
