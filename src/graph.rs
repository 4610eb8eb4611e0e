//! The attributed transport graph and its shortest-path core.
//!
//! The teacher's `graph.rs` is a generic multi-edge-type graph library built
//! for postman-tour heuristics (`Edge` trait, SCC patching, PWRP solving).
//! None of that machinery is needed here — this crate's graph is always a
//! simple directed graph with one edge per ordered node pair and a fixed
//! attribute record. What survives, generalized, is the teacher's heap-based
//! Dijkstra: a `dp` map of best-known `(cost, predecessor edge)` per node and
//! a `PriorityQueue` ordered by negated cost (the crate is a max-heap).

use std::collections::HashMap;

use indexmap::IndexMap;
use noisy_float::prelude::{n64, N64};
use priority_queue::PriorityQueue;

use crate::model::{Edge, EdgeAttrs, Node, NodeId, NodeRole};

/// A directed, single-edge-per-(u,v) attributed graph.
///
/// Built once per mission configuration by `GraphEnricher` and treated as
/// read-only by every solver during a solve (see the concurrency model in
/// SPEC_FULL.md §5).
#[derive(Clone, Debug, Default)]
pub struct AttributedGraph {
	nodes: HashMap<NodeId, Node>,
	/// Outgoing edges per node, in insertion order (stable iteration makes
	/// tie-breaking in Dijkstra deterministic given a deterministic input).
	out_edges: IndexMap<NodeId, Vec<Edge>>,
	next_synthetic_id: NodeId,
}

impl AttributedGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_node(&mut self, node: Node) {
		if node.id >= self.next_synthetic_id {
			self.next_synthetic_id = node.id + 1;
		}
		self.nodes.insert(node.id, node);
		self.out_edges.entry(node.id).or_insert_with(Vec::new);
	}

	/// Inserts or replaces the edge `from -> to`. Per the simplification
	/// invariant, at most one edge exists per ordered pair.
	pub fn put_edge(&mut self, from: NodeId, to: NodeId, attrs: EdgeAttrs) {
		let edges = self.out_edges.entry(from).or_insert_with(Vec::new);
		if let Some(existing) = edges.iter_mut().find(|e| e.to == to) {
			existing.attrs = attrs;
		} else {
			edges.push(Edge { from, to, attrs });
		}
	}

	/// Allocates a fresh node id beyond the current maximum, for synthetic
	/// depot/frontline attachment.
	pub fn allocate_node_id(&mut self) -> NodeId {
		let id = self.next_synthetic_id;
		self.next_synthetic_id += 1;
		id
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.out_edges.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn out_edges(&self, from: NodeId) -> &[Edge] {
		self.out_edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
		self.out_edges.get(&from)?.iter().find(|e| e.to == to)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &Node> {
		self.nodes.values()
	}

	pub fn edges(&self) -> impl Iterator<Item = &Edge> {
		self.out_edges.values().flat_map(|es| es.iter())
	}

	pub fn nodes_with_role(&self, role: NodeRole) -> Vec<NodeId> {
		self.nodes
			.values()
			.filter(|n| n.role == Some(role))
			.map(|n| n.id)
			.collect()
	}

	pub fn nearest_node(&self, pos: crate::geo::LatLon) -> Option<NodeId> {
		self.nodes
			.values()
			.min_by_key(|n| n64(n.position.haversine_km(&pos)))
			.map(|n| n.id)
	}

	/// Heap-optimized Dijkstra's shortest path, edge-weighted by `weight`.
	///
	/// Returns the node path (including both endpoints) and the total cost,
	/// or `None` if `goal` is unreachable from `start`.
	pub fn shortest_path<F>(&self, start: NodeId, goal: NodeId, weight: F) -> Option<(Vec<NodeId>, f64)>
	where
		F: Fn(&Edge) -> f64,
	{
		if start == goal {
			if self.nodes.contains_key(&start) {
				return Some((vec![start], 0.0));
			}
			return None;
		}
		let mut dp: HashMap<NodeId, (N64, Option<NodeId>)> = HashMap::new();
		dp.insert(start, (n64(0.0), None));
		let mut q = PriorityQueue::new();
		q.push(start, n64(0.0));
		while let Some((u, _)) = q.pop() {
			if u == goal {
				let mut path = vec![u];
				let mut v = u;
				while let Some((_, Some(prev))) = dp.get(&v) {
					path.push(*prev);
					v = *prev;
				}
				path.reverse();
				let cost = dp.get(&goal).unwrap().0.raw();
				return Some((path, cost));
			}
			let d = dp.get(&u).unwrap().0;
			for e in self.out_edges(u) {
				let ed = n64(weight(e));
				let v = e.to;
				let cand = d + ed;
				if dp.get(&v).map_or(true, |(vd, _)| *vd > cand) {
					dp.insert(v, (cand, Some(u)));
					q.push(v, -cand);
				}
			}
		}
		None
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::geo::LatLon;

	fn line(distance_km: f64, speed: f64) -> EdgeAttrs {
		EdgeAttrs {
			distance_km,
			road_type: crate::model::RoadType::Primary,
			base_speed_kmh: speed,
			travel_time_hours: distance_km / speed,
			visibility: 0.0,
			detection_base: 0.1,
			killzone_penalty: 1.0,
			geometry: None,
		}
	}

	fn graph_s3() -> AttributedGraph {
		// 0 -> 1 -> 2 -> 3 chain plus a shortcut 0 -> 2, per spec scenario S3.
		let mut g = AttributedGraph::new();
		for id in 0..4u64 {
			g.add_node(Node { id, position: LatLon::new(0.0, id as f64), role: None });
		}
		g.put_edge(0, 1, line(5.0, 50.0));
		g.put_edge(1, 2, line(6.0, 50.0));
		g.put_edge(2, 3, line(4.0, 50.0));
		g.put_edge(0, 2, line(12.0, 48.0));
		g
	}

	#[test]
	fn shortest_distance_and_time_coincide_on_s3() {
		let g = graph_s3();
		let (path_d, dist) = g.shortest_path(0, 3, |e| e.attrs.distance_km).unwrap();
		assert_eq!(path_d, vec![0, 1, 2, 3]);
		assert!((dist - 15.0).abs() < 1e-9);

		let (path_t, time) = g.shortest_path(0, 3, |e| e.attrs.travel_time_hours).unwrap();
		assert_eq!(path_t, vec![0, 1, 2, 3]);
		assert!((time - 0.30).abs() < 1e-6);
	}

	#[test]
	fn unreachable_goal_returns_none() {
		let mut g = AttributedGraph::new();
		g.add_node(Node { id: 0, position: LatLon::new(0.0, 0.0), role: None });
		g.add_node(Node { id: 1, position: LatLon::new(0.0, 1.0), role: None });
		assert!(g.shortest_path(0, 1, |e| e.attrs.distance_km).is_none());
	}
}
