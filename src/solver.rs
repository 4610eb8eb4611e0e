//! `RouteSolver` — four routing modes over a fixed `AttributedGraph`:
//! `shortest_distance`, `shortest_time`, `mean_risk` (all Dijkstra variants)
//! and `cvar_optimize` (mixed-integer program, Dijkstra fallback).

use std::collections::HashMap;

use good_lp::{coin_cbc, constraint, variable, variables, Expression, Solution, SolverModel};
use log::{debug, info, warn};

use crate::graph::AttributedGraph;
use crate::model::{Edge, EdgeAttrs, NodeId, RouteResult, Scenario, Waypoint, DEFAULT_SURVIVAL_LAMBDA};
use crate::risk;

/// Tunables the CVaR MILP pulls from `constants.py` in the original prototype.
#[derive(Clone, Copy, Debug)]
pub struct CvarConfig {
	pub weight_time: f64,
	pub weight_risk: f64,
	pub alpha: f64,
	pub milp_time_limit_s: u32,
}

impl Default for CvarConfig {
	fn default() -> Self {
		CvarConfig { weight_time: 0.5, weight_risk: 0.5, alpha: 0.95, milp_time_limit_s: 300 }
	}
}

/// Which code path actually produced a CVaR solve's result, so callers can
/// observe degradation without string-matching `RouteResult::method`.
#[derive(Clone, Debug)]
pub enum RouteOutcome {
	CvarOptimize(RouteResult),
	FallbackShortestTime(RouteResult),
}

impl RouteOutcome {
	pub fn route(&self) -> &RouteResult {
		match self {
			RouteOutcome::CvarOptimize(r) => r,
			RouteOutcome::FallbackShortestTime(r) => r,
		}
	}

	pub fn into_route(self) -> RouteResult {
		match self {
			RouteOutcome::CvarOptimize(r) => r,
			RouteOutcome::FallbackShortestTime(r) => r,
		}
	}
}

pub struct RouteSolver<'a> {
	graph: &'a AttributedGraph,
}

impl<'a> RouteSolver<'a> {
	pub fn new(graph: &'a AttributedGraph) -> Self {
		RouteSolver { graph }
	}

	/// `scenarios` scores the returned route's `mean_risk`/`cvar_95`/`cvar_99`
	/// the same way every other method does (ground-truth
	/// `cvar_routing.py`'s routing entry points all draw from the same
	/// Monte Carlo scenario set, including the non-CVaR baselines), so the
	/// risk fields are comparable across all four routing modes.
	pub fn shortest_distance(&self, o: NodeId, d: NodeId, scenarios: &[Scenario]) -> RouteResult {
		match self.graph.shortest_path(o, d, |e| e.attrs.distance_km) {
			Some((path, _)) => self.score_path(&path, "shortest_distance", 10.0, scenarios),
			None => RouteResult::empty("shortest_distance"),
		}
	}

	pub fn shortest_time(&self, o: NodeId, d: NodeId, scenarios: &[Scenario]) -> RouteResult {
		match self.graph.shortest_path(o, d, |e| e.attrs.travel_time_hours) {
			Some((path, _)) => self.score_path(&path, "shortest_time", 10.0, scenarios),
			None => RouteResult::empty("shortest_time"),
		}
	}

	/// Expected-risk proxy: shortest path by
	/// `detection_base * cargo_value/10 * killzone_penalty`, avoiding
	/// scenario enumeration for the path *search* itself; the returned
	/// route is still scored against `scenarios` like every other method.
	pub fn mean_risk(&self, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario]) -> RouteResult {
		let weight = |e: &Edge| e.attrs.detection_base * (cargo_value / 10.0) * e.attrs.killzone_penalty;
		match self.graph.shortest_path(o, d, weight) {
			Some((path, _)) => self.score_path(&path, "mean_risk", cargo_value, scenarios),
			None => RouteResult::empty("mean_risk"),
		}
	}

	/// Penalized-time shortest path used by the Stackelberg route-portfolio
	/// builder to diversify routes without mutating the graph.
	pub(crate) fn penalized_shortest_time(&self, o: NodeId, d: NodeId, penalized: &std::collections::HashSet<(NodeId, NodeId)>, penalty: f64) -> Option<(Vec<NodeId>, f64)> {
		self.graph.shortest_path(o, d, |e: &Edge| {
			let mut w = e.attrs.travel_time_hours;
			if penalized.contains(&(e.from, e.to)) {
				w += penalty;
			}
			w
		})
	}

	/// CVaR-constrained route selection via a mixed-integer program, falling
	/// back to `shortest_time` on any solver failure, infeasibility, or
	/// failed path reconstruction.
	pub fn cvar_optimize(&self, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario], config: CvarConfig) -> RouteOutcome {
		match self.try_cvar_optimize(o, d, cargo_value, scenarios, config) {
			Some(result) => {
				info!("cvar_optimize succeeded: {} -> {}, cvar_95={:.3}", o, d, result.cvar_95);
				RouteOutcome::CvarOptimize(result)
			}
			None => {
				warn!("cvar_optimize fell back to shortest_time for {} -> {}", o, d);
				let mut fallback = self.shortest_time(o, d, scenarios);
				fallback.method = "cvar_optimize_fallback_shortest_time".to_string();
				RouteOutcome::FallbackShortestTime(fallback)
			}
		}
	}

	fn try_cvar_optimize(&self, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario], config: CvarConfig) -> Option<RouteResult> {
		if o == d || self.graph.node(o).is_none() || self.graph.node(d).is_none() {
			return None;
		}
		let edges: Vec<&Edge> = self.graph.edges().collect();
		if edges.is_empty() || scenarios.is_empty() {
			return None;
		}

		let mut vars = variables!();
		let mut x_vars: HashMap<(NodeId, NodeId), good_lp::Variable> = HashMap::new();
		for e in &edges {
			x_vars.insert((e.from, e.to), vars.add(variable().binary()));
		}
		let eta = vars.add(variable().min(0.0));
		let z_vars: Vec<good_lp::Variable> = (0..scenarios.len()).map(|_| vars.add(variable().min(0.0))).collect();

		let time_term: Expression = edges.iter().map(|e| x_vars[&(e.from, e.to)] * e.attrs.travel_time_hours).sum();
		let tail_coeff = 1.0 / (1.0 - config.alpha) / scenarios.len() as f64;
		let z_sum: Expression = z_vars.iter().map(|&z| 1.0 * z).sum();
		let objective = config.weight_time * time_term + config.weight_risk * (eta + tail_coeff * z_sum);

		let mut model = vars.minimise(objective).using(coin_cbc);
		model.set_parameter("seconds", &config.milp_time_limit_s.to_string());
		model.set_parameter("log", "0");

		for n in self.graph.nodes() {
			let outflow: Expression = self.graph.out_edges(n.id).iter().map(|e| 1.0 * x_vars[&(e.from, e.to)]).sum();
			let inflow: Expression = edges.iter().filter(|e| e.to == n.id).map(|e| 1.0 * x_vars[&(e.from, e.to)]).sum();
			let rhs = if n.id == o {
				1.0
			} else if n.id == d {
				-1.0
			} else {
				0.0
			};
			model = model.with(constraint!(outflow - inflow == rhs));
		}

		for (s_idx, scenario) in scenarios.iter().enumerate() {
			let risk_sum: Expression = edges
				.iter()
				.map(|e| x_vars[&(e.from, e.to)] * risk::edge_risk(&e.attrs, scenario, cargo_value))
				.sum();
			model = model.with(constraint!(z_vars[s_idx] >= risk_sum - eta));
		}

		let solution = model.solve().ok()?;

		let mut selected: HashMap<NodeId, NodeId> = HashMap::new();
		for e in &edges {
			if solution.value(x_vars[&(e.from, e.to)]) > 0.5 {
				selected.insert(e.from, e.to);
			}
		}

		let path = reconstruct_path(&selected, o, d, edges.len())?;
		debug!("cvar MILP selected {} edges, reconstructed path of length {}", selected.len(), path.len());
		Some(self.score_path(&path, "cvar_optimize", cargo_value, scenarios))
	}

	pub(crate) fn score_path(&self, path: &[NodeId], method: &str, cargo_value: f64, scenarios: &[Scenario]) -> RouteResult {
		if path.is_empty() {
			return RouteResult::empty(method);
		}
		let edges: Vec<&Edge> = path.windows(2).filter_map(|w| self.graph.edge(w[0], w[1])).collect();
		if edges.len() != path.len() - 1 {
			return RouteResult::empty(method);
		}
		let attrs: Vec<&EdgeAttrs> = edges.iter().map(|e| &e.attrs).collect();

		let distance_km: f64 = attrs.iter().map(|a| a.distance_km).sum();
		let time_hours: f64 = attrs.iter().map(|a| a.travel_time_hours).sum();

		let mean_risk_value = risk::mean_path_risk(&attrs, scenarios, cargo_value);
		let risks: Vec<f64> = scenarios.iter().map(|s| risk::path_risk(attrs.iter().copied(), s, cargo_value)).collect();
		let cvar_95 = risk::cvar(&risks, 0.95);
		let cvar_99 = risk::cvar(&risks, 0.99);

		RouteResult {
			method: method.to_string(),
			node_path: path.to_vec(),
			coordinate_path: assemble_coordinates(self.graph, path),
			time_minutes: time_hours * 60.0,
			distance_km,
			mean_risk: mean_risk_value,
			cvar_95,
			cvar_99,
			waypoints: build_waypoints(self.graph, path),
			survival_probability: crate::model::survival_probability(cvar_95, DEFAULT_SURVIVAL_LAMBDA),
		}
	}
}

/// Walks `u -> v` from `o`, bounded by the total edge count, rejecting if the
/// walk does not terminate at `d` (spec.md §4.4's reconstruction rule).
fn reconstruct_path(selected: &HashMap<NodeId, NodeId>, o: NodeId, d: NodeId, max_steps: usize) -> Option<Vec<NodeId>> {
	let mut path = vec![o];
	let mut current = o;
	for _ in 0..=max_steps {
		if current == d {
			return Some(path);
		}
		current = *selected.get(&current)?;
		if path.contains(&current) {
			return None;
		}
		path.push(current);
	}
	None
}

fn assemble_coordinates(graph: &AttributedGraph, path: &[NodeId]) -> Vec<crate::geo::LatLon> {
	let mut coords: Vec<crate::geo::LatLon> = Vec::new();
	if path.len() == 1 {
		if let Some(node) = graph.node(path[0]) {
			coords.push(node.position);
		}
		return coords;
	}
	for w in path.windows(2) {
		let (u, v) = (w[0], w[1]);
		let edge = match graph.edge(u, v) {
			Some(e) => e,
			None => continue,
		};
		let segment: Vec<crate::geo::LatLon> = match &edge.attrs.geometry {
			Some(geom) if !geom.is_empty() => geom.clone(),
			_ => {
				let a = graph.node(u).map(|n| n.position);
				let b = graph.node(v).map(|n| n.position);
				match (a, b) {
					(Some(a), Some(b)) => vec![a, b],
					_ => continue,
				}
			}
		};
		if coords.is_empty() {
			coords.extend(segment);
		} else {
			coords.extend(segment.into_iter().skip(1));
		}
	}
	coords
}

/// Indices of the first, last, and every `max(1, floor(len/10))`-th node.
fn waypoint_indices(len: usize) -> Vec<usize> {
	if len == 0 {
		return Vec::new();
	}
	let interval = (len / 10).max(1);
	let mut idx: Vec<usize> = (0..len).step_by(interval).collect();
	if *idx.last().unwrap() != len - 1 {
		idx.push(len - 1);
	}
	idx
}

fn build_waypoints(graph: &AttributedGraph, path: &[NodeId]) -> Vec<Waypoint> {
	if path.is_empty() {
		return Vec::new();
	}
	let mut cumulative_hours = vec![0.0; path.len()];
	for i in 1..path.len() {
		let edge_time = graph.edge(path[i - 1], path[i]).map(|e| e.attrs.travel_time_hours).unwrap_or(0.0);
		cumulative_hours[i] = cumulative_hours[i - 1] + edge_time;
	}
	waypoint_indices(path.len())
		.into_iter()
		.filter_map(|i| {
			let node = graph.node(path[i])?;
			Some(Waypoint { position: node.position, name: format!("node_{}", path[i]), eta_hours: cumulative_hours[i], instructions: String::new() })
		})
		.collect()
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::geo::LatLon;
	use crate::graph::AttributedGraph;
	use crate::model::{Node, RoadType};

	fn line(distance_km: f64, speed: f64) -> EdgeAttrs {
		EdgeAttrs {
			distance_km,
			road_type: RoadType::Primary,
			base_speed_kmh: speed,
			travel_time_hours: distance_km / speed,
			visibility: 0.0,
			detection_base: 0.1,
			killzone_penalty: 1.0,
			geometry: None,
		}
	}

	// S3: 0->1->2->3 chain plus a slower 0->2 shortcut.
	fn graph_s3() -> AttributedGraph {
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
	fn s3_shortest_distance_and_time_coincide() {
		let g = graph_s3();
		let solver = RouteSolver::new(&g);
		let dist_route = solver.shortest_distance(0, 3, &[]);
		let time_route = solver.shortest_time(0, 3, &[]);
		assert_eq!(dist_route.node_path, vec![0, 1, 2, 3]);
		assert_eq!(time_route.node_path, vec![0, 1, 2, 3]);
		assert!((dist_route.distance_km - 15.0).abs() < 1e-9);
		assert!((time_route.time_minutes - 18.0).abs() < 1e-6);
	}

	#[test]
	fn no_path_returns_empty_method_tagged_result() {
		let mut g = AttributedGraph::new();
		g.add_node(Node { id: 0, position: LatLon::new(0.0, 0.0), role: None });
		g.add_node(Node { id: 1, position: LatLon::new(0.0, 1.0), role: None });
		let solver = RouteSolver::new(&g);
		let r = solver.shortest_time(0, 1, &[]);
		assert!(r.is_empty());
		assert_eq!(r.method, "shortest_time");
	}

	#[test]
	fn waypoints_always_include_first_and_last() {
		let g = graph_s3();
		let solver = RouteSolver::new(&g);
		let r = solver.shortest_distance(0, 3, &[]);
		assert_eq!(r.waypoints.first().unwrap().position, g.node(0).unwrap().position);
		assert_eq!(r.waypoints.last().unwrap().position, g.node(3).unwrap().position);
	}
}
