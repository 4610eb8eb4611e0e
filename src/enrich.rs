//! `GraphEnricher` — turns a raw directed road graph into a single-edge-
//! per-direction `AttributedGraph`, attaches synthetic depot/frontline nodes,
//! and stamps mission-specific attributes onto every edge.

use std::collections::HashMap;

use log::{info, warn};

use crate::geo::{Bounds, LatLon};
use crate::graph::AttributedGraph;
use crate::model::{EdgeAttrs, KillZone, Node, NodeId, NodeRole, RoadType, Weather};
use crate::perception::{ElevationRaster, SpeedTable, ThreatPredictor, Viewshed};

/// A raw node as delivered by the upstream OSM-road-fetch collaborator.
#[derive(Clone, Copy, Debug)]
pub struct RawNode {
	pub id: u64,
	pub lat: f64,
	pub lon: f64,
}

/// A raw, possibly-parallel directed edge.
#[derive(Clone, Debug)]
pub struct RawEdge {
	pub from: u64,
	pub to: u64,
	pub highway: String,
	pub length_m: f64,
	pub geometry: Option<Vec<(f64, f64)>>,
}

/// Mission context an edge is enriched against: weather, time of day, and
/// cargo priority feed the threat model; kill zones feed the penalty.
#[derive(Clone, Copy, Debug)]
pub struct MissionContext<'a> {
	pub weather: Weather,
	pub timestamp_unix_s: i64,
	pub kill_zones: &'a [KillZone],
}

pub struct GraphEnricher<'a> {
	viewshed: &'a dyn Viewshed,
	threat: &'a dyn ThreatPredictor,
	elevation: Option<&'a ElevationRaster>,
	speed_table: SpeedTable,
}

impl<'a> GraphEnricher<'a> {
	pub fn new(viewshed: &'a dyn Viewshed, threat: &'a dyn ThreatPredictor, elevation: Option<&'a ElevationRaster>) -> Self {
		GraphEnricher { viewshed, threat, elevation, speed_table: SpeedTable }
	}

	/// Simplifies the raw multigraph to one edge per ordered pair (prefer
	/// geometry, then minimum length), builds nodes, and enriches every edge
	/// for the given mission context. Depots/frontline points are attached
	/// afterward via [`GraphEnricher::attach_synthetic`].
	pub fn build(&self, raw_nodes: &[RawNode], raw_edges: &[RawEdge], ctx: MissionContext) -> AttributedGraph {
		let mut graph = AttributedGraph::new();
		for n in raw_nodes {
			graph.add_node(Node { id: n.id, position: LatLon::new(n.lat, n.lon), role: Some(NodeRole::Road) });
		}

		let mut chosen: HashMap<(u64, u64), &RawEdge> = HashMap::new();
		for e in raw_edges {
			let key = (e.from, e.to);
			match chosen.get(&key) {
				None => {
					chosen.insert(key, e);
				}
				Some(existing) => {
					let better = match (e.geometry.is_some(), existing.geometry.is_some()) {
						(true, false) => true,
						(false, true) => false,
						_ => e.length_m < existing.length_m,
					};
					if better {
						chosen.insert(key, e);
					}
				}
			}
		}

		for ((from, to), raw) in chosen {
			if let (Some(a), Some(b)) = (graph.node(from), graph.node(to)) {
				let attrs = self.enrich_edge(a.position, b.position, raw, ctx);
				graph.put_edge(from, to, attrs);
			}
		}

		info!("graph enrichment complete: {} nodes, {} edges", graph.node_count(), graph.edge_count());
		graph
	}

	fn enrich_edge(&self, from: LatLon, to: LatLon, raw: &RawEdge, ctx: MissionContext) -> EdgeAttrs {
		let midpoint = from.midpoint(&to);
		let distance_km = from.haversine_km(&to);
		let road_type = RoadType::from_highway_tag(&raw.highway);

		let mut base_speed_kmh = self.speed_table.base_speed_kmh(road_type, ctx.weather);
		if let Some(raster) = self.elevation {
			if let Some(slope) = raster.slope_pct(from, to) {
				base_speed_kmh *= self.speed_table.slope_factor(slope);
			}
		}
		if base_speed_kmh <= 0.0 {
			base_speed_kmh = 0.0;
		}

		let visibility = self.viewshed.visibility_at(midpoint);
		let detection_base = self.threat.risk_at(midpoint, ctx.timestamp_unix_s, road_type, ctx.weather).clamp(0.0, 1.0);
		let killzone_penalty = killzone_penalty(midpoint, ctx.kill_zones);

		let travel_time_hours = if base_speed_kmh > 0.0 { distance_km / base_speed_kmh } else { 999.0 };

		EdgeAttrs {
			distance_km,
			road_type,
			base_speed_kmh,
			travel_time_hours,
			visibility,
			detection_base,
			killzone_penalty,
			geometry: raw.geometry.as_ref().map(|pts| pts.iter().map(|&(lat, lon)| LatLon::new(lat, lon)).collect()),
		}
	}

	/// Attaches a synthetic depot or frontline point to its nearest existing
	/// road node via two antiparallel edges with the fixed attributes from
	/// the data model. Skips (with a `warn!`) points outside the raster
	/// bounds when bounds are supplied, per the `BoundsViolation` policy.
	pub fn attach_synthetic(&self, graph: &mut AttributedGraph, position: LatLon, role: NodeRole, bounds: Option<Bounds>) -> Option<NodeId> {
		if let Some(b) = bounds {
			if position.lat > b.north || position.lat < b.south || position.lon > b.east || position.lon < b.west {
				warn!("synthetic {:?} point {:?} outside raster bounds, skipping", role, position);
				return None;
			}
		}
		let nearest = graph.nearest_node(position)?;
		let nearest_pos = graph.node(nearest)?.position;
		let distance_km = position.haversine_km(&nearest_pos);

		let id = graph.allocate_node_id();
		graph.add_node(Node { id, position, role: Some(role) });

		let (out_attrs, in_attrs) = match role {
			NodeRole::Depot => (EdgeAttrs::depot_link(distance_km), EdgeAttrs::depot_link(distance_km)),
			NodeRole::Frontline => (EdgeAttrs::frontline_link(distance_km), EdgeAttrs::frontline_link(distance_km)),
			NodeRole::Road => (EdgeAttrs::depot_link(distance_km), EdgeAttrs::depot_link(distance_km)),
		};
		graph.put_edge(id, nearest, out_attrs);
		graph.put_edge(nearest, id, in_attrs);
		Some(id)
	}

	/// Synthesizes a 7x7 grid graph (primary on the central row/column,
	/// secondary elsewhere) covering `bounds`, used when raw graph
	/// acquisition fails. Not fatal — reported via `warn!`.
	pub fn synthetic_grid(&self, bounds: Bounds, grid_size: usize, ctx: MissionContext) -> AttributedGraph {
		warn!("raw graph acquisition failed, synthesizing a {}x{} grid", grid_size, grid_size);
		let mut graph = AttributedGraph::new();
		let center = grid_size / 2;
		let lat_step = (bounds.north - bounds.south) / (grid_size as f64 - 1.0).max(1.0);
		let lon_step = (bounds.east - bounds.west) / (grid_size as f64 - 1.0).max(1.0);

		let id_of = |row: usize, col: usize| -> u64 { (row * grid_size + col) as u64 };
		for row in 0..grid_size {
			for col in 0..grid_size {
				let pos = LatLon::new(bounds.north - lat_step * row as f64, bounds.west + lon_step * col as f64);
				graph.add_node(Node { id: id_of(row, col), position: pos, role: Some(NodeRole::Road) });
			}
		}

		let mut link = |graph: &mut AttributedGraph, r1: usize, c1: usize, r2: usize, c2: usize| {
			let highway = if r1 == center || c1 == center { "primary" } else { "secondary" };
			let a = graph.node(id_of(r1, c1)).unwrap().position;
			let b = graph.node(id_of(r2, c2)).unwrap().position;
			let raw = RawEdge { from: id_of(r1, c1), to: id_of(r2, c2), highway: highway.to_string(), length_m: a.haversine_km(&b) * 1000.0, geometry: None };
			let attrs = self.enrich_edge(a, b, &raw, ctx);
			graph.put_edge(id_of(r1, c1), id_of(r2, c2), attrs.clone());
			let raw_back = RawEdge { from: id_of(r2, c2), to: id_of(r1, c1), highway: highway.to_string(), length_m: raw.length_m, geometry: None };
			let attrs_back = self.enrich_edge(b, a, &raw_back, ctx);
			graph.put_edge(id_of(r2, c2), id_of(r1, c1), attrs_back);
		};

		for row in 0..grid_size {
			for col in 0..grid_size {
				if col + 1 < grid_size {
					link(&mut graph, row, col, row, col + 1);
				}
				if row + 1 < grid_size {
					link(&mut graph, row, col, row + 1, col);
				}
			}
		}
		graph
	}
}

/// Piecewise distance-to-killzone penalty, maximized over every kill zone
/// (spec.md §4.1). Bands: `<r -> 1000`, `[r,1.5r) -> 50..~1000` exponential
/// ramp, `[1.5r,2r) -> 10`, `>=2r -> 1`.
pub fn killzone_penalty(pos: LatLon, zones: &[KillZone]) -> f64 {
	let mut penalty = 1.0_f64;
	for zone in zones {
		let d = pos.haversine_km(&zone.center);
		let r = zone.radius_km;
		if r <= 0.0 {
			continue;
		}
		let p = if d < r {
			1000.0
		} else if d < 1.5 * r {
			50.0 * (3.0 * (1.0 - (d - r) / (0.5 * r))).exp()
		} else if d < 2.0 * r {
			10.0
		} else {
			1.0
		};
		penalty = penalty.max(p);
	}
	penalty
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::perception::NoViewshed;

	struct ZeroThreat;
	impl ThreatPredictor for ZeroThreat {
		fn risk_at(&self, _pos: LatLon, _ts: i64, _rt: RoadType, _w: Weather) -> f64 {
			0.1
		}
	}

	fn ctx(zones: &[KillZone]) -> MissionContext {
		MissionContext { weather: Weather::Clear, timestamp_unix_s: 1_700_000_000, kill_zones: zones }
	}

	#[test]
	fn killzone_penalty_is_monotone_and_capped_at_the_core() {
		let zone = KillZone { id: 1, center: LatLon::new(0.0, 0.0), radius_km: 2.0, num_incidents: 5, avg_casualties: 1.0 };
		let inside = killzone_penalty(LatLon::new(0.0, 0.0001), &[zone]);
		let near = killzone_penalty(LatLon::new(0.0, 0.03), &[zone]);
		let mid = killzone_penalty(LatLon::new(0.0, 0.06), &[zone]);
		let far = killzone_penalty(LatLon::new(1.0, 1.0), &[zone]);
		assert_eq!(inside, 1000.0);
		assert!(near > mid);
		assert!(mid >= 1.0);
		assert_eq!(far, 1.0);
	}

	#[test]
	fn simplification_prefers_geometry_then_min_length() {
		let viewshed = NoViewshed;
		let threat = ZeroThreat;
		let enricher = GraphEnricher::new(&viewshed, &threat, None);
		let nodes = vec![RawNode { id: 0, lat: 0.0, lon: 0.0 }, RawNode { id: 1, lat: 0.0, lon: 0.1 }];
		let edges = vec![
			RawEdge { from: 0, to: 1, highway: "primary".into(), length_m: 5000.0, geometry: None },
			RawEdge { from: 0, to: 1, highway: "secondary".into(), length_m: 12000.0, geometry: Some(vec![(0.0, 0.0), (0.0, 0.1)]) },
		];
		let graph = enricher.build(&nodes, &edges, ctx(&[]));
		let e = graph.edge(0, 1).unwrap();
		assert!(e.attrs.geometry.is_some(), "edge with geometry should win over shorter edge without it");
	}

	#[test]
	fn depot_attachment_creates_antiparallel_edges() {
		let viewshed = NoViewshed;
		let threat = ZeroThreat;
		let enricher = GraphEnricher::new(&viewshed, &threat, None);
		let nodes = vec![RawNode { id: 0, lat: 0.0, lon: 0.0 }];
		let mut graph = enricher.build(&nodes, &[], ctx(&[]));
		let depot_id = enricher.attach_synthetic(&mut graph, LatLon::new(0.01, 0.01), NodeRole::Depot, None).unwrap();
		assert!(graph.edge(depot_id, 0).is_some());
		assert!(graph.edge(0, depot_id).is_some());
		assert_eq!(graph.edge(depot_id, 0).unwrap().attrs.road_type, RoadType::Track);
	}
}
