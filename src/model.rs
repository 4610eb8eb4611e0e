//! Core data types for the risk-aware routing engine.
//!
//! Following the re-architecture in the design notes: edges carry a fixed
//! `EdgeAttrs` record rather than a dynamic attribute bag, so the solver's
//! data dependencies are explicit and typo-proof.

use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

pub type NodeId = u64;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RoadType {
	Primary,
	Secondary,
	Tertiary,
	Track,
	Path,
	Offroad,
}

impl RoadType {
	/// Classifies a raw OSM-style `highway` tag per the documented mapping.
	pub fn from_highway_tag(tag: &str) -> RoadType {
		match tag {
			"motorway" | "trunk" | "primary" => RoadType::Primary,
			"secondary" => RoadType::Secondary,
			"tertiary" | "unclassified" | "residential" => RoadType::Tertiary,
			"track" | "service" => RoadType::Track,
			"path" | "footway" | "cycleway" => RoadType::Path,
			_ => RoadType::Track,
		}
	}
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Weather {
	Clear,
	Fog,
	Rain,
	Snow,
	/// Seasonal deep-mud condition: paved roads slower, off-road nearly impassable.
	Rasputitsa,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum NodeRole {
	Road,
	Depot,
	Frontline,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Node {
	pub id: NodeId,
	pub position: LatLon,
	pub role: Option<NodeRole>,
}

/// Fixed per-edge attribute record (replaces a dynamic `highway`/`length` bag
/// once the raw graph has passed through `GraphEnricher`).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EdgeAttrs {
	pub distance_km: f64,
	pub road_type: RoadType,
	pub base_speed_kmh: f64,
	pub travel_time_hours: f64,
	pub visibility: f64,
	pub detection_base: f64,
	pub killzone_penalty: f64,
	/// Ordered coordinates along the edge; absent means a straight segment
	/// between the endpoints.
	pub geometry: Option<Vec<LatLon>>,
}

impl EdgeAttrs {
	/// Fixed attributes for a synthetic depot-attachment edge.
	pub fn depot_link(distance_km: f64) -> EdgeAttrs {
		EdgeAttrs {
			distance_km,
			road_type: RoadType::Track,
			base_speed_kmh: 30.0,
			travel_time_hours: distance_km / 30.0,
			visibility: 0.0,
			detection_base: 0.2,
			killzone_penalty: 1.0,
			geometry: None,
		}
	}

	/// Fixed attributes for a synthetic frontline-attachment edge.
	pub fn frontline_link(distance_km: f64) -> EdgeAttrs {
		EdgeAttrs {
			distance_km,
			road_type: RoadType::Path,
			base_speed_kmh: 20.0,
			travel_time_hours: distance_km / 20.0,
			visibility: 0.0,
			detection_base: 0.15,
			killzone_penalty: 1.0,
			geometry: None,
		}
	}
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Edge {
	pub from: NodeId,
	pub to: NodeId,
	pub attrs: EdgeAttrs,
}

/// A disk centered on a historical incident cluster.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct KillZone {
	pub id: u64,
	pub center: LatLon,
	pub radius_km: f64,
	pub num_incidents: u32,
	pub avg_casualties: f64,
}

/// A single risk-multiplier scenario, sampled uniformly by `ScenarioSampler`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Scenario {
	pub visibility_mult: f64,
	pub detection_mult: f64,
	pub patrol_presence: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Waypoint {
	pub position: LatLon,
	pub name: String,
	pub eta_hours: f64,
	pub instructions: String,
}

/// Result of a single route computation, fully scored.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RouteResult {
	pub method: String,
	pub node_path: Vec<NodeId>,
	pub coordinate_path: Vec<LatLon>,
	pub time_minutes: f64,
	pub distance_km: f64,
	pub mean_risk: f64,
	pub cvar_95: f64,
	pub cvar_99: f64,
	pub waypoints: Vec<Waypoint>,
	pub survival_probability: f64,
}

impl RouteResult {
	/// An empty, all-zero result for the `NoPath` case (spec: method tag
	/// preserved, all numeric fields zero, never an `Err`).
	pub fn empty(method: impl Into<String>) -> RouteResult {
		RouteResult {
			method: method.into(),
			node_path: Vec::new(),
			coordinate_path: Vec::new(),
			time_minutes: 0.0,
			distance_km: 0.0,
			mean_risk: 0.0,
			cvar_95: 0.0,
			cvar_99: 0.0,
			waypoints: Vec::new(),
			survival_probability: 0.0,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.node_path.is_empty()
	}
}

/// Converts a raw cumulative risk score into a survival probability via
/// exponential decay. `lambda` is a configurable calibration constant (the
/// spec treats 0.1 as the documented default, not traceable to real data).
pub fn survival_probability(cvar_95: f64, lambda: f64) -> f64 {
	(-lambda * cvar_95).exp()
}

pub const DEFAULT_SURVIVAL_LAMBDA: f64 = 0.1;
