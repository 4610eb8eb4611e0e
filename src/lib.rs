//! Risk-aware ground convoy routing.
//!
//! Five leaves-first components: [`enrich::GraphEnricher`] builds the
//! attributed graph, [`scenario::ScenarioSampler`] and [`risk`] drive CVaR
//! evaluation, [`solver::RouteSolver`] exposes the four routing modes, and
//! [`pareto::ParetoFront`] / [`stackelberg::StackelbergSolver`] compose the
//! strategy layer on top.

mod enrich;
mod geo;
mod graph;
mod model;
mod pareto;
mod perception;
mod risk;
mod scenario;
mod solver;
mod stackelberg;

pub use enrich::{GraphEnricher, MissionContext, RawEdge, RawNode};
pub use geo::{Bounds, LatLon};
pub use graph::AttributedGraph;
pub use model::{
	survival_probability, Edge, EdgeAttrs, KillZone, Node, NodeId, NodeRole, RoadType, RouteResult, Scenario, Waypoint, Weather, DEFAULT_SURVIVAL_LAMBDA,
};
pub use pareto::{ParetoConfig, ParetoFront, RoutingError};
pub use perception::{ConstantThreatPredictor, ElevationRaster, GridViewshed, NoViewshed, SpeedTable, TableThreatPredictor, ThreatPredictor, Viewshed};
pub use risk::{cvar, edge_risk, mean_path_risk, path_risk, RISK_CAP};
pub use scenario::{ScenarioSampler, ScenarioSamplerConfig};
pub use solver::{CvarConfig, RouteOutcome, RouteSolver};
pub use stackelberg::{DefenderConfig, StackelbergConfig, StackelbergOutcome, StackelbergSolver};
