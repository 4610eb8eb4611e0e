//! `ParetoFront` — sweeps the time/risk weight simplex and filters the
//! resulting CVaR solves down to the non-dominated set.

use std::fmt;

use itertools::{Itertools, MinMaxResult};
use log::info;

use crate::model::{NodeId, RouteResult, Scenario};
use crate::solver::{CvarConfig, RouteSolver};

#[derive(Clone, Copy, Debug)]
pub struct ParetoConfig {
	/// Number of equally spaced weight points swept, from all-time to
	/// all-risk (spec default 5).
	pub num_points: usize,
	pub alpha: f64,
	pub milp_time_limit_s: u32,
}

impl Default for ParetoConfig {
	fn default() -> Self {
		ParetoConfig { num_points: 5, alpha: 0.95, milp_time_limit_s: 300 }
	}
}

#[derive(Debug)]
pub enum RoutingError {
	EmptyParetoFront,
	EmptyGraph,
}

impl fmt::Display for RoutingError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RoutingError::EmptyParetoFront => write!(f, "pareto front has no input points to evaluate"),
			RoutingError::EmptyGraph => write!(f, "graph has no nodes"),
		}
	}
}

impl std::error::Error for RoutingError {}

pub struct ParetoFront;

impl ParetoFront {
	/// Sweeps `config.num_points` equally spaced `(weight_time, weight_risk)`
	/// pairs through `cvar_optimize`, then filters to the non-dominated set
	/// in the `(time_minutes, cvar_95)` plane.
	pub fn generate(solver: &RouteSolver, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario], config: ParetoConfig) -> Result<Vec<RouteResult>, RoutingError> {
		if config.num_points == 0 {
			return Err(RoutingError::EmptyParetoFront);
		}
		let cvar_config_for = |weight_time: f64| CvarConfig { weight_time, weight_risk: 1.0 - weight_time, alpha: config.alpha, milp_time_limit_s: config.milp_time_limit_s };

		let points: Vec<RouteResult> = (0..config.num_points)
			.map(|i| {
				let weight_time = if config.num_points == 1 { 1.0 } else { 1.0 - i as f64 / (config.num_points - 1) as f64 };
				solver.cvar_optimize(o, d, cargo_value, scenarios, cvar_config_for(weight_time)).into_route()
			})
			.filter(|r| !r.is_empty())
			.collect();

		if points.is_empty() {
			return Err(RoutingError::EmptyParetoFront);
		}

		let front = non_dominated(points);
		info!("pareto front generated: {} non-dominated points", front.len());
		Ok(front)
	}

	/// Min-normalizes both axes and picks `argmin(urgency*t_hat + risk_aversion*r_hat)`.
	pub fn recommend<'a>(front: &'a [RouteResult], urgency: f64, risk_aversion: f64) -> Option<&'a RouteResult> {
		if front.is_empty() {
			return None;
		}
		let (min_time, max_time) = minmax_f64(front.iter().map(|r| r.time_minutes));
		let (min_risk, max_risk) = minmax_f64(front.iter().map(|r| r.cvar_95));
		let time_span = (max_time - min_time).max(1e-9);
		let risk_span = (max_risk - min_risk).max(1e-9);

		front.iter().min_by(|a, b| {
			let score_a = urgency * (a.time_minutes - min_time) / time_span + risk_aversion * (a.cvar_95 - min_risk) / risk_span;
			let score_b = urgency * (b.time_minutes - min_time) / time_span + risk_aversion * (b.cvar_95 - min_risk) / risk_span;
			score_a.partial_cmp(&score_b).unwrap()
		})
	}
}

/// Filters to the non-dominated set in `(time_minutes, cvar_95)`: `a`
/// dominates `b` iff `a <= b` componentwise and strictly less in one.
fn non_dominated(points: Vec<RouteResult>) -> Vec<RouteResult> {
	let mut kept = Vec::with_capacity(points.len());
	for (i, candidate) in points.iter().enumerate() {
		let dominated = points.iter().enumerate().any(|(j, other)| i != j && dominates(other, candidate));
		if !dominated {
			kept.push(candidate.clone());
		}
	}
	kept
}

fn dominates(a: &RouteResult, b: &RouteResult) -> bool {
	let le = a.time_minutes <= b.time_minutes && a.cvar_95 <= b.cvar_95;
	let lt = a.time_minutes < b.time_minutes || a.cvar_95 < b.cvar_95;
	le && lt
}

/// Min/max of an `f64` iterator via `Itertools::minmax`, collapsing the
/// single-element and empty cases to `(v, v)` / `(0.0, 0.0)`.
fn minmax_f64(iter: impl Iterator<Item = f64>) -> (f64, f64) {
	match iter.minmax() {
		MinMaxResult::NoElements => (0.0, 0.0),
		MinMaxResult::OneElement(v) => (v, v),
		MinMaxResult::MinMax(lo, hi) => (lo, hi),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn route(time: f64, cvar: f64) -> RouteResult {
		RouteResult {
			method: "test".into(),
			node_path: vec![0, 1],
			coordinate_path: vec![],
			time_minutes: time,
			distance_km: 0.0,
			mean_risk: 0.0,
			cvar_95: cvar,
			cvar_99: cvar,
			waypoints: vec![],
			survival_probability: 0.0,
		}
	}

	#[test]
	fn filters_dominated_points() {
		let points = vec![route(10.0, 5.0), route(20.0, 1.0), route(15.0, 10.0)];
		let front = non_dominated(points);
		// (15.0, 10.0) is dominated by (10.0, 5.0) on both axes.
		assert_eq!(front.len(), 2);
		assert!(front.iter().all(|r| (r.time_minutes, r.cvar_95) != (15.0, 10.0)));
	}

	#[test]
	fn idempotent_on_an_already_non_dominated_set() {
		let points = vec![route(10.0, 5.0), route(20.0, 1.0)];
		let once = non_dominated(points.clone());
		let twice = non_dominated(once.clone());
		assert_eq!(once.len(), twice.len());
	}
}
