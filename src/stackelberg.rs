//! `StackelbergSolver` — builds a diverse route portfolio, samples defender
//! patrol configurations, and solves the resulting zero-sum game for the
//! attacker's maximin mixed strategy.
//!
//! The equilibrium is computed by solving the maximin linear program
//! directly rather than enumerating bimatrix support equilibria: for a
//! zero-sum game the attacker's maximin strategy already is a Nash
//! equilibrium strategy, so one small LP gives the same guarantee `good_lp`
//! (already a dependency for the CVaR router) can solve directly.

use std::collections::HashSet;

use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::LatLon;
use crate::model::{NodeId, RouteResult, Scenario};
use crate::solver::{CvarConfig, RouteSolver};

#[derive(Clone, Copy, Debug)]
pub struct StackelbergConfig {
	/// Target route portfolio size K.
	pub k: usize,
	pub min_patrols: usize,
	pub max_patrols: usize,
	/// Number of sampled defender configurations M.
	pub num_defender_configs: usize,
	pub patrol_radius_km: f64,
	/// Per-edge time penalty used while padding the portfolio past the four
	/// baseline routes.
	pub padding_penalty: f64,
}

impl Default for StackelbergConfig {
	fn default() -> Self {
		StackelbergConfig { k: 4, min_patrols: 2, max_patrols: 5, num_defender_configs: 10, patrol_radius_km: 3.0, padding_penalty: 100.0 }
	}
}

#[derive(Clone, Debug)]
pub struct DefenderConfig {
	pub patrol_points: Vec<LatLon>,
	pub effectiveness: f64,
}

/// Result of a Stackelberg solve, discriminating the three outcomes
/// spec.md §9 names instead of raising an exception for the degenerate cases.
#[derive(Clone, Debug)]
pub enum StackelbergOutcome {
	Unique { routes: Vec<RouteResult>, strategy: Vec<f64> },
	Degenerate { route: RouteResult },
	UniformFallback { routes: Vec<RouteResult>, strategy: Vec<f64> },
}

impl StackelbergOutcome {
	pub fn routes(&self) -> Vec<&RouteResult> {
		match self {
			StackelbergOutcome::Unique { routes, .. } | StackelbergOutcome::UniformFallback { routes, .. } => routes.iter().collect(),
			StackelbergOutcome::Degenerate { route } => vec![route],
		}
	}

	pub fn strategy(&self) -> Vec<f64> {
		match self {
			StackelbergOutcome::Unique { strategy, .. } | StackelbergOutcome::UniformFallback { strategy, .. } => strategy.clone(),
			StackelbergOutcome::Degenerate { .. } => vec![1.0],
		}
	}
}

pub struct StackelbergSolver {
	rng: StdRng,
	config: StackelbergConfig,
}

impl StackelbergSolver {
	pub fn new(seed: u64, config: StackelbergConfig) -> Self {
		StackelbergSolver { rng: StdRng::seed_from_u64(seed), config }
	}

	pub fn solve(&mut self, solver: &RouteSolver, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario], cvar_config: CvarConfig) -> StackelbergOutcome {
		let routes = build_portfolio(solver, o, d, cargo_value, scenarios, cvar_config, self.config.k, self.config.padding_penalty);

		if routes.is_empty() {
			return StackelbergOutcome::UniformFallback { routes: Vec::new(), strategy: Vec::new() };
		}
		if routes.len() == 1 {
			return StackelbergOutcome::Degenerate { route: routes.into_iter().next().unwrap() };
		}

		let defender_configs = self.sample_defender_configs(&routes);
		let payoff = build_payoff_matrix(&routes, &defender_configs, self.config.patrol_radius_km);

		// A uniform payoff matrix has every mixed strategy as an optimum; an
		// LP vertex solution would pick an arbitrary corner, not the uniform
		// distribution the documented fallback promises, so short-circuit.
		if is_uniform(&payoff) {
			let strategy = vec![1.0 / routes.len() as f64; routes.len()];
			info!("stackelberg payoff matrix is uniform, returning the uniform-fallback strategy");
			return StackelbergOutcome::UniformFallback { routes, strategy };
		}

		match solve_zero_sum(&payoff) {
			Some(strategy) => {
				info!("stackelberg equilibrium computed over {} routes, {} defender configs", routes.len(), defender_configs.len());
				StackelbergOutcome::Unique { routes, strategy }
			}
			None => {
				let strategy = vec![1.0 / routes.len() as f64; routes.len()];
				StackelbergOutcome::UniformFallback { routes, strategy }
			}
		}
	}

	fn sample_defender_configs(&mut self, routes: &[RouteResult]) -> Vec<DefenderConfig> {
		let pool: Vec<LatLon> = routes.iter().flat_map(|r| r.waypoints.iter().map(|w| w.position)).collect();
		(0..self.config.num_defender_configs)
			.map(|_| {
				let num_patrols = self.rng.gen_range(self.config.min_patrols..=self.config.max_patrols);
				let patrol_points = (0..num_patrols)
					.map(|_| if pool.is_empty() { LatLon::new(0.0, 0.0) } else { pool[self.rng.gen_range(0..pool.len())] })
					.collect();
				let effectiveness = self.rng.gen_range(0.7..=1.0);
				DefenderConfig { patrol_points, effectiveness }
			})
			.collect()
	}
}

/// Starts from the four baseline solver outputs (deduplicated by node path),
/// then pads to `k` by penalizing every edge used in the portfolio so far
/// and re-solving shortest-time — a stateless weight closure, not a
/// mutate-then-revert scoped block, since nothing on the graph is mutated.
fn build_portfolio(solver: &RouteSolver, o: NodeId, d: NodeId, cargo_value: f64, scenarios: &[Scenario], cvar_config: CvarConfig, k: usize, padding_penalty: f64) -> Vec<RouteResult> {
	let mut routes: Vec<RouteResult> = Vec::new();
	let mut push_if_new = |routes: &mut Vec<RouteResult>, r: RouteResult| {
		if !r.is_empty() && !routes.iter().any(|existing| existing.node_path == r.node_path) {
			routes.push(r);
		}
	};

	push_if_new(&mut routes, solver.cvar_optimize(o, d, cargo_value, scenarios, cvar_config).into_route());
	push_if_new(&mut routes, solver.shortest_time(o, d, scenarios));
	push_if_new(&mut routes, solver.shortest_distance(o, d, scenarios));
	push_if_new(&mut routes, solver.mean_risk(o, d, cargo_value, scenarios));

	while routes.len() < k {
		let penalized: HashSet<(NodeId, NodeId)> = routes.iter().flat_map(|r| r.node_path.windows(2).map(|w| (w[0], w[1]))).collect();
		match solver.penalized_shortest_time(o, d, &penalized, padding_penalty) {
			Some((path, _)) => {
				let candidate = solver.score_path(&path, "stackelberg_portfolio_padding", cargo_value, scenarios);
				if routes.iter().any(|r| r.node_path == candidate.node_path) {
					break;
				}
				routes.push(candidate);
			}
			None => break,
		}
	}
	routes
}

fn interception_prob(route: &RouteResult, config: &DefenderConfig, patrol_radius_km: f64) -> f64 {
	let exposure: f64 = config
		.patrol_points
		.iter()
		.map(|patrol| {
			let min_distance = route.coordinate_path.iter().map(|c| c.haversine_km(patrol)).fold(f64::INFINITY, f64::min);
			if min_distance <= patrol_radius_km {
				config.effectiveness * (1.0 - min_distance / patrol_radius_km)
			} else {
				0.0
			}
		})
		.sum();
	(route.mean_risk + 0.3 * exposure).min(1.0)
}

fn build_payoff_matrix(routes: &[RouteResult], configs: &[DefenderConfig], patrol_radius_km: f64) -> Vec<Vec<f64>> {
	routes.iter().map(|r| configs.iter().map(|c| -interception_prob(r, c, patrol_radius_km)).collect()).collect()
}

fn is_uniform(payoff: &[Vec<f64>]) -> bool {
	let first = match payoff.first().and_then(|row| row.first()) {
		Some(v) => *v,
		None => return true,
	};
	payoff.iter().all(|row| row.iter().all(|v| (v - first).abs() < 1e-9))
}

/// Solves the attacker's maximin LP: maximize `v` subject to
/// `sum_i p_i * payoff[i][j] >= v` for every defender config `j`, and `p`
/// a probability vector. The solution `p` is a Nash equilibrium strategy
/// for this zero-sum game.
fn solve_zero_sum(payoff: &[Vec<f64>]) -> Option<Vec<f64>> {
	let k = payoff.len();
	let m = payoff.first()?.len();
	if k == 0 || m == 0 {
		return None;
	}

	let mut vars = variables!();
	let p: Vec<good_lp::Variable> = (0..k).map(|_| vars.add(variable().min(0.0))).collect();
	let v = vars.add(variable().free());

	let mut model = vars.maximise(v).using(good_lp::coin_cbc);
	model.set_parameter("log", "0");

	for j in 0..m {
		let expr: Expression = (0..k).map(|i| p[i] * payoff[i][j]).sum();
		model = model.with(constraint!(expr - v >= 0.0));
	}
	let sum_p: Expression = p.iter().map(|&pi| 1.0 * pi).sum();
	model = model.with(constraint!(sum_p == 1.0));

	let solution = model.solve().ok()?;
	let raw: Vec<f64> = p.iter().map(|&pi| solution.value(pi).max(0.0)).collect();
	let total: f64 = raw.iter().sum();
	if total <= 1e-9 {
		return None;
	}
	Some(raw.iter().map(|x| x / total).collect())
}
