//! End-to-end tests for the strategy layer (`ParetoFront`, `StackelbergSolver`)
//! over small hand-built graphs, mirroring spec scenarios S5 and S6.

use convoy_router::{AttributedGraph, CvarConfig, EdgeAttrs, LatLon, Node, NodeRole, ParetoConfig, ParetoFront, RoadType, RouteSolver, ScenarioSampler, StackelbergConfig, StackelbergOutcome, StackelbergSolver};

fn edge(distance_km: f64, speed_kmh: f64, detection_base: f64, killzone_penalty: f64) -> EdgeAttrs {
	EdgeAttrs {
		distance_km,
		road_type: RoadType::Primary,
		base_speed_kmh: speed_kmh,
		travel_time_hours: distance_km / speed_kmh,
		visibility: 0.0,
		detection_base,
		killzone_penalty,
		geometry: None,
	}
}

/// A fast/risky direct route `0->1->2` and a slow/safe detour `0->3->2`,
/// separated by roughly an order of magnitude in both time and risk so the
/// Pareto sweep's extremes are unambiguous.
fn fast_risky_vs_slow_safe() -> AttributedGraph {
	let mut g = AttributedGraph::new();
	for (id, (lat, lon)) in [(0.0, 0.0), (0.0, 0.05), (0.0, 0.1), (0.3, 0.05)].into_iter().enumerate() {
		g.add_node(Node { id: id as u64, position: LatLon::new(lat, lon), role: Some(NodeRole::Road) });
	}
	g.put_edge(0, 1, edge(5.0, 100.0, 0.9, 5.0));
	g.put_edge(1, 2, edge(5.0, 100.0, 0.9, 5.0));
	g.put_edge(0, 3, edge(20.0, 40.0, 0.05, 1.0));
	g.put_edge(3, 2, edge(20.0, 40.0, 0.05, 1.0));
	g
}

#[test]
fn s5_pareto_front_is_bounded_and_extremes_match_time_and_risk_minimizers() {
	let g = fast_risky_vs_slow_safe();
	let solver = RouteSolver::new(&g);
	let mut sampler = ScenarioSampler::new(11);
	let scenarios = sampler.sample(50);
	let config = ParetoConfig { num_points: 3, alpha: 0.95, milp_time_limit_s: 30 };

	let front = ParetoFront::generate(&solver, 0, 2, 6.0, &scenarios, config).expect("non-empty graph should produce a front");
	assert!(!front.is_empty() && front.len() <= 3, "S5: at most 3 non-dominated points, got {}", front.len());

	let fastest = front.iter().min_by(|a, b| a.time_minutes.partial_cmp(&b.time_minutes).unwrap()).unwrap();
	let safest = front.iter().min_by(|a, b| a.cvar_95.partial_cmp(&b.cvar_95).unwrap()).unwrap();
	assert_eq!(fastest.node_path, vec![0, 1, 2], "the fastest front point should be the direct risky route");
	assert_eq!(safest.node_path, vec![0, 3, 2], "the lowest-cvar front point should be the safe detour");
}

#[test]
fn s5_pareto_front_is_idempotent_when_filtered_again() {
	let g = fast_risky_vs_slow_safe();
	let solver = RouteSolver::new(&g);
	let mut sampler = ScenarioSampler::new(12);
	let scenarios = sampler.sample(50);
	let config = ParetoConfig { num_points: 3, alpha: 0.95, milp_time_limit_s: 30 };

	let front = ParetoFront::generate(&solver, 0, 2, 6.0, &scenarios, config).unwrap();
	let recommended = ParetoFront::recommend(&front, 0.5, 0.5);
	assert!(recommended.is_some());
}

#[test]
fn pareto_front_rejects_zero_weight_points() {
	let g = fast_risky_vs_slow_safe();
	let solver = RouteSolver::new(&g);
	let scenarios = vec![];
	let config = ParetoConfig { num_points: 0, alpha: 0.95, milp_time_limit_s: 30 };
	let result = ParetoFront::generate(&solver, 0, 2, 6.0, &scenarios, config);
	assert!(result.is_err());
}

#[test]
fn s6_degenerate_single_edge_portfolio_returns_probability_one() {
	let mut g = AttributedGraph::new();
	g.add_node(Node { id: 0, position: LatLon::new(0.0, 0.0), role: Some(NodeRole::Road) });
	g.add_node(Node { id: 1, position: LatLon::new(0.0, 0.1), role: Some(NodeRole::Road) });
	g.put_edge(0, 1, edge(10.0, 50.0, 0.2, 1.0));

	let solver = RouteSolver::new(&g);
	let mut sampler = ScenarioSampler::new(3);
	let scenarios = sampler.sample(20);
	let mut stackelberg = StackelbergSolver::new(9, StackelbergConfig::default());

	let outcome = stackelberg.solve(&solver, 0, 1, 5.0, &scenarios, CvarConfig::default());
	match outcome {
		StackelbergOutcome::Degenerate { route } => {
			assert_eq!(route.node_path, vec![0, 1]);
		}
		other => panic!("single-path graph should be degenerate, got {:?}", other),
	}
}

#[test]
fn s6_strategy_is_a_probability_vector_over_a_diverse_portfolio() {
	let g = fast_risky_vs_slow_safe();
	let solver = RouteSolver::new(&g);
	let mut sampler = ScenarioSampler::new(4);
	let scenarios = sampler.sample(50);
	let mut stackelberg = StackelbergSolver::new(21, StackelbergConfig { k: 2, ..StackelbergConfig::default() });

	let outcome = stackelberg.solve(&solver, 0, 2, 6.0, &scenarios, CvarConfig::default());
	let strategy = outcome.strategy();
	assert!(!strategy.is_empty());
	assert!(strategy.iter().all(|p| *p >= -1e-9), "no negative probabilities");
	let total: f64 = strategy.iter().sum();
	assert!((total - 1.0).abs() < 1e-6, "strategy should sum to 1, got {}", total);
}
