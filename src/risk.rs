//! `EdgeRiskModel` — pure function mapping (edge attributes, scenario, cargo
//! value) to a scalar risk contribution, shared by every downstream
//! component. Capped at 10 to bound MILP coefficients and prevent
//! arithmetic pathologies on near-forbidden (killzone) edges.

use crate::model::{EdgeAttrs, Scenario};

pub const RISK_CAP: f64 = 10.0;

/// Risk contribution of a single edge under a single scenario.
pub fn edge_risk(attrs: &EdgeAttrs, scenario: &Scenario, cargo_value: f64) -> f64 {
	let raw = attrs.detection_base
		* scenario.detection_mult
		* (1.0 + attrs.visibility * scenario.visibility_mult * 0.5)
		* scenario.patrol_presence
		* attrs.killzone_penalty
		* (cargo_value / 10.0);
	raw.min(RISK_CAP)
}

/// Sum of edge risks along a path under a single scenario.
pub fn path_risk<'a>(edges: impl IntoIterator<Item = &'a EdgeAttrs>, scenario: &Scenario, cargo_value: f64) -> f64 {
	edges.into_iter().map(|e| edge_risk(e, scenario, cargo_value)).sum()
}

/// Arithmetic mean of a path's risk across a scenario set.
pub fn mean_path_risk<'a>(edges: &[&'a EdgeAttrs], scenarios: &[Scenario], cargo_value: f64) -> f64 {
	if scenarios.is_empty() {
		return 0.0;
	}
	let total: f64 = scenarios.iter().map(|s| path_risk(edges.iter().copied(), s, cargo_value)).sum();
	total / scenarios.len() as f64
}

/// Conditional Value at Risk at confidence level `alpha`: sort ascending,
/// `var = sorted[floor(alpha * len)]`, CVaR = mean of everything `>= var`.
pub fn cvar(risks: &[f64], alpha: f64) -> f64 {
	if risks.is_empty() {
		return 0.0;
	}
	let mut sorted: Vec<f64> = risks.to_vec();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
	let var_index = ((alpha * sorted.len() as f64) as usize).min(sorted.len() - 1);
	let var = sorted[var_index];
	let tail: Vec<f64> = sorted.iter().copied().filter(|r| *r >= var).collect();
	if tail.is_empty() {
		var
	} else {
		tail.iter().sum::<f64>() / tail.len() as f64
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn attrs(detection: f64, visibility: f64, killzone_penalty: f64) -> EdgeAttrs {
		EdgeAttrs {
			distance_km: 1.0,
			road_type: crate::model::RoadType::Primary,
			base_speed_kmh: 50.0,
			travel_time_hours: 0.02,
			visibility,
			detection_base: detection,
			killzone_penalty,
			geometry: None,
		}
	}

	fn scenario(visibility_mult: f64, detection_mult: f64, patrol_presence: f64) -> Scenario {
		Scenario { visibility_mult, detection_mult, patrol_presence }
	}

	#[test]
	fn risk_is_capped_at_ten() {
		let a = attrs(1.0, 1.0, 1000.0);
		let s = scenario(1.3, 1.2, 1.5);
		assert_eq!(edge_risk(&a, &s, 10.0), RISK_CAP);
	}

	#[test]
	fn path_risk_is_sum_of_edge_risks() {
		let edges = vec![attrs(0.2, 0.3, 1.0), attrs(0.4, 0.1, 2.0)];
		let s = scenario(1.0, 1.0, 1.0);
		let expected: f64 = edges.iter().map(|e| edge_risk(e, &s, 7.0)).sum();
		assert!((path_risk(edges.iter(), &s, 7.0) - expected).abs() < 1e-12);
	}

	// S1: risks = [0.5] * 100 -> CVaR_0.95 ~= 0.5
	#[test]
	fn s1_cvar_of_constant_risk_is_constant() {
		let risks = vec![0.5; 100];
		assert!((cvar(&risks, 0.95) - 0.5).abs() < 1e-3);
	}

	// S2: risks = [0.1]*95 + [1.0]*5 -> CVaR_0.95 > 0.8 (tail sensitivity)
	#[test]
	fn s2_cvar_is_tail_sensitive() {
		let mut risks = vec![0.1; 95];
		risks.extend(vec![1.0; 5]);
		assert!(cvar(&risks, 0.95) > 0.8);
	}

	#[test]
	fn cvar_is_non_decreasing_in_alpha_and_at_least_mean() {
		let risks: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
		let mean: f64 = risks.iter().sum::<f64>() / risks.len() as f64;
		let c50 = cvar(&risks, 0.5);
		let c90 = cvar(&risks, 0.9);
		let c99 = cvar(&risks, 0.99);
		assert!(c50 >= mean - 1e-9);
		assert!(c90 >= c50 - 1e-9);
		assert!(c99 >= c90 - 1e-9);
	}
}
