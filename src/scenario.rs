//! `ScenarioSampler` — reproducible risk-multiplier scenarios for CVaR
//! evaluation. Scenarios are pure data: no graph dependency, shared across
//! every edge within a single solve.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::Scenario;

const PATROL_PRESENCE_LEVELS: [f64; 4] = [0.8, 1.0, 1.2, 1.5];

#[derive(Clone, Copy, Debug)]
pub struct ScenarioSamplerConfig {
	/// Default scenario-set size (spec default S=100).
	pub num_scenarios_default: usize,
	/// Scenario-set size used by the CVaR router under MILP load (spec S=50).
	pub num_scenarios_milp: usize,
}

impl Default for ScenarioSamplerConfig {
	fn default() -> Self {
		ScenarioSamplerConfig {
			num_scenarios_default: 100,
			num_scenarios_milp: 50,
		}
	}
}

/// Draws scenarios deterministically from a caller-supplied seed.
pub struct ScenarioSampler {
	rng: StdRng,
}

impl ScenarioSampler {
	pub fn new(seed: u64) -> Self {
		ScenarioSampler { rng: StdRng::seed_from_u64(seed) }
	}

	/// Draws `count` scenarios. Consecutive calls on the same sampler
	/// continue advancing its RNG state rather than resetting to the seed,
	/// so determinism is at the granularity of "same sampler, same call
	/// sequence" — a fresh `ScenarioSampler::new(seed)` reproduces a given
	/// solve's scenario set exactly.
	pub fn sample(&mut self, count: usize) -> Vec<Scenario> {
		(0..count)
			.map(|_| Scenario {
				visibility_mult: self.rng.gen_range(0.7..=1.3),
				detection_mult: self.rng.gen_range(0.8..=1.2),
				patrol_presence: PATROL_PRESENCE_LEVELS[self.rng.gen_range(0..PATROL_PRESENCE_LEVELS.len())],
			})
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn same_seed_reproduces_scenarios() {
		let mut a = ScenarioSampler::new(7);
		let mut b = ScenarioSampler::new(7);
		let sa = a.sample(20);
		let sb = b.sample(20);
		for (x, y) in sa.iter().zip(sb.iter()) {
			assert!((x.visibility_mult - y.visibility_mult).abs() < 1e-12);
			assert!((x.detection_mult - y.detection_mult).abs() < 1e-12);
			assert!((x.patrol_presence - y.patrol_presence).abs() < 1e-12);
		}
	}

	#[test]
	fn scenarios_are_within_documented_ranges() {
		let mut s = ScenarioSampler::new(1);
		for sc in s.sample(200) {
			assert!(sc.visibility_mult >= 0.7 && sc.visibility_mult <= 1.3);
			assert!(sc.detection_mult >= 0.8 && sc.detection_mult <= 1.2);
			assert!([0.8, 1.0, 1.2, 1.5].contains(&sc.patrol_presence));
		}
	}
}
