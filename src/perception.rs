//! External perception interfaces, consumed as pure functions or
//! precomputed rasters (spec.md §6). The heavy implementations — DEM
//! loading, line-of-sight viewshed raycasting, DBSCAN kill-zone clustering,
//! Prophet-style temporal threat forecasting — are out of scope collaborators.
//! What lives here are the fixed interfaces `GraphEnricher` calls against,
//! plus minimal reference implementations so the crate is exercisable without
//! a real perception stack wired in.

use crate::geo::{Bounds, LatLon};
use crate::model::{RoadType, Weather};

/// A 2-D elevation raster over a bounding box, indexed per spec.md §6.
#[derive(Clone, Debug)]
pub struct ElevationRaster {
	/// Row-major, `data[row][col]`, north-to-south, west-to-east.
	data: Vec<Vec<f64>>,
	bounds: Bounds,
}

impl ElevationRaster {
	pub fn new(data: Vec<Vec<f64>>, bounds: Bounds) -> Self {
		Self { data, bounds }
	}

	fn row_col(&self, pos: LatLon) -> Option<(usize, usize)> {
		if self.data.is_empty() || self.data[0].is_empty() {
			return None;
		}
		let height = self.data.len();
		let width = self.data[0].len();
		let col = ((pos.lon - self.bounds.west) / (self.bounds.east - self.bounds.west) * width as f64) as isize;
		let row = ((self.bounds.north - pos.lat) / (self.bounds.north - self.bounds.south) * height as f64) as isize;
		if row < 0 || col < 0 || row as usize >= height || col as usize >= width {
			return None;
		}
		Some((row as usize, col as usize))
	}

	pub fn elevation_at(&self, pos: LatLon) -> Option<f64> {
		let (row, col) = self.row_col(pos)?;
		Some(self.data[row][col])
	}

	/// Slope percentage between two points, `None` if either is outside bounds.
	pub fn slope_pct(&self, a: LatLon, b: LatLon) -> Option<f64> {
		let (ea, eb) = (self.elevation_at(a)?, self.elevation_at(b)?);
		let dist_m = a.haversine_km(&b) * 1000.0;
		if dist_m == 0.0 {
			return Some(0.0);
		}
		Some(((eb - ea) / dist_m).abs() * 100.0)
	}
}

/// `(lat, lon) -> [0,1]` visibility score.
pub trait Viewshed {
	fn visibility_at(&self, pos: LatLon) -> f64;
}

/// A viewshed that always reports zero visibility (used when no viewshed
/// raster is available, per spec.md §4.1: "0 if no raster").
pub struct NoViewshed;

impl Viewshed for NoViewshed {
	fn visibility_at(&self, _pos: LatLon) -> f64 {
		0.0
	}
}

/// A viewshed backed by the same grid indexing as `ElevationRaster`.
pub struct GridViewshed {
	data: Vec<Vec<f64>>,
	bounds: Bounds,
}

impl GridViewshed {
	pub fn new(data: Vec<Vec<f64>>, bounds: Bounds) -> Self {
		Self { data, bounds }
	}
}

impl Viewshed for GridViewshed {
	fn visibility_at(&self, pos: LatLon) -> f64 {
		if self.data.is_empty() || self.data[0].is_empty() {
			return 0.0;
		}
		let height = self.data.len();
		let width = self.data[0].len();
		let col = ((pos.lon - self.bounds.west) / (self.bounds.east - self.bounds.west) * width as f64) as isize;
		let row = ((self.bounds.north - pos.lat) / (self.bounds.north - self.bounds.south) * height as f64) as isize;
		if row < 0 || col < 0 || row as usize >= height || col as usize >= width {
			return 0.0;
		}
		self.data[row as usize][col as usize].clamp(0.0, 1.0)
	}
}

/// `(lat, lon, timestamp, road_type, weather) -> [0,1]` detection probability.
pub trait ThreatPredictor {
	fn risk_at(&self, pos: LatLon, timestamp_unix_s: i64, road_type: RoadType, weather: Weather) -> f64;
}

/// A threat predictor that always returns the same baseline, useful when no
/// temporal/spatial threat model is wired in.
pub struct ConstantThreatPredictor(pub f64);

impl ThreatPredictor for ConstantThreatPredictor {
	fn risk_at(&self, _pos: LatLon, _timestamp_unix_s: i64, _road_type: RoadType, _weather: Weather) -> f64 {
		self.0.clamp(0.0, 1.0)
	}
}

/// A small reference threat model combining a per-road-type base rate with
/// day/night and weather modifiers, in the shape of (but not a port of)
/// `threat_model.py::ThreatPredictor.risk_at` — no Prophet forecasting, no
/// DBSCAN clustering, those remain out-of-scope perception internals.
pub struct TableThreatPredictor {
	pub base_detection_road: f64,
	pub base_detection_track: f64,
	pub base_detection_offroad: f64,
	pub day_night_ratio: f64,
}

impl Default for TableThreatPredictor {
	fn default() -> Self {
		TableThreatPredictor {
			base_detection_road: 0.35,
			base_detection_track: 0.2,
			base_detection_offroad: 0.12,
			day_night_ratio: 2.5,
		}
	}
}

impl ThreatPredictor for TableThreatPredictor {
	fn risk_at(&self, _pos: LatLon, timestamp_unix_s: i64, road_type: RoadType, weather: Weather) -> f64 {
		let base = match road_type {
			RoadType::Primary => self.base_detection_road,
			RoadType::Secondary | RoadType::Tertiary => self.base_detection_road * 0.8,
			RoadType::Track | RoadType::Path => self.base_detection_track,
			RoadType::Offroad => self.base_detection_offroad,
		};

		let hour = ((timestamp_unix_s.rem_euclid(86_400)) / 3600) as u32;
		let mut temporal_mult = 1.0;
		if (6..=8).contains(&hour) || (16..=18).contains(&hour) {
			temporal_mult *= 1.3;
		}
		let is_night = hour < 6 || hour > 20;
		if is_night {
			temporal_mult /= self.day_night_ratio;
		}

		let weather_mult = match weather {
			Weather::Rain => 0.85,
			Weather::Fog => 0.6,
			Weather::Snow => 0.75,
			Weather::Rasputitsa => 0.9,
			Weather::Clear => 1.0,
		};

		(base * temporal_mult * weather_mult).clamp(0.0, 1.0)
	}
}

/// `(road_type, weather) -> km/h` lookup, modulated by slope.
///
/// Concrete values adapted from the road/weather matrix documented in
/// SPEC_FULL.md §4.1; the original's `constants.py` calibration values were
/// stripped from the retrieved source, so these are reconstructed
/// placeholders in the same shape, not a literal port.
pub struct SpeedTable;

impl SpeedTable {
	pub fn base_speed_kmh(&self, road_type: RoadType, weather: Weather) -> f64 {
		use RoadType::*;
		use Weather::*;
		match (road_type, weather) {
			(Primary, Clear) => 70.0,
			(Primary, Fog) => 60.0,
			(Primary, Rain) => 55.0,
			(Primary, Snow) => 40.0,
			(Primary, Rasputitsa) => 35.0,

			(Secondary, Clear) => 50.0,
			(Secondary, Fog) => 45.0,
			(Secondary, Rain) => 40.0,
			(Secondary, Snow) => 30.0,
			(Secondary, Rasputitsa) => 25.0,

			(Tertiary, Clear) => 35.0,
			(Tertiary, Fog) => 32.0,
			(Tertiary, Rain) => 28.0,
			(Tertiary, Snow) => 20.0,
			(Tertiary, Rasputitsa) => 15.0,

			(Track, Clear) => 25.0,
			(Track, Fog) => 22.0,
			(Track, Rain) => 18.0,
			(Track, Snow) => 12.0,
			(Track, Rasputitsa) => 4.0,

			(Path, Clear) => 15.0,
			(Path, Fog) => 13.0,
			(Path, Rain) => 10.0,
			(Path, Snow) => 7.0,
			(Path, Rasputitsa) => 2.0,

			(Offroad, Clear) => 20.0,
			(Offroad, Fog) => 18.0,
			(Offroad, Rain) => 14.0,
			(Offroad, Snow) => 8.0,
			(Offroad, Rasputitsa) => 2.0,
		}
	}

	/// Slope factor per spec.md §4.1's documented table.
	pub fn slope_factor(&self, slope_pct: f64) -> f64 {
		if slope_pct < 5.0 {
			1.0
		} else if slope_pct < 10.0 {
			0.9
		} else if slope_pct < 15.0 {
			0.7
		} else if slope_pct < 20.0 {
			0.5
		} else {
			0.3
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn rasputitsa_is_slowest_offroad() {
		let t = SpeedTable;
		let clear = t.base_speed_kmh(RoadType::Track, Weather::Clear);
		let mud = t.base_speed_kmh(RoadType::Track, Weather::Rasputitsa);
		assert!(mud < clear * 0.2, "rasputitsa should be nearly impassable on track, got {}", mud);
	}

	#[test]
	fn no_viewshed_is_zero() {
		assert_eq!(NoViewshed.visibility_at(LatLon::new(0.0, 0.0)), 0.0);
	}
}
