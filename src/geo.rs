//! Geospatial primitives shared by every component.
//!
//! Kept deliberately small: the full terrain/viewshed/threat math lives in
//! the perception collaborators (out of scope), this module only has the
//! bits every component needs to agree on (distance, midpoints, bounds).

use serde::{Deserialize, Serialize};

/// A geographic position, always `(lat, lon)` in degrees.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct LatLon {
	pub lat: f64,
	pub lon: f64,
}

impl LatLon {
	pub fn new(lat: f64, lon: f64) -> Self {
		Self { lat, lon }
	}

	pub fn midpoint(&self, other: &LatLon) -> LatLon {
		LatLon::new((self.lat + other.lat) / 2.0, (self.lon + other.lon) / 2.0)
	}

	/// Great-circle distance in kilometers (haversine, mean Earth radius 6371km).
	pub fn haversine_km(&self, other: &LatLon) -> f64 {
		const R_KM: f64 = 6371.0;
		let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
		let dlat = (other.lat - self.lat).to_radians();
		let dlon = (other.lon - self.lon).to_radians();
		let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
		let c = 2.0 * a.sqrt().asin();
		R_KM * c
	}
}

/// A raster bounding box, north/south/east/west in degrees.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Bounds {
	pub north: f64,
	pub south: f64,
	pub east: f64,
	pub west: f64,
}

impl Bounds {
	pub fn center(&self) -> LatLon {
		LatLon::new((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn haversine_zero_for_identical_points() {
		let p = LatLon::new(48.5, 35.0);
		assert!(p.haversine_km(&p) < 1e-9);
	}

	#[test]
	fn haversine_matches_known_distance() {
		// Kyiv to Kharkiv, roughly 410km.
		let kyiv = LatLon::new(50.45, 30.52);
		let kharkiv = LatLon::new(49.99, 36.23);
		let d = kyiv.haversine_km(&kharkiv);
		assert!(d > 380.0 && d < 440.0, "distance was {}", d);
	}
}
