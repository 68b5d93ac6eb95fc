
//! Cartesian/geodetic conversion over the classical reference
//! ellipsoids, plus the local-level look angles the corrections need.

use serde::{Serialize, Deserialize};

/// Choices of reference ellipsoid for geographical coordinates, in the
/// traditional selector order (4 is WGS84).
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum Ellipsoid {
	International1924,
	International1967,
	Wgs72,
	Grs80,
	Wgs84,
}

impl Ellipsoid {

	pub fn from_selector(selector:usize) -> Option<Ellipsoid> {
		match selector {
			0 => Some(Ellipsoid::International1924),
			1 => Some(Ellipsoid::International1967),
			2 => Some(Ellipsoid::Wgs72),
			3 => Some(Ellipsoid::Grs80),
			4 => Some(Ellipsoid::Wgs84),
			_ => None,
		}
	}

	pub fn semi_major_axis_m(self) -> f64 {
		match self {
			Ellipsoid::International1924 => 6_378_388.0,
			Ellipsoid::International1967 => 6_378_160.0,
			Ellipsoid::Wgs72             => 6_378_135.0,
			Ellipsoid::Grs80             => 6_378_137.0,
			Ellipsoid::Wgs84             => 6_378_137.0,
		}
	}

	pub fn flattening(self) -> f64 {
		match self {
			Ellipsoid::International1924 => 1.0/297.0,
			Ellipsoid::International1967 => 1.0/298.247,
			Ellipsoid::Wgs72             => 1.0/298.26,
			Ellipsoid::Grs80             => 1.0/298.257222101,
			Ellipsoid::Wgs84             => 1.0/298.257223563,
		}
	}

}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Default)]
pub struct GeodeticPosition {
	pub latitude_deg:f64,
	pub longitude_deg:f64,
	pub height_m:f64,
}

const CART2GEO_TOLERANCE_M:f64 = 1.0e-12;
const CART2GEO_MAX_ITER:usize  = 100;

/// Iterative Cartesian-to-geodetic conversion.  The boolean is the
/// convergence status; on the (degenerate) inputs that fail to converge
/// the last iterate is still returned and the caller decides whether it
/// is usable.
pub fn cart2geo(x:f64, y:f64, z:f64, ellipsoid:Ellipsoid) -> (GeodeticPosition, bool) {
	let a = ellipsoid.semi_major_axis_m();
	let f = ellipsoid.flattening();

	let lambda = y.atan2(x);
	let ex2 = (2.0 - f)*f / (1.0 - f).powi(2);
	let c = a * (1.0 + ex2).sqrt();
	let rho = (x*x + y*y).sqrt();

	let mut phi = (z / (rho*(1.0 - (2.0 - f)*f))).atan();
	let mut h:f64 = 0.1;
	let mut oldh:f64 = 0.0;
	let mut converged = false;

	for _ in 0..CART2GEO_MAX_ITER {
		if (h - oldh).abs() < CART2GEO_TOLERANCE_M {
			converged = true;
			break;
		}
		oldh = h;
		let n = c / (1.0 + ex2*phi.cos().powi(2)).sqrt();
		phi = (z / (rho*(1.0 - (2.0 - f)*f*n/(n + h)))).atan();
		h = rho/phi.cos() - n;
	}

	(GeodeticPosition{
		latitude_deg: phi.to_degrees(),
		longitude_deg: lambda.to_degrees(),
		height_m: h }, converged)
}

/// Forward geodetic-to-Cartesian conversion on the same ellipsoid set.
pub fn geo2cart(pos:&GeodeticPosition, ellipsoid:Ellipsoid) -> (f64, f64, f64) {
	let a = ellipsoid.semi_major_axis_m();
	let f = ellipsoid.flattening();
	let e2 = f*(2.0 - f);

	let phi = pos.latitude_deg.to_radians();
	let lambda = pos.longitude_deg.to_radians();
	let n = a / (1.0 - e2*phi.sin().powi(2)).sqrt();

	let x = (n + pos.height_m)*phi.cos()*lambda.cos();
	let y = (n + pos.height_m)*phi.cos()*lambda.sin();
	let z = (n*(1.0 - e2) + pos.height_m)*phi.sin();
	(x, y, z)
}

/// Elevation and azimuth (radians) of a satellite seen from a receiver,
/// both in Earth-fixed coordinates.
pub fn elevation_azimuth(rx_ecef:(f64, f64, f64), sv_ecef:(f64, f64, f64)) -> (f64, f64) {
	let (geo, _) = cart2geo(rx_ecef.0, rx_ecef.1, rx_ecef.2, Ellipsoid::Wgs84);
	let phi = geo.latitude_deg.to_radians();
	let lam = geo.longitude_deg.to_radians();

	let dx = sv_ecef.0 - rx_ecef.0;
	let dy = sv_ecef.1 - rx_ecef.1;
	let dz = sv_ecef.2 - rx_ecef.2;

	let east  = -lam.sin()*dx + lam.cos()*dy;
	let north = -phi.sin()*lam.cos()*dx - phi.sin()*lam.sin()*dy + phi.cos()*dz;
	let up    =  phi.cos()*lam.cos()*dx + phi.cos()*lam.sin()*dy + phi.sin()*dz;

	let elevation = up.atan2((east*east + north*north).sqrt());
	let azimuth = east.atan2(north);
	(elevation, azimuth)
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn wgs84_round_trip() {
		let truth = GeodeticPosition{ latitude_deg: 40.0, longitude_deg: -3.0, height_m: 650.0 };
		let (x, y, z) = geo2cart(&truth, Ellipsoid::Wgs84);
		let (back, converged) = cart2geo(x, y, z, Ellipsoid::Wgs84);

		assert!(converged);
		assert!((back.latitude_deg - truth.latitude_deg).abs() < 1.0e-6);
		assert!((back.longitude_deg - truth.longitude_deg).abs() < 1.0e-6);
		assert!((back.height_m - truth.height_m).abs() < 1.0e-3);
	}

	#[test]
	fn southern_hemisphere_round_trip_on_grs80() {
		let truth = GeodeticPosition{ latitude_deg: -33.86, longitude_deg: 151.2, height_m: 25.0 };
		let (x, y, z) = geo2cart(&truth, Ellipsoid::Grs80);
		let (back, converged) = cart2geo(x, y, z, Ellipsoid::Grs80);

		assert!(converged);
		assert!((back.latitude_deg - truth.latitude_deg).abs() < 1.0e-6);
		assert!((back.longitude_deg - truth.longitude_deg).abs() < 1.0e-6);
		assert!((back.height_m - truth.height_m).abs() < 1.0e-3);
	}

	#[test]
	fn selector_four_is_wgs84() {
		assert_eq!(Ellipsoid::from_selector(4), Some(Ellipsoid::Wgs84));
		assert!(Ellipsoid::from_selector(5).is_none());
	}

	#[test]
	fn satellite_overhead_is_at_ninety_degrees() {
		let rx = geo2cart(&GeodeticPosition{ latitude_deg: 40.0, longitude_deg: -3.0, height_m: 0.0 }, Ellipsoid::Wgs84);
		// Push the satellite straight up along the local vertical
		let phi = (40.0_f64).to_radians();
		let lam = (-3.0_f64).to_radians();
		let up = (phi.cos()*lam.cos(), phi.cos()*lam.sin(), phi.sin());
		let sv = (rx.0 + 2.0e7*up.0, rx.1 + 2.0e7*up.1, rx.2 + 2.0e7*up.2);

		let (el, _) = elevation_azimuth(rx, sv);
		assert!((el.to_degrees() - 90.0).abs() < 0.1, "el = {}", el.to_degrees());
	}

}
