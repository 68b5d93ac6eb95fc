
//! Broadcast orbital and clock models: Keplerian satellite position and
//! velocity, polynomial clock correction with the relativistic term, and
//! week-rollover time normalization.  Pure functions of one ephemeris
//! instance; no state is kept between calls.

use std::f64::consts;

use serde::{Serialize, Deserialize};

use crate::types::{Constellation, SatelliteId};

pub mod tropo;

pub const SPEED_OF_LIGHT_M_S:f64 = 2.99792458e8;   // [m/s]

const TWO_PI:f64 = 2.0 * consts::PI;

const KEPLER_TOLERANCE_RAD:f64 = 1.0e-12;
const KEPLER_MAX_ITER:usize    = 20;

/// Constants of a constellation's broadcast orbital model.
#[derive(Debug, Clone, Copy)]
pub struct OrbitalConstants {
	pub gm:f64,            // [m^3/s^2] gravitational constant of the reference frame
	pub omega_e_dot:f64,   // [rad/s] Earth rotation rate
	pub rel_f:f64,         // [s/sqrt(m)] relativistic clock constant -2*sqrt(GM)/c^2
	pub half_week_s:f64,   // [s]
}

pub const GPS_ORBITAL_CONSTANTS:OrbitalConstants = OrbitalConstants{
	gm: 3.986005e14, omega_e_dot: 7.2921151467e-5, rel_f: -4.442807633e-10, half_week_s: 302400.0 };

pub const GALILEO_ORBITAL_CONSTANTS:OrbitalConstants = OrbitalConstants{
	gm: 3.986004418e14, omega_e_dot: 7.2921151467e-5, rel_f: -4.442807309e-10, half_week_s: 302400.0 };

pub const BEIDOU_ORBITAL_CONSTANTS:OrbitalConstants = OrbitalConstants{
	gm: 3.986004418e14, omega_e_dot: 7.2921150e-5, rel_f: -4.442807309e-10, half_week_s: 302400.0 };

pub const GLONASS_ORBITAL_CONSTANTS:OrbitalConstants = OrbitalConstants{
	gm: 3.9860044e14, omega_e_dot: 7.292115e-5, rel_f: -4.442807e-10, half_week_s: 302400.0 };

pub fn orbital_constants(constellation:Constellation) -> OrbitalConstants {
	match constellation {
		Constellation::Gps     => GPS_ORBITAL_CONSTANTS,
		Constellation::Galileo => GALILEO_ORBITAL_CONSTANTS,
		Constellation::Beidou  => BEIDOU_ORBITAL_CONSTANTS,
		Constellation::Glonass => GLONASS_ORBITAL_CONSTANTS,
	}
}

/// Nominal carrier frequency of the constellation's primary civil signal.
pub fn carrier_freq_hz(constellation:Constellation) -> f64 {
	match constellation {
		Constellation::Gps     => 1575.42e6,
		Constellation::Galileo => 1575.42e6,
		Constellation::Beidou  => 1561.098e6,
		Constellation::Glonass => 1602.0e6,
	}
}

/// Broadcast Keplerian ephemeris plus clock polynomial for one satellite.
/// Angles are stored in radians and rates in rad/s; the telemetry layer
/// applies the semicircle scaling when it parses the subframes.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Ephemeris {
	pub sat:SatelliteId,
	pub week_number:u16,
	pub iode:u8,
	pub iodc:u16,
	pub t_oe:f64,          // [s]
	pub t_oc:f64,          // [s]
	pub sqrt_a:f64,        // [sqrt(m)]
	pub e:f64,
	pub m0:f64,            // [rad]
	pub delta_n:f64,       // [rad/s]
	pub omega:f64,         // [rad]
	pub omega0:f64,        // [rad]
	pub omega_dot:f64,     // [rad/s]
	pub i0:f64,            // [rad]
	pub idot:f64,          // [rad/s]
	pub cuc:f64,           // [rad]
	pub cus:f64,           // [rad]
	pub crc:f64,           // [m]
	pub crs:f64,           // [m]
	pub cic:f64,           // [rad]
	pub cis:f64,           // [rad]
	pub a_f0:f64,          // [s]
	pub a_f1:f64,          // [s/s]
	pub a_f2:f64,          // [s/s^2]
	pub t_gd:f64,          // [s]
	pub sv_health:u8,
	pub ura_index:u8,
	pub fit_interval:bool,
}

impl Ephemeris {

	fn constants(&self) -> OrbitalConstants { orbital_constants(self.sat.constellation) }

	/// Wraps a time difference into plus or minus half a week, correcting
	/// for week rollover at the ends of the broadcast interval.
	pub fn check_t(&self, time:f64) -> f64 {
		let half_week = self.constants().half_week_s;
		if time > half_week {
			time - 2.0*half_week
		} else if time < -half_week {
			time + 2.0*half_week
		} else {
			time
		}
	}

	/// Fixed-point solution of Kepler's equation, seeded with the mean
	/// anomaly.  Convergence below 1e-12 rad normally takes a handful of
	/// passes; the iteration cap is a soft limit and the last iterate is
	/// returned even when it has not been reached.
	fn eccentric_anomaly(&self, mean_anomaly:f64) -> f64 {
		let m = (mean_anomaly % TWO_PI + TWO_PI) % TWO_PI;
		let mut e_k = m;
		for _ in 0..KEPLER_MAX_ITER {
			let e_old = e_k;
			e_k = m + self.e * e_k.sin();
			if ((e_k - e_old) % TWO_PI).abs() < KEPLER_TOLERANCE_RAD { break; }
		}
		e_k
	}

	fn mean_anomaly(&self, tk:f64) -> f64 {
		let a = self.sqrt_a * self.sqrt_a;
		let n0 = (self.constants().gm / (a*a*a)).sqrt();
		self.m0 + (n0 + self.delta_n)*tk
	}

	/// Earth-fixed satellite position at the given transmit time, from
	/// the harmonic-corrected Keplerian elements.
	pub fn position(&self, transmit_time:f64) -> (f64, f64, f64) {
		let k = self.constants();
		let a = self.sqrt_a * self.sqrt_a;
		let tk = self.check_t(transmit_time - self.t_oe);

		let e_k = self.eccentric_anomaly(self.mean_anomaly(tk));

		// True anomaly and corrected argument of latitude
		let nu = ((1.0 - self.e*self.e).sqrt() * e_k.sin()).atan2(e_k.cos() - self.e);
		let phi = (nu + self.omega) % TWO_PI;

		let u = phi + self.cuc*(2.0*phi).cos() + self.cus*(2.0*phi).sin();
		let r = a*(1.0 - self.e*e_k.cos()) + self.crc*(2.0*phi).cos() + self.crs*(2.0*phi).sin();
		let i = self.i0 + self.idot*tk + self.cic*(2.0*phi).cos() + self.cis*(2.0*phi).sin();

		// Angle between the ascending node and the Greenwich meridian
		let omega_k = self.omega0 + (self.omega_dot - k.omega_e_dot)*tk - k.omega_e_dot*self.t_oe;

		let x = u.cos()*r*omega_k.cos() - u.sin()*r*i.cos()*omega_k.sin();
		let y = u.cos()*r*omega_k.sin() + u.sin()*r*i.cos()*omega_k.cos();
		let z = u.sin()*r*i.sin();
		(x, y, z)
	}

	/// Position plus a finite-difference velocity over a 1 ms step, which
	/// is plenty below the dynamics of a MEO orbit.
	pub fn position_and_velocity(&self, transmit_time:f64) -> ((f64, f64, f64), (f64, f64, f64)) {
		const STEP_S:f64 = 1.0e-3;
		let p0 = self.position(transmit_time);
		let p1 = self.position(transmit_time + STEP_S);
		let v = ((p1.0 - p0.0)/STEP_S, (p1.1 - p0.1)/STEP_S, (p1.2 - p0.2)/STEP_S);
		(p0, v)
	}

	/// Polynomial clock correction at the corrected transmit time.  Two
	/// fixed-point passes absorb the coupling between the correction and
	/// the transmit time it is evaluated at.
	pub fn clock_drift(&self, transmit_time:f64) -> f64 {
		let mut dt = self.check_t(transmit_time - self.t_oc);
		for _ in 0..2 {
			dt -= self.a_f0 + self.a_f1*dt + self.a_f2*(dt*dt);
		}
		self.a_f0 + self.a_f1*dt + self.a_f2*(dt*dt)
	}

	/// Relativistic clock correction, proportional to e*sin(E).
	pub fn clock_relativistic_term(&self, transmit_time:f64) -> f64 {
		let tk = self.check_t(transmit_time - self.t_oe);
		let e_k = self.eccentric_anomaly(self.mean_anomaly(tk));
		self.constants().rel_f * self.e * self.sqrt_a * e_k.sin()
	}

	/// Total satellite clock offset from system time at transmit time,
	/// excluding the group delay (applied per signal by the PVT engine).
	pub fn clock_correction(&self, transmit_time:f64) -> f64 {
		self.clock_drift(transmit_time) + self.clock_relativistic_term(transmit_time)
	}

}

#[cfg(test)]
pub(crate) mod tests_support {

	use crate::types::SatelliteId;
	use super::Ephemeris;

	/// Plausible GPS MEO ephemeris for tests that need one per satellite.
	pub fn minimal_ephemeris(sat:SatelliteId) -> Ephemeris {
		Ephemeris{
			sat,
			week_number: 1205, iode: 44, iodc: 44,
			t_oe: 345_600.0, t_oc: 345_600.0,
			sqrt_a: 5153.7, e: 0.012, m0: -1.2, delta_n: 4.5e-9,
			omega: 0.95, omega0: 2.1, omega_dot: -8.1e-9,
			i0: 0.958, idot: 3.0e-10,
			cuc: 1.1e-6, cus: 9.4e-6, crc: 221.0, crs: 22.5, cic: 8.0e-8, cis: -2.0e-8,
			a_f0: 2.3e-4, a_f1: 1.1e-11, a_f2: 0.0,
			t_gd: 4.6e-9, sv_health: 0, ura_index: 1, fit_interval: false }
	}

}

#[cfg(test)]
mod tests {

	use crate::types::{Constellation, SatelliteId};
	use super::*;

	pub fn circular_ephemeris() -> Ephemeris {
		Ephemeris{
			sat: SatelliteId::new(Constellation::Gps, 7),
			week_number: 1024, iode: 17, iodc: 17,
			t_oe: 0.0, t_oc: 0.0,
			sqrt_a: (26_560_000.0_f64).sqrt(),
			e: 0.0, m0: 0.3, delta_n: 0.0,
			omega: 0.0, omega0: 1.0, omega_dot: 0.0,
			i0: 0.96, idot: 0.0,
			cuc: 0.0, cus: 0.0, crc: 0.0, crs: 0.0, cic: 0.0, cis: 0.0,
			a_f0: 1.0e-5, a_f1: 0.0, a_f2: 0.0,
			t_gd: 0.0, sv_health: 0, ura_index: 0, fit_interval: false }
	}

	#[test]
	fn zero_eccentricity_orbit_radius() {
		let eph = circular_ephemeris();
		let (x, y, z) = eph.position(120.0);
		let r = (x*x + y*y + z*z).sqrt();
		assert!((r - 26_560_000.0).abs() < 1.0, "r = {}", r);
	}

	#[test]
	fn zero_eccentricity_eccentric_anomaly_equals_mean() {
		let eph = circular_ephemeris();
		let e_k = eph.eccentric_anomaly(0.3);
		assert!((e_k - 0.3).abs() < 1.0e-12);
	}

	#[test]
	fn finite_difference_velocity_is_orbital() {
		let eph = circular_ephemeris();
		let (_, (vx, vy, vz)) = eph.position_and_velocity(60.0);
		let speed = (vx*vx + vy*vy + vz*vz).sqrt();
		// Earth-fixed speed of a MEO satellite: orbital ~3.9 km/s plus
		// up to ~2 km/s of frame rotation depending on geometry
		assert!(speed > 2_000.0 && speed < 6_000.0, "speed = {}", speed);
	}

	#[test]
	fn week_rollover_normalization() {
		let eph = circular_ephemeris();
		assert_eq!(eph.check_t(302_500.0), 302_500.0 - 604_800.0);
		assert_eq!(eph.check_t(-302_500.0), -302_500.0 + 604_800.0);
		assert_eq!(eph.check_t(150.0), 150.0);
	}

	#[test]
	fn clock_polynomial_at_reference_epoch() {
		let eph = circular_ephemeris();
		// e = 0 kills the relativistic term; a_f1 = a_f2 = 0 leaves a_f0
		let dt = eph.clock_correction(0.0);
		assert!((dt - 1.0e-5).abs() < 1.0e-15);
	}

}
