
//! Snapshot least-squares PVT engine.  Once per output epoch it takes
//! the aggregator snapshot plus the navigation data store, prepares
//! corrected observations, solves position/clock and velocity/drift by
//! iterative ordinary least squares and derives the DOP set from the
//! geometry matrix.  Everything runs on copies, outside any lock.

use std::collections::HashMap;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Matrix3, Matrix4, Vector3, Vector4};

use crate::Error;
use crate::nav::NavDataStore;
use crate::orbital::{self, SPEED_OF_LIGHT_M_S};
use crate::types::{ChannelSample, MonitorPvt, SatelliteId};

pub mod geodesy;
pub mod solution;

use self::geodesy::{cart2geo, Ellipsoid, GeodeticPosition};
use self::solution::{Dop, PvtSolution};

pub const MIN_SATELLITES:usize = 4;

const LS_MAX_ITER:usize      = 10;
const LS_CONVERGENCE_M:f64   = 1.0e-4;

const GPS_EPOCH_UNIX_S:f64   = 315_964_800.0;
const SECONDS_PER_WEEK:f64   = 604_800.0;

/// One prepared observation: pseudorange already corrected for the
/// satellite clock, relativity, group delay and troposphere.
#[derive(Debug, Clone)]
pub struct Observation {
	pub sat:SatelliteId,
	pub pseudorange_m:f64,
	pub pseudorange_rate_m_s:f64,
	pub sv_pos_ecef:(f64, f64, f64),
	pub sv_vel_ecef:(f64, f64, f64),
}

/// Surface weather used by the tropospheric model when no sensor feed
/// is available; the defaults are the standard atmosphere.
#[derive(Debug, Clone)]
pub struct TropoConditions {
	pub pressure_mb:f64,
	pub temperature_k:f64,
	pub humidity_pct:f64,
	pub height_pressure_km:f64,
	pub height_temperature_km:f64,
	pub height_humidity_km:f64,
}

impl Default for TropoConditions {

	fn default() -> Self {
		Self{ pressure_mb: 1013.0, temperature_k: 293.0, humidity_pct: 50.0,
			height_pressure_km: 0.0, height_temperature_km: 0.0, height_humidity_km: 0.0 }
	}

}

/// Resolved once at startup; the week-rollover mode in particular is a
/// static per-run property, never re-evaluated per fix.
#[derive(Debug, Clone)]
pub struct PvtConfig {
	pub averaging_depth:usize,
	pub flag_averaging:bool,
	pub pre_2009_file:bool,
	pub ellipsoid:Ellipsoid,
	pub tropo:TropoConditions,
}

impl Default for PvtConfig {

	fn default() -> Self {
		Self{ averaging_depth: 100, flag_averaging: false, pre_2009_file: false,
			ellipsoid: Ellipsoid::Wgs84, tropo: TropoConditions::default() }
	}

}

/// Earth-rotation (Sagnac) correction: rotates a satellite position
/// through the signal transit time.
pub fn rotate_satellite(travel_time_s:f64, sv_pos:(f64, f64, f64)) -> (f64, f64, f64) {
	let theta = orbital::GPS_ORBITAL_CONSTANTS.omega_e_dot * travel_time_s;
	let (s, c) = (theta.sin(), theta.cos());
	(c*sv_pos.0 + s*sv_pos.1, -s*sv_pos.0 + c*sv_pos.1, sv_pos.2)
}

/// Raw least-squares fix, before coordinate conversion and averaging.
#[derive(Debug, Clone)]
pub struct LsFix {
	pub pos_ecef:(f64, f64, f64),
	pub clock_bias_m:f64,
	pub residual_norm:f64,
	pub q:Matrix4<f64>,
}

/// Classic iterative ordinary least squares on pseudoranges.  Needs at
/// least four observations for the three position components plus the
/// receiver clock; fewer, a singular geometry or a blown iteration cap
/// all come back as errors and the caller keeps its previous solution.
pub fn solve_position_and_time(obs:&[Observation], x0:Vector4<f64>) -> Result<LsFix, Error> {
	if obs.len() < MIN_SATELLITES {
		return Err(Error::NotEnoughObservations{ have: obs.len(), need: MIN_SATELLITES });
	}

	let n = obs.len();
	let mut x = x0;

	for _ in 0..LS_MAX_ITER {
		let mut h = DMatrix::from_element(n, 4, 0.0);
		let mut v = DVector::from_element(n, 0.0);
		let p_rx = Vector3::new(x[0], x[1], x[2]);

		for (i, ob) in obs.iter().enumerate() {
			// Transit time from the measured pseudorange is accurate
			// enough for the Earth-rotation correction
			let tau = ob.pseudorange_m / SPEED_OF_LIGHT_M_S;
			let (sx, sy, sz) = rotate_satellite(tau, ob.sv_pos_ecef);
			let dp = Vector3::new(sx, sy, sz) - p_rx;
			let r = dp.norm();

			v[i] = ob.pseudorange_m - r - x[3];
			for j in 0..3 { h[(i, j)] = -dp[j]/r; }
			h[(i, 3)] = 1.0;
		}

		let q = (h.tr_mul(&h)).try_inverse().ok_or(Error::SingularGeometry)?;
		let dxv = &q * h.tr_mul(&v);
		let dx = Vector4::new(dxv[0], dxv[1], dxv[2], dxv[3]);
		x += dx;

		if dx.norm() < LS_CONVERGENCE_M {
			if !x.iter().chain(v.iter()).all(|a| a.is_finite()) {
				return Err(Error::NonFiniteSolution);
			}
			let q = Matrix4::from_fn(|r, c| q[(r, c)]);
			return Ok(LsFix{
				pos_ecef: (x[0], x[1], x[2]),
				clock_bias_m: x[3],
				residual_norm: v.norm(),
				q });
		}
	}

	Err(Error::Other("position solution did not converge"))
}

/// Velocity and clock drift from pseudorange rates.  The geometry matrix
/// is the one the position solve ended on, so this is a single linear
/// solve, no iteration.
pub fn solve_velocity(obs:&[Observation], rx_pos:(f64, f64, f64)) -> Result<((f64, f64, f64), f64), Error> {
	if obs.len() < MIN_SATELLITES {
		return Err(Error::NotEnoughObservations{ have: obs.len(), need: MIN_SATELLITES });
	}

	let n = obs.len();
	let mut h = DMatrix::from_element(n, 4, 0.0);
	let mut b = DVector::from_element(n, 0.0);
	let p_rx = Vector3::new(rx_pos.0, rx_pos.1, rx_pos.2);

	for (i, ob) in obs.iter().enumerate() {
		let p_sv = Vector3::new(ob.sv_pos_ecef.0, ob.sv_pos_ecef.1, ob.sv_pos_ecef.2);
		let v_sv = Vector3::new(ob.sv_vel_ecef.0, ob.sv_vel_ecef.1, ob.sv_vel_ecef.2);
		let dp = p_sv - p_rx;
		let los = dp / dp.norm();

		b[i] = ob.pseudorange_rate_m_s - los.dot(&v_sv);
		for j in 0..3 { h[(i, j)] = -los[j]; }
		h[(i, 3)] = 1.0;
	}

	let q = (h.tr_mul(&h)).try_inverse().ok_or(Error::SingularGeometry)?;
	let sol = &q * h.tr_mul(&b);
	if !sol.iter().all(|a| a.is_finite()) {
		return Err(Error::NonFiniteSolution);
	}
	Ok(((sol[0], sol[1], sol[2]), sol[3]))
}

/// Dilution of precision from the inverse normal-equation matrix; the
/// horizontal and vertical terms need the local-level frame.
pub fn dop_from_geometry(q:&Matrix4<f64>, geodetic:&GeodeticPosition) -> Dop {
	let gdop = (q[(0, 0)] + q[(1, 1)] + q[(2, 2)] + q[(3, 3)]).sqrt();
	let pdop = (q[(0, 0)] + q[(1, 1)] + q[(2, 2)]).sqrt();

	let phi = geodetic.latitude_deg.to_radians();
	let lam = geodetic.longitude_deg.to_radians();
	let q3 = Matrix3::new(
		q[(0, 0)], q[(0, 1)], q[(0, 2)],
		q[(1, 0)], q[(1, 1)], q[(1, 2)],
		q[(2, 0)], q[(2, 1)], q[(2, 2)]);
	let r = Matrix3::new(
		-lam.sin(),           lam.cos(),            0.0,
		-phi.sin()*lam.cos(), -phi.sin()*lam.sin(), phi.cos(),
		 phi.cos()*lam.cos(),  phi.cos()*lam.sin(), phi.sin());
	let q_enu = r * q3 * r.transpose();

	Dop{
		hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
		vdop: q_enu[(2, 2)].sqrt(),
		pdop,
		gdop }
}

/// GPS week/TOW to seconds since the Unix epoch.  Broadcast weeks are
/// modulo 1024; the run mode picks which rollover era restores the full
/// count.
pub fn gps_time_to_unix_s(week_number:u16, tow_s:f64, pre_2009_file:bool, utc_offset_s:f64) -> f64 {
	let rollover:u32 = if pre_2009_file { 1024 } else { 2048 };
	let full_week = (week_number % 1024) as u32 + rollover;
	GPS_EPOCH_UNIX_S + (full_week as f64)*SECONDS_PER_WEEK + tow_s - utc_offset_s
}

pub struct PvtEngine {
	config:PvtConfig,
	solution:PvtSolution,
}

impl PvtEngine {

	pub fn new(config:PvtConfig) -> Self {
		let solution = PvtSolution::new(config.averaging_depth, config.flag_averaging);
		Self{ config, solution }
	}

	pub fn solution(&self) -> &PvtSolution { &self.solution }

	pub fn set_averaging_flag(&mut self, flag:bool) {
		self.solution.set_averaging_flag(flag);
	}

	/// Snapshot of the current solution for the status aggregator.
	pub fn monitor(&self) -> MonitorPvt {
		MonitorPvt{
			rx_time: if self.solution.valid { self.solution.utc_time_s } else { -1.0 },
			tow_at_current_symbol_ms: 0,
			latitude_deg: self.solution.geodetic.latitude_deg,
			longitude_deg: self.solution.geodetic.longitude_deg,
			height_m: self.solution.geodetic.height_m,
			valid_observations: self.solution.sats_used }
	}

	fn tropo_delay_m(&self, est_ecef:(f64, f64, f64), sv_pos:(f64, f64, f64)) -> f64 {
		let (geo, _) = cart2geo(est_ecef.0, est_ecef.1, est_ecef.2, Ellipsoid::Wgs84);
		let (el, _az) = geodesy::elevation_azimuth(est_ecef, sv_pos);
		let t = &self.config.tropo;
		orbital::tropo::tropospheric_delay_m(el.sin(), geo.height_m.max(0.0)/1000.0,
			t.pressure_mb, t.temperature_k, t.humidity_pct,
			t.height_pressure_km, t.height_temperature_km, t.height_humidity_km)
	}

	fn build_observations(&self, channels:&HashMap<i32, ChannelSample>, store:&NavDataStore,
		est:Option<(f64, f64, f64)>) -> (Vec<Observation>, Option<u16>, f64) {

		let mut obs:Vec<Observation> = Vec::with_capacity(channels.len());
		let mut week:Option<u16> = None;
		let mut latest_tow_s:f64 = 0.0;

		for rec in channels.values() {
			if !rec.flag_valid_pseudorange || !rec.flag_valid_word {
				continue;
			}
			let eph = match store.ephemeris(rec.sat) {
				Some(e) => e,
				None => {
					debug!("no ephemeris for {}, channel {} left out of the fix", rec.sat, rec.channel_id);
					continue;
				},
			};

			let tow_s = (rec.tow_at_current_symbol_ms as f64) / 1000.0;
			let clock_s = eph.clock_correction(tow_s);
			let (sv_pos, sv_vel) = eph.position_and_velocity(tow_s - clock_s);

			let tropo_m = match est {
				Some(p) => self.tropo_delay_m(p, sv_pos),
				None => 0.0,
			};
			let pseudorange_m = rec.pseudorange_m
				+ SPEED_OF_LIGHT_M_S*(clock_s - eph.t_gd)
				- tropo_m;

			// Doppler to range rate on the constellation's carrier
			let lambda = SPEED_OF_LIGHT_M_S / orbital::carrier_freq_hz(rec.sat.constellation);
			let pseudorange_rate_m_s = -rec.carrier_doppler_hz * lambda;

			obs.push(Observation{
				sat: rec.sat,
				pseudorange_m,
				pseudorange_rate_m_s,
				sv_pos_ecef: sv_pos,
				sv_vel_ecef: sv_vel });

			week = week.or(Some(eph.week_number));
			if tow_s > latest_tow_s { latest_tow_s = tow_s; }
		}

		(obs, week, latest_tow_s)
	}

	/// Runs one PVT epoch.  Returns the validity of the new solution;
	/// an invalid epoch leaves every positional field untouched.
	pub fn compute(&mut self, channels:&HashMap<i32, ChannelSample>, store:&NavDataStore) -> bool {
		let est = if self.solution.valid { Some(self.solution.rx_pos_ecef) } else { None };
		let (obs, week, tow_s) = self.build_observations(channels, store, est);

		if obs.len() < MIN_SATELLITES {
			debug!("{} usable satellites, {} required: no fix this epoch", obs.len(), MIN_SATELLITES);
			self.solution.valid = false;
			return false;
		}

		let x0 = match est {
			Some(p) => Vector4::new(p.0, p.1, p.2, self.solution.clock_offset_s*SPEED_OF_LIGHT_M_S),
			None => Vector4::zeros(),
		};

		let fix = match solve_position_and_time(&obs, x0) {
			Ok(f) => f,
			Err(e) => {
				debug!("position solve failed: {}", e);
				self.solution.valid = false;
				return false;
			},
		};

		// A cold start solved without atmospheric corrections; redo the
		// preparation from the fresh estimate so the troposphere counts
		let fix = if est.is_none() {
			let (obs2, _, _) = self.build_observations(channels, store, Some(fix.pos_ecef));
			match solve_position_and_time(&obs2, Vector4::new(fix.pos_ecef.0, fix.pos_ecef.1, fix.pos_ecef.2, fix.clock_bias_m)) {
				Ok(f) => f,
				Err(_) => fix,
			}
		} else {
			fix
		};

		let (geodetic, converged) = cart2geo(fix.pos_ecef.0, fix.pos_ecef.1, fix.pos_ecef.2, self.config.ellipsoid);
		if !converged {
			warn!("geodetic conversion did not converge, using last iterate");
		}

		self.solution.rx_pos_ecef = fix.pos_ecef;
		self.solution.clock_offset_s = fix.clock_bias_m / SPEED_OF_LIGHT_M_S;
		self.solution.geodetic = geodetic;
		self.solution.dop = dop_from_geometry(&fix.q, &geodetic);
		self.solution.sats_used = obs.len();

		match solve_velocity(&obs, fix.pos_ecef) {
			Ok((vel, drift_m_s)) => {
				self.solution.rx_vel_ecef = vel;
				self.solution.clock_drift_ppm = drift_m_s / SPEED_OF_LIGHT_M_S * 1.0e6;
			},
			Err(e) => {
				debug!("velocity solve failed: {}", e);
				self.solution.rx_vel_ecef = (0.0, 0.0, 0.0);
				self.solution.clock_drift_ppm = 0.0;
			},
		}

		if let Some(week) = week {
			let utc_offset = store.utc().map(|u| u.offset_s(tow_s)).unwrap_or(0.0);
			self.solution.utc_time_s = gps_time_to_unix_s(week, tow_s, self.config.pre_2009_file, utc_offset);
		}

		self.solution.push_geodetic(geodetic);
		self.solution.perform_pos_averaging();
		self.solution.valid = true;
		true
	}

}
