
//! Navigation messages assembled from decoded telemetry words, the
//! per-constellation assembler contract and the store the PVT engine
//! reads from.
//!
//! A message only becomes ready once every subframe/page it needs has
//! been received with a matching issue-of-data and passed validation;
//! taking a ready message clears the assembler's ready state, so each
//! completed message is observed exactly once.

use std::collections::HashMap;
use std::f64::consts;
use std::sync::mpsc::Receiver;

use serde::{Serialize, Deserialize};

use crate::Error;
use crate::orbital::Ephemeris;
use crate::telemetry::DecodedWord;
use crate::types::{Constellation, SatelliteId};

pub mod gps_lnav;

/// Klobuchar broadcast ionospheric model, eight coefficients.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct IonoModel {
	pub constellation:Constellation,
	pub alpha0:f64, pub alpha1:f64, pub alpha2:f64, pub alpha3:f64,
	pub beta0:f64,  pub beta1:f64,  pub beta2:f64,  pub beta3:f64,
}

impl IonoModel {

	/// Single-frequency ionospheric group delay in seconds, from the
	/// IS-GPS-200 Figure 20-4 algorithm.  Latitude, longitude and the
	/// look angles are in radians; `t` is the GPS time of week.
	pub fn delay_s(&self, lat_rad:f64, lon_rad:f64, elevation_rad:f64, azimuth_rad:f64, t:f64) -> f64 {
		// The broadcast algorithm mixes semicircles and radians
		let el_sc = elevation_rad / consts::PI;
		let mut phi_u = lat_rad / consts::PI;
		let mut lam_u = lon_rad / consts::PI;
		if phi_u > 0.5  { phi_u = 1.0 - phi_u;  lam_u -= 1.0; }
		if phi_u < -0.5 { phi_u = -1.0 - phi_u; lam_u -= 1.0; }
		if lam_u > 1.0  { lam_u -= 2.0; }
		if lam_u < -1.0 { lam_u += 2.0; }

		let psi = 0.0137/(el_sc + 0.11) - 0.022;
		let phi_i = (phi_u + psi*azimuth_rad.cos()).max(-0.416).min(0.416);
		let lam_i = lam_u + psi*azimuth_rad.sin()/(phi_i*consts::PI).cos();
		let phi_m = phi_i + 0.064*((lam_i*consts::PI) - 1.617).cos();

		let t_lcl = {
			let t = 4.32e4*lam_i + t;
			let t = t % 86400.0;
			if t < 0.0 { t + 86400.0 } else { t }
		};

		let f_slant = 1.0 + 16.0*(0.53 - el_sc).powi(3);
		let per = (self.beta0 + self.beta1*phi_m + self.beta2*phi_m.powi(2) + self.beta3*phi_m.powi(3)).max(72000.0);
		let amp = (self.alpha0 + self.alpha1*phi_m + self.alpha2*phi_m.powi(2) + self.alpha3*phi_m.powi(3)).max(0.0);
		let x = 2.0*consts::PI*(t_lcl - 50400.0) / per;

		if x.abs() < 1.57 {
			f_slant * (5.0e-9 + amp*(1.0 - x.powi(2)/2.0 + x.powi(4)/24.0))
		} else {
			f_slant * 5.0e-9
		}
	}

}

/// Broadcast UTC conversion parameters.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct UtcModel {
	pub constellation:Constellation,
	pub a0:f64,
	pub a1:f64,
	pub t_ot:f64,
	pub wn_t:u8,
	pub delta_t_ls:i8,
	pub wn_lsf:u8,
	pub dn:u8,
	pub delta_t_lsf:i8,
}

impl UtcModel {

	/// System-time minus UTC, in seconds, at the given time of week.
	pub fn offset_s(&self, tow_s:f64) -> f64 {
		self.delta_t_ls as f64 + self.a0 + self.a1*(tow_s - self.t_ot)
	}

}

#[derive(Debug, Clone)]
pub enum NavMessage {
	Ephemeris(Ephemeris),
	Ionosphere(IonoModel),
	Utc(UtcModel),
}

/// Word-to-message layer of one constellation's broadcast protocol.
/// Implementations hold partial subframes/pages between calls; `feed`
/// rejects undecodable payloads as values, never by panicking.
pub trait MessageAssembler {
	fn feed(&mut self, word:&DecodedWord) -> Result<(), Error>;
	fn take_ephemeris(&mut self) -> Option<Ephemeris>;
	fn take_iono(&mut self) -> Option<IonoModel>;
	fn take_utc(&mut self) -> Option<UtcModel>;
	fn reset(&mut self, sat:SatelliteId);
}

/// Validated navigation data, keyed by satellite, as delivered by the
/// decoders.  The PVT engine reads this; output formatters may too.
#[derive(Debug, Default)]
pub struct NavDataStore {
	ephemerides:HashMap<SatelliteId, Ephemeris>,
	iono:Option<IonoModel>,
	utc:Option<UtcModel>,
}

impl NavDataStore {

	pub fn new() -> Self { Self::default() }

	pub fn insert(&mut self, msg:NavMessage) {
		match msg {
			NavMessage::Ephemeris(eph) => { self.ephemerides.insert(eph.sat, eph); },
			NavMessage::Ionosphere(iono) => self.iono = Some(iono),
			NavMessage::Utc(utc) => self.utc = Some(utc),
		}
	}

	/// Pulls every message currently queued on the decoder channel.
	pub fn drain(&mut self, rx:&Receiver<NavMessage>) -> usize {
		let mut n = 0;
		while let Ok(msg) = rx.try_recv() {
			self.insert(msg);
			n += 1;
		}
		n
	}

	pub fn ephemeris(&self, sat:SatelliteId) -> Option<&Ephemeris> { self.ephemerides.get(&sat) }
	pub fn iono(&self) -> Option<&IonoModel> { self.iono.as_ref() }
	pub fn utc(&self) -> Option<&UtcModel> { self.utc.as_ref() }
	pub fn ephemeris_count(&self) -> usize { self.ephemerides.len() }

}
