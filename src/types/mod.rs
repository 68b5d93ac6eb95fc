
//! Data records shared by every stage of the navigation core.

use std::fmt;

use num_complex::Complex;
use serde::{Serialize, Deserialize};

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Constellation {
	Gps,
	Galileo,
	Beidou,
	Glonass,
}

impl Constellation {

	pub fn letter(&self) -> char {
		match self {
			Constellation::Gps     => 'G',
			Constellation::Galileo => 'E',
			Constellation::Beidou  => 'C',
			Constellation::Glonass => 'R',
		}
	}

}

/// Constellation plus PRN (or orbital slot, for FDMA systems).
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SatelliteId {
	pub constellation:Constellation,
	pub prn:u8,
}

impl SatelliteId {

	pub fn new(constellation:Constellation, prn:u8) -> Self { Self{ constellation, prn } }

}

impl fmt::Display for SatelliteId {

	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}{:02}", self.constellation.letter(), self.prn)
	}

}

/// Per-channel, per-epoch tracking output; one of these arrives from the
/// tracking collaborator for every symbol of every active channel.
///
/// The TOW fields are meaningless unless `flag_valid_word` is set, and a
/// record with `flag_valid_pseudorange` false must never contribute to a
/// fix.  Records are always passed by value; nothing downstream ever
/// holds a live reference into a channel.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct ChannelSample {
	pub channel_id:i32,
	pub sat:SatelliteId,
	pub prompt:Complex<f64>,
	pub carrier_phase_rads:f64,
	pub carrier_doppler_hz:f64,
	pub code_phase_samples:f64,
	pub rx_time:f64,
	pub pseudorange_m:f64,
	pub tow_at_current_symbol_ms:u32,
	pub flag_valid_pseudorange:bool,
	pub flag_valid_word:bool,
	pub flag_valid_tracking:bool,
	pub sample_counter:u64,
}

impl ChannelSample {

	pub fn new(channel_id:i32, sat:SatelliteId) -> Self {
		Self{ channel_id, sat,
			prompt: Complex::new(0.0, 0.0),
			carrier_phase_rads: 0.0,
			carrier_doppler_hz: 0.0,
			code_phase_samples: 0.0,
			rx_time: 0.0,
			pseudorange_m: 0.0,
			tow_at_current_symbol_ms: 0,
			flag_valid_pseudorange: false,
			flag_valid_word: false,
			flag_valid_tracking: false,
			sample_counter: 0 }
	}

}

/// Compact cross-module PVT status record, supplied by the receiver's
/// monitoring collaborator and stored wholesale in the status aggregator.
/// `rx_time` is -1.0 until the first PVT fix is available.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct MonitorPvt {
	pub rx_time:f64,
	pub tow_at_current_symbol_ms:u32,
	pub latitude_deg:f64,
	pub longitude_deg:f64,
	pub height_m:f64,
	pub valid_observations:usize,
}

impl Default for MonitorPvt {

	fn default() -> Self {
		Self{ rx_time: -1.0, tow_at_current_symbol_ms: 0,
			latitude_deg: 0.0, longitude_deg: 0.0, height_m: 0.0,
			valid_observations: 0 }
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn satellite_labels_read_like_rinex() {
		assert_eq!(SatelliteId::new(Constellation::Gps, 5).to_string(), "G05");
		assert_eq!(SatelliteId::new(Constellation::Galileo, 21).to_string(), "E21");
		assert_eq!(SatelliteId::new(Constellation::Glonass, 3).to_string(), "R03");
	}

	// Sample records cross process boundaries to external monitors as
	// JSON, so the wire names are part of the interface
	#[test]
	fn channel_sample_serializes_with_stable_field_names() {
		let mut rec = ChannelSample::new(4, SatelliteId::new(Constellation::Beidou, 11));
		rec.pseudorange_m = 2.3e7;
		rec.flag_valid_pseudorange = true;

		let json = serde_json::to_string(&rec).unwrap();
		assert!(json.contains("\"channel_id\":4"));
		assert!(json.contains("\"flag_valid_pseudorange\":true"));

		let back:ChannelSample = serde_json::from_str(&json).unwrap();
		assert_eq!(back.channel_id, 4);
		assert_eq!(back.sat, SatelliteId::new(Constellation::Beidou, 11));
		assert_eq!(back.pseudorange_m, 2.3e7);
	}

}
