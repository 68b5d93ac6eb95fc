
//! The PVT result record, including the trailing window used for
//! position averaging.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};

use super::geodesy::GeodeticPosition;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Default)]
pub struct Dop {
	pub hdop:f64,
	pub vdop:f64,
	pub pdop:f64,
	pub gdop:f64,
}

/// One receiver fix, recomputed per output epoch.  When `valid` is false
/// every positional field still holds the last good value; consumers must
/// gate on the flag.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PvtSolution {
	pub rx_pos_ecef:(f64, f64, f64),
	pub rx_vel_ecef:(f64, f64, f64),
	pub geodetic:GeodeticPosition,
	pub clock_offset_s:f64,
	pub clock_drift_ppm:f64,
	pub utc_time_s:f64,
	pub valid:bool,
	pub sats_used:usize,
	pub dop:Dop,
	flag_averaging:bool,
	averaging_depth:usize,
	history:VecDeque<GeodeticPosition>,
	averaged:Option<GeodeticPosition>,
}

impl PvtSolution {

	pub fn new(averaging_depth:usize, flag_averaging:bool) -> Self {
		Self{
			rx_pos_ecef: (0.0, 0.0, 0.0),
			rx_vel_ecef: (0.0, 0.0, 0.0),
			geodetic: GeodeticPosition::default(),
			clock_offset_s: 0.0,
			clock_drift_ppm: 0.0,
			utc_time_s: 0.0,
			valid: false,
			sats_used: 0,
			dop: Dop::default(),
			flag_averaging,
			averaging_depth,
			history: VecDeque::new(),
			averaged: None }
	}

	pub fn is_averaging(&self) -> bool { self.flag_averaging }
	pub fn set_averaging_flag(&mut self, flag:bool) { self.flag_averaging = flag; }
	pub fn averaging_depth(&self) -> usize { self.averaging_depth }

	pub fn set_averaging_depth(&mut self, depth:usize) {
		self.averaging_depth = depth;
		while self.history.len() > depth { self.history.pop_front(); }
	}

	/// Appends a fix to the trailing window, evicting the oldest entry
	/// once the window is full.
	pub fn push_geodetic(&mut self, pos:GeodeticPosition) {
		self.history.push_back(pos);
		while self.history.len() > self.averaging_depth { self.history.pop_front(); }
	}

	/// Arithmetic mean over whatever the window currently holds.  Does
	/// nothing until at least one fix has arrived since the last reset.
	pub fn perform_pos_averaging(&mut self) {
		if !self.flag_averaging || self.history.is_empty() {
			return;
		}
		let n = self.history.len() as f64;
		let (mut lat, mut lon, mut h) = (0.0, 0.0, 0.0);
		for p in self.history.iter() {
			lat += p.latitude_deg;
			lon += p.longitude_deg;
			h += p.height_m;
		}
		self.averaged = Some(GeodeticPosition{
			latitude_deg: lat/n,
			longitude_deg: lon/n,
			height_m: h/n });
	}

	pub fn averaged(&self) -> Option<GeodeticPosition> { self.averaged }
	pub fn history_len(&self) -> usize { self.history.len() }

	pub fn reset_averaging(&mut self) {
		self.history.clear();
		self.averaged = None;
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	const DEPTH:usize = 5;

	fn fix(lat:f64) -> GeodeticPosition {
		GeodeticPosition{ latitude_deg: lat, longitude_deg: -3.0, height_m: 650.0 }
	}

	#[test]
	fn constant_input_averages_to_itself() {
		let mut sol = PvtSolution::new(DEPTH, true);
		for _ in 0..DEPTH {
			sol.push_geodetic(fix(40.0));
		}
		sol.perform_pos_averaging();

		let avg = sol.averaged().expect("window has samples");
		assert!((avg.latitude_deg - 40.0).abs() < 1.0e-12);
		assert!((avg.longitude_deg - (-3.0)).abs() < 1.0e-12);
		assert!((avg.height_m - 650.0).abs() < 1.0e-9);
	}

	#[test]
	fn window_evicts_oldest_first() {
		let mut sol = PvtSolution::new(DEPTH, true);
		for i in 0..=DEPTH {
			sol.push_geodetic(fix(i as f64));
		}
		assert_eq!(sol.history_len(), DEPTH);

		sol.perform_pos_averaging();
		// 0 was evicted, so the mean covers 1..=5
		let avg = sol.averaged().unwrap();
		assert!((avg.latitude_deg - 3.0).abs() < 1.0e-12);
	}

	#[test]
	fn no_average_before_first_sample() {
		let mut sol = PvtSolution::new(DEPTH, true);
		sol.perform_pos_averaging();
		assert!(sol.averaged().is_none());

		sol.push_geodetic(fix(10.0));
		sol.perform_pos_averaging();
		assert!((sol.averaged().unwrap().latitude_deg - 10.0).abs() < 1.0e-12);

		sol.reset_averaging();
		sol.perform_pos_averaging();
		assert!(sol.averaged().is_none());
	}

	#[test]
	fn flag_toggle_gates_averaging_only() {
		let mut sol = PvtSolution::new(DEPTH, false);
		sol.push_geodetic(fix(40.0));
		sol.perform_pos_averaging();
		assert!(sol.averaged().is_none());

		sol.set_averaging_flag(true);
		sol.perform_pos_averaging();
		assert!(sol.averaged().is_some());
	}

}
