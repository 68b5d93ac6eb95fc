
//! GPS LNAV message assembly: subframes 1 through 3 with a matching
//! issue-of-data make an ephemeris; subframe 4 page 18 carries the
//! ionospheric and UTC parameters.

use std::f64::consts;

use crate::Error;
use crate::orbital::Ephemeris;
use crate::telemetry::DecodedWord;
use crate::telemetry::gps_l1ca::subframe::{self, SubframeBody, Subframe1, Subframe2, Subframe3};
use crate::types::{Constellation, SatelliteId};

use super::{IonoModel, MessageAssembler, UtcModel};

pub struct GpsLnavAssembler {
	sat:SatelliteId,
	last_sf1:Option<Subframe1>,
	last_sf2:Option<Subframe2>,
	last_sf3:Option<Subframe3>,
	ready_ephemeris:Option<Ephemeris>,
	ready_iono:Option<IonoModel>,
	ready_utc:Option<UtcModel>,
}

impl GpsLnavAssembler {

	pub fn new(sat:SatelliteId) -> Self {
		Self{ sat,
			last_sf1: None, last_sf2: None, last_sf3: None,
			ready_ephemeris: None, ready_iono: None, ready_utc: None }
	}

	// A subframe 3 completes the set; the three subframes must agree on
	// the issue-of-data or they straddle an ephemeris update
	fn try_complete_ephemeris(&mut self) {
		if let (Some(sf1), Some(sf2), Some(sf3)) = (&self.last_sf1, &self.last_sf2, &self.last_sf3) {
			if (sf1.iodc % 256) as u8 == sf2.iode && sf2.iode == sf3.iode {
				self.ready_ephemeris = Some(Ephemeris{
					sat: self.sat,
					week_number: sf1.week_number,
					iode: sf2.iode,
					iodc: sf1.iodc,
					t_oe: sf2.t_oe,
					t_oc: sf1.t_oc,
					sqrt_a: sf2.sqrt_a,
					e: sf2.e,
					m0: sf2.m0 * consts::PI,
					delta_n: sf2.delta_n * consts::PI,
					omega: sf3.omega * consts::PI,
					omega0: sf3.omega0 * consts::PI,
					omega_dot: sf3.omega_dot * consts::PI,
					i0: sf3.i0 * consts::PI,
					idot: sf3.idot * consts::PI,
					cuc: sf2.cuc, cus: sf2.cus,
					crc: sf3.crc, crs: sf2.crs,
					cic: sf3.cic, cis: sf3.cis,
					a_f0: sf1.a_f0, a_f1: sf1.a_f1, a_f2: sf1.a_f2,
					t_gd: sf1.t_gd,
					sv_health: sf1.sv_health,
					ura_index: sf1.ura_index,
					fit_interval: sf2.fit_interval });
			}
		}
	}

}

impl MessageAssembler for GpsLnavAssembler {

	fn feed(&mut self, word:&DecodedWord) -> Result<(), Error> {
		let sf = subframe::decode(&word.bits)?;
		match sf.body {
			SubframeBody::Subframe1(body) => self.last_sf1 = Some(body),
			SubframeBody::Subframe2(body) => self.last_sf2 = Some(body),
			SubframeBody::Subframe3(body) => {
				self.last_sf3 = Some(body);
				self.try_complete_ephemeris();
			},
			SubframeBody::Subframe4(body) => {
				if let Some(page) = body.page18 {
					self.ready_iono = Some(IonoModel{
						constellation: Constellation::Gps,
						alpha0: page.alpha0, alpha1: page.alpha1, alpha2: page.alpha2, alpha3: page.alpha3,
						beta0: page.beta0, beta1: page.beta1, beta2: page.beta2, beta3: page.beta3 });
					self.ready_utc = Some(UtcModel{
						constellation: Constellation::Gps,
						a0: page.a0, a1: page.a1,
						t_ot: page.t_ot, wn_t: page.wn_t,
						delta_t_ls: page.delta_t_ls,
						wn_lsf: page.wn_lsf, dn: page.dn,
						delta_t_lsf: page.delta_t_lsf });
				}
			},
			SubframeBody::Subframe5 => {},
		}
		Ok(())
	}

	fn take_ephemeris(&mut self) -> Option<Ephemeris> { self.ready_ephemeris.take() }
	fn take_iono(&mut self) -> Option<IonoModel> { self.ready_iono.take() }
	fn take_utc(&mut self) -> Option<UtcModel> { self.ready_utc.take() }

	fn reset(&mut self, sat:SatelliteId) { *self = Self::new(sat); }

}
