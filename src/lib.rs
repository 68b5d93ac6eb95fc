
//! Navigation core of a software-defined GNSS receiver: per-channel
//! telemetry/navigation-message decoding, a concurrent channel-status
//! aggregator, and a snapshot least-squares PVT engine.
//!
//! The radio front end, correlators and tracking loops live upstream and
//! feed this crate one `ChannelSample` per symbol per channel; output
//! formatting (RINEX, KML, NMEA, ...) and dataflow scheduling live
//! downstream and consume the decoded messages, status snapshots and
//! `PvtSolution` this crate produces.

use std::fmt;

pub mod nav;
pub mod orbital;
pub mod pvt;
pub mod status;
pub mod telemetry;
pub mod types;
pub mod utils;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
	InvalidTelemetryData(&'static str),
	NotEnoughObservations{ have:usize, need:usize },
	SingularGeometry,
	NonFiniteSolution,
	Other(&'static str),
}

impl fmt::Display for Error {

	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::InvalidTelemetryData(s)          => write!(f, "invalid telemetry data: {}", s),
			Error::NotEnoughObservations{have, need} => write!(f, "{} observations available, {} required", have, need),
			Error::SingularGeometry                 => write!(f, "normal-equation matrix is not invertible"),
			Error::NonFiniteSolution                => write!(f, "solution or residual is not finite"),
			Error::Other(s)                         => write!(f, "{}", s),
		}
	}

}

impl std::error::Error for Error {}
