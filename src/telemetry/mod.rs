
//! Per-channel telemetry/navigation-message decoding.
//!
//! One `TelemetryDecoder` instance serves one tracking channel.  The
//! constellation variant supplies the frame codec (symbol-to-word FEC
//! layer) and the message assembler (word-to-message layer); the decoder
//! itself owns the parts every variant shares: TOW projection and
//! consistency checking, the loss-of-lock alarm, half-cycle polarity
//! compensation and the optional binary dump.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info, warn};

use crate::nav::{MessageAssembler, NavMessage};
use crate::types::{ChannelSample, Constellation, SatelliteId};

pub mod gps_l1ca;

const WEEK_MS:u64 = 604_800_000;

/// One FEC-decoded unit of the navigation protocol.  `valid` is set only
/// when the payload passed the protocol's error-detection check; the TOW
/// fields are already scaled to milliseconds by the codec.
#[derive(Debug, Clone)]
pub struct DecodedWord {
	pub bits:Vec<bool>,
	pub valid:bool,
	pub inverted:bool,
	pub delay_symbols:u32,
	pub tow_ms:u32,
	pub tow_at_preamble_ms:u32,
}

/// Symbol-to-word layer of one constellation's broadcast protocol.
pub trait FrameCodec {
	/// Consumes one hard-decision symbol; yields a word whenever frame
	/// sync and error detection allow one to complete.
	fn push_symbol(&mut self, symbol:bool) -> Option<DecodedWord>;
	fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecoderState {
	Searching,
	Locked,
	AlarmSent,
}

/// Per-constellation decoding constants.
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
	pub constellation:Constellation,
	pub symbol_period_ms:u32,
	pub alarm_threshold_symbols:u64,
}

/// Resolved once at startup and handed to each decoder by value.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
	pub dump:bool,
	pub dump_dir:PathBuf,
}

impl Default for DecoderConfig {

	fn default() -> Self { Self{ dump: false, dump_dir: PathBuf::from(".") } }

}

/// Fire-and-forget notifications to the tracking collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
	TelemetryLost{ channel_id:i32, sat:SatelliteId },
}

struct DumpWriter {
	w:BufWriter<File>,
}

impl DumpWriter {

	fn open(path:&Path) -> io::Result<Self> {
		let file = OpenOptions::new().create(true).append(true).open(path)?;
		Ok(Self{ w: BufWriter::new(file) })
	}

	// Fixed 24-byte record: TOW at symbol [s], tracking sample counter,
	// TOW at preamble [s]
	fn write_record(&mut self, tow_s:f64, sample_counter:u64, tow_at_preamble_s:f64) -> io::Result<()> {
		self.w.write_f64::<LittleEndian>(tow_s)?;
		self.w.write_u64::<LittleEndian>(sample_counter)?;
		self.w.write_f64::<LittleEndian>(tow_at_preamble_s)?;
		Ok(())
	}

}

pub struct TelemetryDecoder<C:FrameCodec, A:MessageAssembler> {
	spec:VariantSpec,
	config:DecoderConfig,
	channel_id:i32,
	sat:SatelliteId,
	codec:C,
	assembler:A,
	symbols_processed:u64,
	last_valid_symbol:u64,
	tow_at_current_symbol_ms:u32,
	tow_at_preamble_ms:u32,
	flag_valid_word:bool,
	sent_alarm:bool,
	flag_half_cycle:bool,
	dump:Option<DumpWriter>,
	nav_tx:Sender<NavMessage>,
	event_tx:Sender<TelemetryEvent>,
}

impl<C:FrameCodec, A:MessageAssembler> TelemetryDecoder<C, A> {

	pub fn new(spec:VariantSpec, codec:C, assembler:A, config:DecoderConfig, sat:SatelliteId,
		nav_tx:Sender<NavMessage>, event_tx:Sender<TelemetryEvent>) -> Self {
		Self{ spec, config, channel_id: 0, sat, codec, assembler,
			symbols_processed: 0, last_valid_symbol: 0,
			tow_at_current_symbol_ms: 0, tow_at_preamble_ms: 0,
			flag_valid_word: false, sent_alarm: false, flag_half_cycle: false,
			dump: None, nav_tx, event_tx }
	}

	pub fn channel_id(&self) -> i32 { self.channel_id }
	pub fn satellite(&self) -> SatelliteId { self.sat }
	pub fn tow_at_current_symbol_ms(&self) -> u32 { self.tow_at_current_symbol_ms }

	pub fn state(&self) -> DecoderState {
		if self.sent_alarm {
			DecoderState::AlarmSent
		} else if self.flag_valid_word {
			DecoderState::Locked
		} else {
			DecoderState::Searching
		}
	}

	/// Assigns the channel id and, when dumping is enabled, opens the
	/// per-channel diagnostic file.  A dump that cannot be opened is a
	/// warning, never an error: decoding proceeds without it.
	pub fn set_channel(&mut self, channel_id:i32) {
		self.channel_id = channel_id;
		if self.config.dump && self.dump.is_none() {
			let path = self.config.dump_dir.join(format!("telemetry_{}.dat", channel_id));
			match DumpWriter::open(&path) {
				Ok(w)  => self.dump = Some(w),
				Err(e) => warn!("channel {}: cannot open telemetry dump {:?}: {}", channel_id, path, e),
			}
		}
	}

	/// Channel indices are reused as satellites rise and set; nothing
	/// decoded for the previous satellite may survive the reassignment.
	pub fn set_satellite(&mut self, sat:SatelliteId) {
		debug!("channel {}: satellite set to {}", self.channel_id, sat);
		self.sat = sat;
		self.codec.reset();
		self.assembler.reset(sat);
		self.tow_at_current_symbol_ms = 0;
		self.tow_at_preamble_ms = 0;
		self.flag_valid_word = false;
		self.sent_alarm = false;
		self.flag_half_cycle = false;
	}

	pub fn reset(&mut self) {
		self.last_valid_symbol = self.symbols_processed;
		self.tow_at_current_symbol_ms = 0;
		self.flag_valid_word = false;
		self.sent_alarm = false;
		debug!("channel {}: telemetry decoder reset for {}", self.channel_id, self.sat);
	}

	/// Processes one tracking epoch.  Returns the annotated sample record
	/// when the TOW is trustworthy; the caller forwards it to the status
	/// aggregator.
	pub fn push(&mut self, mut rec:ChannelSample) -> Option<ChannelSample> {
		self.symbols_processed += 1;

		if !self.sent_alarm && self.symbols_processed - self.last_valid_symbol > self.spec.alarm_threshold_symbols {
			let event = TelemetryEvent::TelemetryLost{ channel_id: self.channel_id, sat: self.sat };
			if self.event_tx.send(event).is_err() {
				debug!("channel {}: telemetry-lost alarm dropped, no tracking listener", self.channel_id);
			}
			self.sent_alarm = true;
		}

		let symbol:bool = rec.prompt.re > 0.0;
		match self.codec.push_symbol(symbol) {
			Some(ref word) if word.valid => {
				self.flag_half_cycle = word.inverted;
				self.feed_assembler(word);

				// Project the embedded TOW forward to the current symbol
				// and check it against the running count
				let projected:u32 = ((word.tow_ms as u64
					+ (word.delay_symbols as u64)*(self.spec.symbol_period_ms as u64)) % WEEK_MS) as u32;
				let last = self.tow_at_current_symbol_ms;
				self.tow_at_preamble_ms = word.tow_at_preamble_ms;
				self.tow_at_current_symbol_ms = projected;

				if last != 0 && (projected as i64 - last as i64).abs() > self.spec.symbol_period_ms as i64 {
					warn!("channel {}: TOW update {} ms does not match the running symbol count",
						self.channel_id, projected as i64 - last as i64);
					self.tow_at_current_symbol_ms = 0;
					self.flag_valid_word = false;
				} else {
					self.last_valid_symbol = self.symbols_processed;
					self.flag_valid_word = true;
					self.sent_alarm = false;
				}
			},
			_ => {
				// No new word (or one that failed its check): carry the
				// TOW forward one symbol as long as tracking still holds
				if self.flag_valid_word {
					self.tow_at_current_symbol_ms =
						(((self.tow_at_current_symbol_ms as u64) + self.spec.symbol_period_ms as u64) % WEEK_MS) as u32;
					if !rec.flag_valid_tracking {
						self.flag_valid_word = false;
					}
				}
			},
		}

		if !self.flag_valid_word {
			return None;
		}

		if self.flag_half_cycle {
			// Compensate the Costas-loop 180 degree ambiguity so the
			// carrier phase stays continuous downstream
			rec.carrier_phase_rads += std::f64::consts::PI;
		}
		rec.tow_at_current_symbol_ms = self.tow_at_current_symbol_ms;
		rec.flag_valid_word = true;

		if let Some(dump) = &mut self.dump {
			let tow_s = (self.tow_at_current_symbol_ms as f64) / 1000.0;
			let preamble_s = (self.tow_at_preamble_ms as f64) / 1000.0;
			if let Err(e) = dump.write_record(tow_s, rec.sample_counter, preamble_s) {
				warn!("channel {}: telemetry dump write failed: {}", self.channel_id, e);
			}
		}

		Some(rec)
	}

	fn feed_assembler(&mut self, word:&DecodedWord) {
		if let Err(e) = self.assembler.feed(word) {
			debug!("channel {}: discarded undecodable page from {}: {}", self.channel_id, self.sat, e);
			return;
		}
		while let Some(eph) = self.assembler.take_ephemeris() {
			info!("new {:?} ephemeris received on channel {} from {}", self.spec.constellation, self.channel_id, eph.sat);
			if self.nav_tx.send(NavMessage::Ephemeris(eph)).is_err() {
				debug!("channel {}: navigation data store is gone, ephemeris dropped", self.channel_id);
			}
		}
		while let Some(iono) = self.assembler.take_iono() {
			info!("new {:?} ionospheric model received on channel {}", self.spec.constellation, self.channel_id);
			if self.nav_tx.send(NavMessage::Ionosphere(iono)).is_err() {
				debug!("channel {}: navigation data store is gone, iono model dropped", self.channel_id);
			}
		}
		while let Some(utc) = self.assembler.take_utc() {
			info!("new {:?} UTC model received on channel {}", self.spec.constellation, self.channel_id);
			if self.nav_tx.send(NavMessage::Utc(utc)).is_err() {
				debug!("channel {}: navigation data store is gone, UTC model dropped", self.channel_id);
			}
		}
	}

}
