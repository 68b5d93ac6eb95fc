
//! GPS L1 C/A LNAV frame layer: preamble synchronization with polarity
//! recovery, the 32-bit-window Hamming parity check, and subframe
//! accumulation.  One 300-bit subframe yields one `DecodedWord` whose
//! payload is the 240 recovered data bits.

use std::collections::VecDeque;

use crate::telemetry::{DecodedWord, FrameCodec, VariantSpec};
use crate::types::Constellation;
use crate::utils::bits;

pub mod subframe;

pub const PREAMBLE:[bool; 8] = [true, false, false, false, true, false, true, true];

pub const SYMBOL_PERIOD_MS:u32    = 20;
pub const SUBFRAME_SYMBOLS:usize  = 300;
pub const DATA_BITS:usize         = 240;
const WORD_BITS:usize             = 30;
const WEEK_MS:u64                 = 604_800_000;

// Ten subframes with no valid parity before the channel is declared lost
pub const ALARM_THRESHOLD_SYMBOLS:u64 = 10 * SUBFRAME_SYMBOLS as u64;

pub fn variant_spec() -> VariantSpec {
	VariantSpec{
		constellation: Constellation::Gps,
		symbol_period_ms: SYMBOL_PERIOD_MS,
		alarm_threshold_symbols: ALARM_THRESHOLD_SYMBOLS }
}

/// IS-GPS-200 parity equations over one 30-bit word.  `last_d29` and
/// `last_d30` are the final two transmitted bits of the preceding word.
fn parity_check(word:&[bool], last_d29:bool, last_d30:bool) -> bool {
	if word.len() != WORD_BITS { return false; }

	let d:Vec<bool> = word.iter().take(24).map(|b| b ^ last_d30).collect();

	let parity:[bool; 6] = [
		last_d29 ^ d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[5] ^ d[9]  ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[16] ^ d[17] ^ d[19] ^ d[22],
		last_d30 ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[6] ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[17] ^ d[18] ^ d[20] ^ d[23],
		last_d29 ^ d[0] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[7]  ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[18] ^ d[19] ^ d[21],
		last_d30 ^ d[1] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[8]  ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[19] ^ d[20] ^ d[22],
		last_d30 ^ d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[6] ^ d[8]  ^ d[9]  ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[17] ^ d[20] ^ d[21] ^ d[23],
		last_d29 ^ d[2] ^ d[4] ^ d[5] ^ d[7] ^ d[8] ^ d[9]  ^ d[10] ^ d[12] ^ d[14] ^ d[18] ^ d[21] ^ d[22] ^ d[23],
	];

	word.iter().skip(24).zip(parity.iter()).all(|(a, b)| a == b)
}

/// Parity-checks all ten words of a subframe and strips the parity bits,
/// undoing the D30 complement each word applies to the next one's data.
fn recover_data(subframe:&[bool]) -> Option<[bool; DATA_BITS]> {
	if subframe.len() != SUBFRAME_SYMBOLS { return None; }

	for w in 0..10 {
		let (d29, d30) = if w == 0 {
			// Word 10 of every subframe ends in 00, so the first word
			// always checks against a zero parity state
			(false, false)
		} else {
			(subframe[30*w - 2], subframe[30*w - 1])
		};
		if !parity_check(&subframe[30*w..30*(w + 1)], d29, d30) { return None; }
	}

	let mut data = [false; DATA_BITS];
	for bit in 0..24 { data[bit] = subframe[bit]; }
	for w in 1..10 {
		for bit in 0..24 { data[24*w + bit] = subframe[30*w + bit] ^ subframe[30*w - 1]; }
	}
	Some(data)
}

enum Phase {
	Sync{ window:VecDeque<bool> },
	Framed{ inverted:bool, collected:Vec<bool> },
}

pub struct GpsL1CaCodec {
	phase:Phase,
}

impl GpsL1CaCodec {

	pub fn new() -> Self { Self{ phase: Phase::Sync{ window: VecDeque::new() } } }

}

impl Default for GpsL1CaCodec {

	fn default() -> Self { Self::new() }

}

impl FrameCodec for GpsL1CaCodec {

	fn push_symbol(&mut self, symbol:bool) -> Option<DecodedWord> {
		match &mut self.phase {
			Phase::Sync{ window } => {
				window.push_back(symbol);
				while window.len() > WORD_BITS { window.pop_front(); }
				if window.len() == WORD_BITS {
					// The preamble pattern also shows up in payload data,
					// so a sync candidate must carry a whole valid word
					for &inverted in [false, true].iter() {
						let word:Vec<bool> = window.iter().map(|b| b ^ inverted).collect();
						if word[..8] == PREAMBLE && parity_check(&word, false, false) {
							self.phase = Phase::Framed{ inverted, collected: word };
							break;
						}
					}
				}
				None
			},
			Phase::Framed{ inverted, collected } => {
				collected.push(symbol ^ *inverted);
				if collected.len() < SUBFRAME_SYMBOLS { return None; }

				let inv = *inverted;
				let frame:Vec<bool> = std::mem::replace(collected, Vec::with_capacity(SUBFRAME_SYMBOLS));
				// Every subframe must still be preamble-aligned; losing the
				// preamble means bit sync is gone, not just one bad word
				let recovered = if frame[..8] == PREAMBLE { recover_data(&frame) } else { None };
				match recovered {
					Some(data) => Some(word_from_subframe(&data, inv)),
					None => {
						self.phase = Phase::Sync{ window: VecDeque::new() };
						Some(DecodedWord{ bits: Vec::new(), valid: false, inverted: inv,
							delay_symbols: 0, tow_ms: 0, tow_at_preamble_ms: 0 })
					},
				}
			},
		}
	}

	fn reset(&mut self) {
		self.phase = Phase::Sync{ window: VecDeque::new() };
	}

}

fn word_from_subframe(data:&[bool; DATA_BITS], inverted:bool) -> DecodedWord {
	// The handover word carries the TOW of the *next* subframe boundary,
	// which is one symbol period past the symbol that completed this one
	let tow_truncated:u64 = bits::to_u32(&data[24..41]).unwrap_or(0) as u64;
	let boundary_ms:u64 = (tow_truncated * 6000) % WEEK_MS;
	DecodedWord{
		bits: data.to_vec(),
		valid: true,
		inverted,
		delay_symbols: 0,
		tow_ms: ((boundary_ms + WEEK_MS - SYMBOL_PERIOD_MS as u64) % WEEK_MS) as u32,
		tow_at_preamble_ms: ((boundary_ms + WEEK_MS - 6000) % WEEK_MS) as u32,
	}
}

#[cfg(test)]
pub(crate) mod encode {

	//! Bit-exact LNAV subframe encoder used by the decode tests: applies
	//! the D30 complement, generates the six parity bits per word and
	//! solves the handover-word reserved bits so every subframe ends in
	//! 00 the way the broadcast signal does.

	use super::{DATA_BITS, PREAMBLE, SUBFRAME_SYMBOLS};

	fn parity_bits(d:&[bool; 24], last_d29:bool, last_d30:bool) -> [bool; 6] {
		[
			last_d29 ^ d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[5] ^ d[9]  ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[16] ^ d[17] ^ d[19] ^ d[22],
			last_d30 ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[6] ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[17] ^ d[18] ^ d[20] ^ d[23],
			last_d29 ^ d[0] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[7]  ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[18] ^ d[19] ^ d[21],
			last_d30 ^ d[1] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[8]  ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[19] ^ d[20] ^ d[22],
			last_d30 ^ d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[6] ^ d[8]  ^ d[9]  ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[17] ^ d[20] ^ d[21] ^ d[23],
			last_d29 ^ d[2] ^ d[4] ^ d[5] ^ d[7] ^ d[8] ^ d[9]  ^ d[10] ^ d[12] ^ d[14] ^ d[18] ^ d[21] ^ d[22] ^ d[23],
		]
	}

	/// Writes `value` MSB-first into `data[range]`.
	pub fn put_field(data:&mut [bool; DATA_BITS], start:usize, width:usize, value:u64) {
		for i in 0..width {
			data[start + i] = (value >> (width - 1 - i)) & 1 == 1;
		}
	}

	/// 240 data bits with the preamble, truncated TOW and subframe id in
	/// place and everything else zero.
	pub fn base_subframe(tow_truncated:u32, subframe_id:u8) -> [bool; DATA_BITS] {
		let mut data = [false; DATA_BITS];
		for (i, b) in PREAMBLE.iter().enumerate() { data[i] = *b; }
		put_field(&mut data, 24, 17, tow_truncated as u64);
		put_field(&mut data, 43, 3, subframe_id as u64);
		data
	}

	/// Turns 240 data bits into the 300 transmitted bits of one subframe,
	/// starting from parity state 00 and ending in 00.
	pub fn transmit_subframe(data:&[bool; DATA_BITS]) -> [bool; SUBFRAME_SYMBOLS] {
		let mut data = *data;
		let mut out = [false; SUBFRAME_SYMBOLS];
		let (mut d29, mut d30) = (false, false);

		for w in 0..10 {
			let mut d = [false; 24];
			d.copy_from_slice(&data[24*w..24*(w + 1)]);

			if w == 9 {
				// Solve the two reserved bits so parity bits 29-30 of the
				// last word come out zero
				let p = parity_bits(&d, d29, d30);
				let p4_except_d23 = p[4] ^ d[23];
				d[23] = p4_except_d23;
				let p = parity_bits(&d, d29, d30);
				d[22] = d[22] ^ p[5];
				data[24*w + 22] = d[22];
				data[24*w + 23] = d[23];
			}

			for i in 0..24 { out[30*w + i] = d[i] ^ d30; }
			let p = parity_bits(&d, d29, d30);
			for j in 0..6 { out[30*w + 24 + j] = p[j]; }
			d29 = p[4];
			d30 = p[5];
		}
		out
	}

}

#[cfg(test)]
mod tests {

	use crate::telemetry::FrameCodec;
	use super::{encode, GpsL1CaCodec, SUBFRAME_SYMBOLS};

	fn decode_stream(codec:&mut GpsL1CaCodec, symbols:&[bool]) -> Vec<super::DecodedWord> {
		symbols.iter().filter_map(|&s| codec.push_symbol(s)).collect()
	}

	#[test]
	fn two_clean_subframes_decode() {
		let sf1 = encode::transmit_subframe(&encode::base_subframe(1001, 1));
		let sf2 = encode::transmit_subframe(&encode::base_subframe(1002, 2));

		let mut stream:Vec<bool> = vec![false; 17];   // arbitrary lead-in
		stream.extend_from_slice(&sf1);
		stream.extend_from_slice(&sf2);

		let mut codec = GpsL1CaCodec::new();
		let words = decode_stream(&mut codec, &stream);

		assert_eq!(words.len(), 2);
		assert!(words.iter().all(|w| w.valid && !w.inverted));
		assert_eq!(words[0].tow_ms, 1001*6000 - 20);
		assert_eq!(words[1].tow_ms, 1002*6000 - 20);
		assert_eq!(words[0].tow_at_preamble_ms, 1001*6000 - 6000);
	}

	#[test]
	fn inverted_stream_is_recovered_and_flagged() {
		let sf = encode::transmit_subframe(&encode::base_subframe(900, 3));
		let stream:Vec<bool> = sf.iter().map(|b| !b).collect();

		let mut codec = GpsL1CaCodec::new();
		let words = decode_stream(&mut codec, &stream);

		assert_eq!(words.len(), 1);
		assert!(words[0].valid);
		assert!(words[0].inverted);
		assert_eq!(words[0].tow_ms, 900*6000 - 20);
	}

	#[test]
	fn corrupted_word_fails_parity_and_resyncs() {
		let sf_good = encode::transmit_subframe(&encode::base_subframe(500, 1));
		let mut sf_bad = encode::transmit_subframe(&encode::base_subframe(501, 2));
		sf_bad[95] = !sf_bad[95];   // flip one bit inside word 4
		let sf_next = encode::transmit_subframe(&encode::base_subframe(502, 3));

		let mut stream:Vec<bool> = Vec::new();
		stream.extend_from_slice(&sf_good);
		stream.extend_from_slice(&sf_bad);
		stream.extend_from_slice(&sf_next);

		let mut codec = GpsL1CaCodec::new();
		let words = decode_stream(&mut codec, &stream);

		assert_eq!(words.len(), 3);
		assert!(words[0].valid);
		assert!(!words[1].valid);
		assert!(words[2].valid);
		assert_eq!(words[2].tow_ms, 502*6000 - 20);
	}

	#[test]
	fn subframe_length_is_three_hundred() {
		let sf = encode::transmit_subframe(&encode::base_subframe(1, 1));
		assert_eq!(sf.len(), SUBFRAME_SYMBOLS);
	}

}
