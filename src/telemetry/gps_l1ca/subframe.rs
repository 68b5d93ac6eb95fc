
//! Field extraction for the five LNAV subframes, operating on the 240
//! recovered data bits.  Scale factors follow IS-GPS-200 Table 20-I;
//! angular fields stay in semicircles here and are converted to radians
//! by the message assembler.

use serde::{Serialize, Deserialize};

use crate::Error;
use crate::utils::bits;

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe {
	pub tow_truncated:u32,
	pub subframe_id:u8,
	pub body:SubframeBody,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub enum SubframeBody {
	Subframe1(Subframe1),
	Subframe2(Subframe2),
	Subframe3(Subframe3),
	Subframe4(Subframe4),
	Subframe5,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe1 {
	pub week_number:u16,
	pub ura_index:u8,
	pub sv_health:u8,
	pub iodc:u16,
	pub t_gd:f64,
	pub t_oc:f64,
	pub a_f2:f64,
	pub a_f1:f64,
	pub a_f0:f64,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe2 {
	pub iode:u8,
	pub crs:f64,
	pub delta_n:f64,       // [semicircles/s]
	pub m0:f64,            // [semicircles]
	pub cuc:f64,
	pub e:f64,
	pub cus:f64,
	pub sqrt_a:f64,
	pub t_oe:f64,
	pub fit_interval:bool,
	pub aodo:u8,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe3 {
	pub cic:f64,
	pub omega0:f64,        // [semicircles]
	pub cis:f64,
	pub i0:f64,            // [semicircles]
	pub crc:f64,
	pub omega:f64,         // [semicircles]
	pub omega_dot:f64,     // [semicircles/s]
	pub iode:u8,
	pub idot:f64,          // [semicircles/s]
}

/// Subframe 4 carries 25 pages; only page 18 (ionospheric and UTC
/// parameters, sv_id 56) is decoded field by field here.
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe4 {
	pub data_id:u8,
	pub sv_id:u8,
	pub page18:Option<Page18>,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Page18 {
	pub alpha0:f64, pub alpha1:f64, pub alpha2:f64, pub alpha3:f64,
	pub beta0:f64,  pub beta1:f64,  pub beta2:f64,  pub beta3:f64,
	pub a1:f64,
	pub a0:f64,
	pub t_ot:f64,
	pub wn_t:u8,
	pub delta_t_ls:i8,
	pub wn_lsf:u8,
	pub dn:u8,
	pub delta_t_lsf:i8,
}

pub fn decode(data:&[bool]) -> Result<Subframe, Error> {
	if data.len() != 240 {
		return Err(Error::InvalidTelemetryData("LNAV subframe payload must be 240 bits"));
	}
	let tow_truncated:u32 = bits::to_u32(&data[24..41])?;
	let subframe_id:u8 = bits::to_u8(&data[43..46])?;

	let body = match subframe_id {
		1 => SubframeBody::Subframe1(decode_subframe1(data)?),
		2 => SubframeBody::Subframe2(decode_subframe2(data)?),
		3 => SubframeBody::Subframe3(decode_subframe3(data)?),
		4 => SubframeBody::Subframe4(decode_subframe4(data)?),
		5 => SubframeBody::Subframe5,
		_ => return Err(Error::InvalidTelemetryData("subframe id outside 1 through 5")),
	};

	Ok(Subframe{ tow_truncated, subframe_id, body })
}

fn decode_subframe1(data:&[bool]) -> Result<Subframe1, Error> {
	Ok(Subframe1{
		week_number: bits::to_u16(&data[48..58])?,
		ura_index:   bits::to_u8(&data[60..64])?,
		sv_health:   bits::to_u8(&data[64..70])?,
		iodc:        bits::to_u16(&[&data[70..72], &data[168..176]].concat())?,
		t_gd:        bits::scaled_signed(&data[160..168], -31)?,
		t_oc:        bits::scaled_unsigned(&data[176..192], 4)?,
		a_f2:        bits::scaled_signed(&data[192..200], -55)?,
		a_f1:        bits::scaled_signed(&data[200..216], -43)?,
		a_f0:        bits::scaled_signed(&data[216..238], -31)?,
	})
}

fn decode_subframe2(data:&[bool]) -> Result<Subframe2, Error> {
	Ok(Subframe2{
		iode:         bits::to_u8(&data[48..56])?,
		crs:          bits::scaled_signed(&data[56..72], -5)?,
		delta_n:      bits::scaled_signed(&data[72..88], -43)?,
		m0:           bits::scaled_signed(&data[88..120], -31)?,
		cuc:          bits::scaled_signed(&data[120..136], -29)?,
		e:            bits::scaled_unsigned(&data[136..168], -33)?,
		cus:          bits::scaled_signed(&data[168..184], -29)?,
		sqrt_a:       bits::scaled_unsigned(&data[184..216], -19)?,
		t_oe:         bits::scaled_unsigned(&data[216..232], 4)?,
		fit_interval: data[232],
		aodo:         bits::to_u8(&data[233..238])?,
	})
}

fn decode_subframe3(data:&[bool]) -> Result<Subframe3, Error> {
	Ok(Subframe3{
		cic:       bits::scaled_signed(&data[48..64], -29)?,
		omega0:    bits::scaled_signed(&data[64..96], -31)?,
		cis:       bits::scaled_signed(&data[96..112], -29)?,
		i0:        bits::scaled_signed(&data[112..144], -31)?,
		crc:       bits::scaled_signed(&data[144..160], -5)?,
		omega:     bits::scaled_signed(&data[160..192], -31)?,
		omega_dot: bits::scaled_signed(&data[192..216], -43)?,
		iode:      bits::to_u8(&data[216..224])?,
		idot:      bits::scaled_signed(&data[224..238], -43)?,
	})
}

fn decode_subframe4(data:&[bool]) -> Result<Subframe4, Error> {
	let data_id:u8 = bits::to_u8(&data[48..50])?;
	let sv_id:u8 = bits::to_u8(&data[50..56])?;

	let page18 = if sv_id == 56 {
		Some(Page18{
			alpha0:      bits::scaled_signed(&data[56..64], -30)?,
			alpha1:      bits::scaled_signed(&data[64..72], -27)?,
			alpha2:      bits::scaled_signed(&data[72..80], -24)?,
			alpha3:      bits::scaled_signed(&data[80..88], -24)?,
			beta0:       bits::scaled_signed(&data[88..96], 11)?,
			beta1:       bits::scaled_signed(&data[96..104], 14)?,
			beta2:       bits::scaled_signed(&data[104..112], 16)?,
			beta3:       bits::scaled_signed(&data[112..120], 16)?,
			a1:          bits::scaled_signed(&data[120..144], -50)?,
			a0:          bits::scaled_signed(&data[144..176], -30)?,
			t_ot:        bits::scaled_unsigned(&data[176..184], 12)?,
			wn_t:        bits::to_u8(&data[184..192])?,
			delta_t_ls:  bits::to_signed(&data[192..200])? as i8,
			wn_lsf:      bits::to_u8(&data[200..208])?,
			dn:          bits::to_u8(&data[208..216])?,
			delta_t_lsf: bits::to_signed(&data[216..224])? as i8,
		})
	} else {
		None
	};

	Ok(Subframe4{ data_id, sv_id, page18 })
}
