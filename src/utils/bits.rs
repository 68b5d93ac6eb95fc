
//! MSB-first bit-slice to integer conversion for navigation payloads.

use num_traits::{PrimInt, Unsigned};

use crate::Error;

/// Widens an MSB-first bit slice into any unsigned primitive.
pub fn to_uint<T:PrimInt + Unsigned>(bits:&[bool]) -> Result<T, Error> {
	if bits.len() > 8*std::mem::size_of::<T>() {
		return Err(Error::InvalidTelemetryData("bit field wider than target integer"));
	}
	let mut ans = T::zero();
	for b in bits {
		ans = (ans << 1) | (if *b { T::one() } else { T::zero() });
	}
	Ok(ans)
}

/// Two's-complement interpretation of an MSB-first bit slice of any
/// width up to 63 bits; the leading bit is the sign.
pub fn to_signed(bits:&[bool]) -> Result<i64, Error> {
	if bits.is_empty() || bits.len() > 63 {
		return Err(Error::InvalidTelemetryData("signed bit field must be 1 to 63 bits wide"));
	}
	let unsigned:u64 = to_uint(bits)?;
	if bits[0] {
		Ok(unsigned as i64 - (1_i64 << bits.len()))
	} else {
		Ok(unsigned as i64)
	}
}

pub fn to_u8(bits:&[bool])  -> Result<u8, Error>  { to_uint(bits) }
pub fn to_u16(bits:&[bool]) -> Result<u16, Error> { to_uint(bits) }
pub fn to_u32(bits:&[bool]) -> Result<u32, Error> { to_uint(bits) }

/// Signed field scaled by a power of two, the shape every Keplerian
/// broadcast parameter takes.
pub fn scaled_signed(bits:&[bool], scale_pow2:i32) -> Result<f64, Error> {
	Ok((to_signed(bits)? as f64) * (2.0_f64).powi(scale_pow2))
}

pub fn scaled_unsigned(bits:&[bool], scale_pow2:i32) -> Result<f64, Error> {
	let raw:u64 = to_uint(bits)?;
	Ok((raw as f64) * (2.0_f64).powi(scale_pow2))
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn unsigned_widening() {
		assert_eq!(to_u8(&[true, false, true]).unwrap(), 5);
		assert_eq!(to_u16(&[true; 16]).unwrap(), u16::MAX);
		assert_eq!(to_u32(&[false; 20]).unwrap(), 0);
		assert!(to_u8(&[false; 9]).is_err());
	}

	#[test]
	fn twos_complement() {
		assert_eq!(to_signed(&[true, true, true, true]).unwrap(), -1);
		assert_eq!(to_signed(&[true, false, false, false]).unwrap(), -8);
		assert_eq!(to_signed(&[false, true, true, true]).unwrap(), 7);
	}

	#[test]
	fn power_of_two_scaling() {
		assert_eq!(scaled_signed(&[true, true], -1).unwrap(), -0.5);
		assert_eq!(scaled_unsigned(&[true, false], 4).unwrap(), 32.0);
	}

}
