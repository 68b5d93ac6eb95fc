
//! Goad & Goodman (1974) modified Hopfield tropospheric refraction
//! model.  Dry and wet components are integrated separately through a
//! ninth-order polynomial in the slant range to the top of the
//! refractive layer.

/// Tropospheric range correction in meters.
///
/// * `sinel`     - sine of the satellite elevation angle
/// * `hsta_km`   - station height [km]
/// * `p_mb`      - atmospheric pressure [mbar] at height `hp_km`
/// * `t_kel`     - surface temperature [K] at height `htkel_km`
/// * `hum`       - humidity [%] at height `hhum_km`
pub fn tropospheric_delay_m(sinel:f64, hsta_km:f64, p_mb:f64, t_kel:f64, hum:f64,
	hp_km:f64, htkel_km:f64, hhum_km:f64) -> f64 {

	const A_E:f64    = 6378.137;      // [km] semi-major axis of the Earth ellipsoid
	const B0:f64     = 7.839257e-5;
	const TLAPSE:f64 = -6.5;          // [K/km]

	let tkhum = t_kel + TLAPSE*(hhum_km - htkel_km);
	let atkel = 7.5*(tkhum - 273.15) / (237.3 + tkhum - 273.15);
	let e0    = 0.0611 * hum * (10.0_f64).powf(atkel);
	let tksea = t_kel - TLAPSE*htkel_km;
	let em    = -978.77 / (2.8704e6*TLAPSE*1.0e-5);
	let tkelh = tksea + TLAPSE*hhum_km;
	let e0sea = e0 * (tksea/tkelh).powf(4.0*em);
	let tkelp = tksea + TLAPSE*hp_km;
	let psea  = p_mb * (tksea/tkelp).powf(em);

	let sinel = if sinel < 0.0 { 0.0 } else { sinel };

	let mut delay_m = 0.0;
	let mut refsea  = 77.624e-6 / tksea;
	let mut htop    = 1.1385e-2 / refsea;
	refsea *= psea;
	let mut ref_n   = refsea * ((htop - hsta_km)/htop).powi(4);

	// First pass integrates the dry component, second pass the wet one
	for &wet_pass in [false, true].iter() {
		let rtop = {
			let r2 = (A_E + htop).powi(2) - (A_E + hsta_km).powi(2)*(1.0 - sinel*sinel);
			let r2 = if r2 < 0.0 { 0.0 } else { r2 };
			r2.sqrt() - (A_E + hsta_km)*sinel
		};

		let a = -sinel / (htop - hsta_km);
		let b = -B0*(1.0 - sinel*sinel) / (htop - hsta_km);

		let mut alpha:[f64; 8] = [
			2.0*a,
			2.0*a*a + 4.0*b/3.0,
			a*(a*a + 3.0*b),
			a.powi(4)/5.0 + 2.4*a*a*b + 1.2*b*b,
			2.0*a*b*(a*a + 3.0*b)/3.0,
			b*b*(6.0*a*a + 4.0*b)*1.428571e-1,
			0.0,
			0.0 ];
		if b*b > 1.0e-35 {
			alpha[6] = a*b.powi(3)/3.0;
			alpha[7] = b.powi(4)/17.5;
		}

		let mut dr = rtop;
		for i in 0..8 {
			dr += alpha[i] * rtop.powi(i as i32 + 2);
		}
		delay_m += dr * ref_n * 1000.0;

		if !wet_pass {
			refsea = (371900.0e-6/tksea - 12.92e-6) / tksea;
			htop   = 1.1385e-2 * (1255.0/tksea + 0.05) / refsea;
			ref_n  = refsea * e0sea * ((htop - hsta_km)/htop).powi(4);
		}
	}

	delay_m
}
