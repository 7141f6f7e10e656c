
use crate::gnss::constants::gps;

// G2 delay [chips] for PRN 1 through 37
const G2_DELAY:[usize; gps::MAX_PRN] = [
	  5,   6,   7,   8,  17,  18, 139, 140, 141, 251,
	252, 254, 255, 256, 257, 258, 469, 470, 471, 472,
	473, 474, 509, 512, 513, 514, 515, 516, 859, 860,
	861, 862, 863, 950, 947, 948, 950,
];

/// C/A Gold code for a PRN in 1..=37 as +1/-1 chips; None for any other PRN
pub fn prn_int(prn:usize) -> Option<Vec<i8>> {
	if prn == 0 || prn > gps::MAX_PRN { return None; }

	// Registers hold +1/-1, so modulo-2 addition becomes multiplication
	let mut g1 = [0i8; gps::CODE_LENGTH];
	let mut g2 = [0i8; gps::CODE_LENGTH];
	let mut r1 = [-1i8; 10];
	let mut r2 = [-1i8; 10];
	for i in 0..gps::CODE_LENGTH {
		g1[i] = r1[9];
		g2[i] = r2[9];
		let c1 = r1[2] * r1[9];
		let c2 = r2[1] * r2[2] * r2[5] * r2[7] * r2[8] * r2[9];
		r1.rotate_right(1);
		r2.rotate_right(1);
		r1[0] = c1;
		r2[0] = c2;
	}

	let delay = G2_DELAY[prn - 1];
	Some((0..gps::CODE_LENGTH).map(|i| -g1[i] * g2[(i + gps::CODE_LENGTH - delay) % gps::CODE_LENGTH]).collect())
}

/// Code resampled to one code period at `fs`, one entry per sample
pub fn prn_int_sampled(prn:usize, fs:f64) -> Option<Vec<i8>> {
	let code = prn_int(prn)?;
	let samples_per_code:usize = (fs / 1000.0).ceil() as usize;
	let ts:f64 = 1.0 / fs;

	Some((0..samples_per_code).map(|i| {
		let code_value_idx:usize = ((ts * (i as f64)) / gps::SEC_PER_CHIP) as usize;
		code[code_value_idx.min(gps::CODE_LENGTH - 1)]
	}).collect())
}

#[cfg(test)]
mod tests {

	use super::*;

	fn circular_correlation(a:&[i8], b:&[i8], lag:usize) -> i32 {
		let n = a.len();
		(0..n).map(|i| (a[i] as i32) * (b[(i + lag) % n] as i32)).sum()
	}

	#[test]
	fn unknown_prns_have_no_code() {
		assert!(prn_int(0).is_none());
		assert!(prn_int(38).is_none());
		assert!(prn_int_sampled(40, 2.048e6).is_none());
	}

	#[test]
	fn gold_code_correlation_properties() {
		let c1 = prn_int(1).unwrap();
		let c2 = prn_int(2).unwrap();

		// PRN 1 begins with octal 1440 once mapped back to bits (+1 -> 1)
		let first_ten:Vec<u8> = c1[..10].iter().map(|c| if *c == 1 { 1 } else { 0 }).collect();
		assert_eq!(first_ten, vec![1, 1, 0, 0, 1, 0, 0, 0, 0, 0]);

		assert_eq!(circular_correlation(&c1, &c1, 0), 1023);
		for lag in 1..1023 {
			assert!(circular_correlation(&c1, &c1, lag).abs() <= 65);
		}
		for lag in 0..1023 {
			assert!(circular_correlation(&c1, &c2, lag).abs() <= 65);
		}
	}

	#[test]
	fn sampled_code_spans_one_period() {
		let s = prn_int_sampled(7, 2.048e6).unwrap();
		let c = prn_int(7).unwrap();
		assert_eq!(s.len(), 2048);
		assert_eq!(s[0], c[0]);
		assert_eq!(s[2047], c[1022]);
		// Slightly more than two samples per chip at 2.048 MHz
		assert_eq!(s[2], c[0]);
		assert_eq!(s[3], c[1]);
	}

}
