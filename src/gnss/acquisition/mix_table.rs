
use crate::Cpx;
use crate::utils::sinusoid::sine_gen;

use super::SUB_BIN_OFFSETS_HZ;

/// Precomputed Q14 wipe-off sinusoids, long enough for the longest collection window:
/// one that removes the IF and one per sub-bin Doppler offset
#[derive(Debug, Clone, PartialEq)]
pub struct MixTable {
	fs:f64,
	fif:f64,
	len:usize,
	if_table:Vec<Cpx>,
	sub_tables:Vec<Vec<Cpx>>,
}

impl MixTable {

	pub fn new(fs:f64, fif:f64, len:usize) -> Self {
		let if_table = sine_gen(-fif, fs, len);
		let sub_tables = SUB_BIN_OFFSETS_HZ.iter().map(|f| sine_gen(*f, fs, len)).collect();
		Self { fs, fif, len, if_table, sub_tables }
	}

	/// Whether this table was built for the given rates and needs no rebuild
	pub fn matches(&self, fs:f64, fif:f64) -> bool { self.fs == fs && self.fif == fif }

	pub fn len(&self) -> usize { self.len }

	pub fn if_mix(&self) -> &[Cpx] { &self.if_table }

	/// Offset table for copy `sub` in 1..SUB_BINS
	pub fn sub_mix(&self, sub:usize) -> &[Cpx] { &self.sub_tables[sub - 1] }

}

#[cfg(test)]
mod tests {

	use super::*;
	use crate::utils::sinusoid::SINE_BITS;

	#[test]
	fn tables_cover_window_and_rotate_the_right_way() {
		let t = MixTable::new(2.048e6, 604.0e3, 4096);
		assert!(t.matches(2.048e6, 604.0e3));
		assert!(!t.matches(2.048e6, 4.092e6));
		assert_eq!(t.if_mix().len(), 4096);
		assert_eq!(t.sub_mix(3).len(), 4096);

		// -500 Hz at 2.048 MHz completes one turn in 4096 samples; a quarter turn in 1024
		let half = t.sub_mix(2);
		assert_eq!(half[0].re, 1 << SINE_BITS);
		assert!(half[1024].re.abs() <= 1);
		assert_eq!(half[1024].im, -(1 << SINE_BITS));
	}

}
