
use crate::{AcqError, Cpx, RawSample};
use crate::config::ROW_MARGIN;
use crate::fourier_analysis::SpectralTransform;
use crate::types::wrap_matrix::WrapMatrix;
use crate::utils::fixed::BlockArithmetic;

use super::SUB_BINS;
use super::mix_table::MixTable;

/// Spectra of every millisecond of a window, in each of the SUB_BINS baseband copies.
/// Row `sub * ms + m` holds millisecond `m` of copy `sub`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBaseband {
	matrix:WrapMatrix<Cpx>,
	ms:usize,
}

impl PreparedBaseband {

	/// Room for windows of up to `max_ms` milliseconds
	pub fn new(max_ms:usize, samples_per_ms:usize) -> Result<Self, AcqError> {
		let matrix = WrapMatrix::new(SUB_BINS * max_ms, samples_per_ms, ROW_MARGIN)
			.ok_or(AcqError::Allocation("prepared baseband matrix"))?;
		Ok(Self { matrix, ms: 0 })
	}

	/// Milliseconds held by the last preparation
	pub fn ms(&self) -> usize { self.ms }

	pub fn max_ms(&self) -> usize { self.matrix.rows() / SUB_BINS }

	pub fn samples_per_ms(&self) -> usize { self.matrix.width() }

	/// Spectrum of millisecond `m` in copy `sub`, rotated by `shift` coarse bins
	pub fn row(&self, sub:usize, m:usize, shift:isize) -> &[Cpx] {
		assert!(sub < SUB_BINS && m < self.ms, "row ({}, {}) outside the prepared window", sub, m);
		self.matrix.row_at(sub * self.ms + m, shift)
	}

}

/// Mixes a window down to baseband and into the frequency domain
pub struct Preparation<T: SpectralTransform, A: BlockArithmetic> {
	transform:T,
	arith:A,
	mix_shift:u32,
	baseband:Vec<Cpx>,
	mixed:Vec<Cpx>,
}

impl<T: SpectralTransform, A: BlockArithmetic> Preparation<T, A> {

	pub fn new(transform:T, arith:A, mix_shift:u32) -> Self {
		let len = transform.len();
		Self { transform, arith, mix_shift, baseband: vec![Cpx{ re: 0, im: 0 }; len], mixed: vec![Cpx{ re: 0, im: 0 }; len] }
	}

	/// Prepares the leading `ms` milliseconds of `window` into `out`
	pub fn prepare(&mut self, window:&[RawSample], ms:usize, table:&MixTable, out:&mut PreparedBaseband) {
		let spm = self.transform.len();
		assert_eq!(out.samples_per_ms(), spm, "prepared rows do not match the transform length");
		assert!(ms <= out.max_ms(), "{} ms window exceeds the prepared matrix", ms);
		assert!(window.len() >= ms * spm && table.len() >= ms * spm, "{} ms window longer than its samples or mix tables", ms);

		out.ms = ms;
		for m in 0..ms {
			let range = m*spm..(m+1)*spm;

			for (b, s) in self.mixed.iter_mut().zip(window[range.clone()].iter()) {
				*b = Cpx{ re: s.re as i32, im: s.im as i32 };
			}
			self.arith.mul(&self.mixed, &table.if_mix()[range.clone()], &mut self.baseband, self.mix_shift);

			self.mixed.copy_from_slice(&self.baseband);
			self.transform.forward(&mut self.mixed);
			out.matrix.set_row(m, &self.mixed);

			for sub in 1..SUB_BINS {
				self.arith.mul(&self.baseband, &table.sub_mix(sub)[range.clone()], &mut self.mixed, self.mix_shift);
				self.transform.forward(&mut self.mixed);
				out.matrix.set_row(sub*ms + m, &self.mixed);
			}
		}
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use crate::fourier_analysis::RustFftTransform;
	use crate::utils::fixed::ScalarArithmetic;

	#[test]
	fn if_tone_lands_in_dc_bin() {
		let (fs, fif) = (2.048e6, 604.0e3);
		let table = MixTable::new(fs, fif, 2*2048);
		let window:Vec<RawSample> = (0..2*2048).map(|n| {
			let phase = 2.0 * std::f64::consts::PI * ((fif * (n as f64) / fs) % 1.0);
			RawSample{ re: (20.0 * phase.cos()).round() as i16, im: (20.0 * phase.sin()).round() as i16 }
		}).collect();

		let mut prep = Preparation::new(RustFftTransform::new(2048), ScalarArithmetic::default(), 14);
		let mut out = PreparedBaseband::new(4, 2048).unwrap();
		prep.prepare(&window, 2, &table, &mut out);
		assert_eq!(out.ms(), 2);

		for m in 0..2 {
			let row = out.row(0, m, 0);
			assert!((row[0].re - 20*2048).abs() < 1500, "dc {:?}", row[0]);
			assert!(row[1..].iter().all(|z| z.re.abs() + z.im.abs() < 1500));

			// One coarse bin of rotation moves DC to index 1
			assert_eq!(out.row(0, m, 1)[1], row[0]);
		}
	}

	#[test]
	#[should_panic]
	fn rows_beyond_prepared_window_panic() {
		let table = MixTable::new(2.048e6, 604.0e3, 2048);
		let window = vec![RawSample{ re: 1, im: 0 }; 2048];
		let mut prep = Preparation::new(RustFftTransform::new(2048), ScalarArithmetic::default(), 14);
		let mut out = PreparedBaseband::new(2, 2048).unwrap();
		prep.prepare(&window, 1, &table, &mut out);
		out.row(0, 1, 0);
	}

}
