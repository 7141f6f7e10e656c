
use std::time::Duration;

use crate::Cpx;
use crate::fourier_analysis::SpectralTransform;
use crate::utils::fixed::BlockArithmetic;

pub mod fine_doppler;
pub mod strong;

/// Best cell of a delay/Doppler search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
	/// Sample index into the code period
	pub index:usize,
	pub doppler_hz:f64,
	pub magnitude:i64,
}

impl Default for Peak {
	fn default() -> Self { Self { index: 0, doppler_hz: 0.0, magnitude: 0 } }
}

impl Peak {
	/// Replaces self with `other` only on a strictly larger magnitude, so the first of equal
	/// peaks is kept
	pub fn keep_max(&mut self, other:Peak) {
		if other.magnitude > self.magnitude { *self = other; }
	}
}

/// Doppler of a coarse bin / sub-bin / fine bin triple.  Rotating a spectrum by `bin`
/// coarse bins removes -1000 * bin Hz.
pub fn doppler_hz(bin:i32, sub:usize, fine:usize, fine_step_hz:f64) -> f64 {
	-super::COARSE_BIN_HZ * (bin as f64) + super::SUB_BIN_HZ * (sub as f64) + fine_step_hz * (fine as f64)
}

/// Circular correlation of a prepared spectrum against a code spectrum
pub struct Correlator<T: SpectralTransform, A: BlockArithmetic> {
	transform:T,
	arith:A,
	corr_shift:u32,
	work:Vec<Cpx>,
	mags:Vec<i64>,
	pause:Option<Duration>,
}

impl<T: SpectralTransform, A: BlockArithmetic> Correlator<T, A> {

	pub fn new(transform:T, arith:A, corr_shift:u32) -> Self {
		let len = transform.len();
		Self { transform, arith, corr_shift, work: vec![Cpx{ re: 0, im: 0 }; len], mags: vec![0; len], pause: None }
	}

	/// Sleeps this long between correlation rows
	pub fn with_yield(mut self, pause:Duration) -> Self {
		self.pause = if pause > Duration::from_secs(0) { Some(pause) } else { None };
		self
	}

	pub fn len(&self) -> usize { self.work.len() }

	pub fn arith(&self) -> &A { &self.arith }

	/// Correlation values for every delay: IFFT(row * conj(code)) with the product shifted
	pub fn correlate(&mut self, row:&[Cpx], code:&[Cpx]) -> &[Cpx] {
		self.arith.mul_conj(row, code, &mut self.work, self.corr_shift);
		self.transform.inverse(&mut self.work);
		&self.work
	}

	/// Index and magnitude of the largest correlation value
	pub fn peak(&mut self, row:&[Cpx], code:&[Cpx]) -> (usize, i64) {
		self.correlate(row, code);
		self.arith.magnitude(&self.work, &mut self.mags);
		self.arith.argmax(&self.mags)
	}

	pub(crate) fn pause(&self) {
		if let Some(d) = self.pause { std::thread::sleep(d); }
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use crate::fourier_analysis::RustFftTransform;
	use crate::gnss::gps_l1_ca::signal_modulation::prn_int;
	use crate::utils::fixed::ScalarArithmetic;

	#[test]
	fn correlation_peaks_at_circular_lag() {
		let mut t = RustFftTransform::new(64);
		let code:Vec<Cpx> = prn_int(1).unwrap()[..64].iter().map(|c| Cpx{ re: *c as i32, im: 0 }).collect();
		let delayed:Vec<Cpx> = (0..64).map(|n| code[(n + 64 - 10) % 64] * 16).collect();

		let mut code_f = code.clone();
		let mut sig_f = delayed;
		t.forward(&mut code_f);
		t.forward(&mut sig_f);

		let mut corr = Correlator::new(t, ScalarArithmetic::default(), 4);
		let (idx, mag) = corr.peak(&sig_f, &code_f);
		// A signal delayed by d samples peaks at index d
		assert_eq!(idx, 10);
		assert!((mag - 64).abs() <= 2, "peak {}", mag);
	}

	#[test]
	fn doppler_cells() {
		assert_eq!(doppler_hz(3, 0, 0, 25.0), -3000.0);
		assert_eq!(doppler_hz(-2, 1, 0, 25.0), 2250.0);
		assert_eq!(doppler_hz(0, 3, 9, 25.0), 975.0);

		let mut p = Peak{ index: 3, doppler_hz: 0.0, magnitude: 10 };
		p.keep_max(Peak{ index: 5, doppler_hz: 250.0, magnitude: 10 });
		assert_eq!(p.index, 3);
		p.keep_max(Peak{ index: 5, doppler_hz: 250.0, magnitude: 11 });
		assert_eq!(p.index, 5);
	}

}
