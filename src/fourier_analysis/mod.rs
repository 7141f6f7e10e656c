
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};
use rustfft::num_complex::Complex;
use num_traits::Zero;

use crate::Cpx;

/// Fixed-length, in-place spectral transform over fixed-point samples.
///
/// Numeric contract relied on by preparation and search:
/// - `forward` is unscaled: X[k] = sum x[n] exp(-j*2*pi*k*n/N)
/// - `inverse` is scaled by 1/N: x[n] = (1/N) sum X[k] exp(+j*2*pi*k*n/N)
/// - outputs are rounded to the nearest integer and saturated to the i32 range
pub trait SpectralTransform {
	fn len(&self) -> usize;
	fn forward(&mut self, buf:&mut [Cpx]);
	fn inverse(&mut self, buf:&mut [Cpx]);
}

/// `SpectralTransform` backed by rustfft, computing in f64
#[derive(Clone)]
pub struct RustFftTransform {
	len:usize,
	fft:Arc<dyn Fft<f64>>,
	ifft:Arc<dyn Fft<f64>>,
	work:Vec<Complex<f64>>,
	scratch:Vec<Complex<f64>>,
}

impl RustFftTransform {

	pub fn new(len:usize) -> Self {
		let mut planner = FftPlanner::<f64>::new();
		let fft = planner.plan_fft_forward(len);
		let ifft = planner.plan_fft_inverse(len);
		let scratch_len = fft.get_inplace_scratch_len().max(ifft.get_inplace_scratch_len());

		Self { len, fft, ifft, work: vec![Complex::zero(); len], scratch: vec![Complex::zero(); scratch_len] }
	}

	fn load(&mut self, buf:&[Cpx]) {
		for (w, x) in self.work.iter_mut().zip(buf.iter()) {
			*w = Complex{ re: x.re as f64, im: x.im as f64 };
		}
	}

	// Float to int casts saturate, which is the contract's overflow behavior
	fn store(&self, buf:&mut [Cpx], scale:f64) {
		for (x, w) in buf.iter_mut().zip(self.work.iter()) {
			*x = Cpx{ re: (w.re * scale).round() as i32, im: (w.im * scale).round() as i32 };
		}
	}

}

impl SpectralTransform for RustFftTransform {

	fn len(&self) -> usize { self.len }

	fn forward(&mut self, buf:&mut [Cpx]) {
		assert_eq!(buf.len(), self.len, "transform length mismatch");
		self.load(buf);
		self.fft.process_with_scratch(&mut self.work, &mut self.scratch);
		self.store(buf, 1.0);
	}

	fn inverse(&mut self, buf:&mut [Cpx]) {
		assert_eq!(buf.len(), self.len, "transform length mismatch");
		self.load(buf);
		self.ifft.process_with_scratch(&mut self.work, &mut self.scratch);
		self.store(buf, 1.0 / (self.len as f64));
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn forward_unscaled_inverse_scaled() {
		let mut t = RustFftTransform::new(8);
		let x_time:Vec<Cpx> = (0..8).map(|x| Cpx{ re: x, im: 0 }).collect();

		let mut buf = x_time.clone();
		t.forward(&mut buf);
		// DC bin holds the plain sum
		assert_eq!(buf[0], Cpx{ re: 28, im: 0 });

		t.inverse(&mut buf);
		assert_eq!(buf, x_time);
	}

	#[test]
	fn impulse_spectrum_is_flat() {
		let mut t = RustFftTransform::new(2048);
		let mut buf = vec![Cpx{ re: 0, im: 0 }; 2048];
		buf[0] = Cpx{ re: 100, im: -50 };
		t.forward(&mut buf);
		assert!(buf.iter().all(|c| *c == Cpx{ re: 100, im: -50 }));
	}

	#[test]
	fn output_saturates() {
		let mut t = RustFftTransform::new(4);
		let mut buf = vec![Cpx{ re: i32::MAX, im: 0 }; 4];
		t.forward(&mut buf);
		assert_eq!(buf[0].re, i32::MAX);
	}

}
