
use std::f64::consts;

use rand::prelude::*;
use rand_distr::Normal;

use crate::RawSample;
use crate::gnss::gps_l1_ca::signal_modulation::prn_int_sampled;

/// Synthetic front-end output: one C/A code at IF plus Gaussian noise, generated frame by
/// frame with a continuous carrier
pub(crate) struct TestSignal {
	code:Vec<i8>,
	fs:f64,
	carrier_hz:f64,
	delay_samples:usize,
	amplitude:f64,
	n:u64,
	rng:StdRng,
	noise:Normal<f64>,
}

impl TestSignal {

	/// Noise only
	pub fn noise(fs:f64, sigma:f64, seed:u64) -> Self {
		let spm = (fs / 1000.0).ceil() as usize;
		Self {
			code: vec![0; spm],
			fs,
			carrier_hz: 0.0,
			delay_samples: 0,
			amplitude: 0.0,
			n: 0,
			rng: StdRng::seed_from_u64(seed),
			noise: Normal::new(0.0, sigma).unwrap(),
		}
	}

	/// Adds PRN `prn` delayed by `delay_samples`, at `fif + doppler_hz`
	pub fn with_code(mut self, prn:usize, fif:f64, doppler_hz:f64, delay_samples:usize, amplitude:f64) -> Self {
		self.code = prn_int_sampled(prn, self.fs).unwrap();
		self.carrier_hz = fif + doppler_hz;
		self.delay_samples = delay_samples;
		self.amplitude = amplitude;
		self
	}

	pub fn frame(&mut self) -> Vec<RawSample> {
		let spm = self.code.len();
		let mut ans:Vec<RawSample> = Vec::with_capacity(spm);
		for idx in 0..spm {
			let chip = self.code[(idx + spm - self.delay_samples) % spm] as f64;
			let phase = 2.0 * consts::PI * ((self.carrier_hz * (self.n as f64) / self.fs) % 1.0);
			let re = self.amplitude * chip * phase.cos() + self.noise.sample(&mut self.rng);
			let im = self.amplitude * chip * phase.sin() + self.noise.sample(&mut self.rng);
			ans.push(RawSample{ re: re.round().max(-32768.0).min(32767.0) as i16, im: im.round().max(-32768.0).min(32767.0) as i16 });
			self.n += 1;
		}
		ans
	}

	/// `ms` consecutive frames, concatenated
	pub fn window(&mut self, ms:usize) -> Vec<RawSample> {
		(0..ms).flat_map(|_| self.frame()).collect()
	}

}
