
use crate::Cpx;
use crate::fourier_analysis::SpectralTransform;
use crate::gnss::acquisition::SUB_BINS;
use crate::gnss::acquisition::prepare::PreparedBaseband;
use crate::utils::fixed::BlockArithmetic;
use crate::utils::sinusoid::sine_gen;

use super::{Correlator, Peak, doppler_hz};

/// Milliseconds per coherent block, and points in the post-correlation DFT
pub const FINE_POINTS:usize = 10;

pub const FINE_STEP_HZ:f64 = 25.0;

/// Coherent blocks per 20 ms group; whichever one avoids a data bit edge wins
pub const PARITY_WINDOWS:usize = 2;

const GROUP_MS:usize = FINE_POINTS * PARITY_WINDOWS;

/// How many 20 ms groups get their DFT magnitudes summed before the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePlan {
	pub incoherent:usize,
}

impl FinePlan {

	pub fn medium() -> Self { Self { incoherent: 1 } }

	pub fn weak() -> Self { Self { incoherent: 15 } }

	/// Milliseconds of prepared rows the plan reads
	pub fn span_ms(&self) -> usize { self.incoherent * GROUP_MS }

}

/// 10-point partial DFT at 25 Hz spacing, applied across successive 1 ms correlations
pub struct FineDft {
	table:Vec<Vec<Cpx>>,
	dft_shift:u32,
	// Correlations transposed so the 10 values of one delay are contiguous
	cols:Vec<Cpx>,
	acc:Vec<i64>,
	samples_per_ms:usize,
}

impl FineDft {

	pub fn new(samples_per_ms:usize, dft_shift:u32) -> Self {
		let table = (0..FINE_POINTS).map(|f| sine_gen(-FINE_STEP_HZ * (f as f64), 1000.0, FINE_POINTS)).collect();
		Self {
			table,
			dft_shift,
			cols: vec![Cpx{ re: 0, im: 0 }; samples_per_ms * FINE_POINTS],
			acc: vec![0; samples_per_ms * FINE_POINTS],
			samples_per_ms,
		}
	}

}

/// Coherent 10 ms integration with 25 Hz refinement, summed incoherently over the plan's
/// groups.  Row `i*20 + k*10 + m` is millisecond `m` of parity window `k` in group `i`.
pub fn search<T: SpectralTransform, A: BlockArithmetic>(corr:&mut Correlator<T, A>, dft:&mut FineDft, baseband:&PreparedBaseband, code:&[Cpx], max_bin:i32, plan:FinePlan) -> Peak {
	assert!(baseband.ms() >= plan.span_ms(), "{} ms prepared, plan needs {}", baseband.ms(), plan.span_ms());
	assert_eq!(corr.len(), dft.samples_per_ms, "DFT sized for a different transform length");
	let spm = dft.samples_per_ms;

	let mut best = Peak::default();
	for bin in -max_bin..=max_bin {
		for sub in 0..SUB_BINS {
			for k in 0..PARITY_WINDOWS {
				for a in dft.acc.iter_mut() { *a = 0; }

				for i in 0..plan.incoherent {
					for m in 0..FINE_POINTS {
						let row = baseband.row(sub, i*GROUP_MS + k*FINE_POINTS + m, bin as isize);
						for (tau, z) in corr.correlate(row, code).iter().enumerate() {
							dft.cols[tau*FINE_POINTS + m] = *z;
						}
						corr.pause();
					}

					let arith = corr.arith();
					for tau in 0..spm {
						let col = &dft.cols[tau*FINE_POINTS..(tau+1)*FINE_POINTS];
						for (f, coeffs) in dft.table.iter().enumerate() {
							dft.acc[f*spm + tau] += arith.mag(arith.dot(col, coeffs, dft.dft_shift));
						}
					}
				}

				let (idx, magnitude) = corr.arith().argmax(&dft.acc);
				best.keep_max(Peak{ index: idx % spm, doppler_hz: doppler_hz(bin, sub, idx / spm, FINE_STEP_HZ), magnitude });
			}
		}
	}
	best
}
