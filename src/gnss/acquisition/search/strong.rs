
use crate::Cpx;
use crate::fourier_analysis::SpectralTransform;
use crate::gnss::acquisition::SUB_BINS;
use crate::gnss::acquisition::prepare::PreparedBaseband;
use crate::utils::fixed::BlockArithmetic;

use super::{Correlator, Peak, doppler_hz};

/// One coherent millisecond per coarse bin and sub-bin; keeps the single best cell
pub fn search<T: SpectralTransform, A: BlockArithmetic>(corr:&mut Correlator<T, A>, baseband:&PreparedBaseband, code:&[Cpx], max_bin:i32) -> Peak {
	let mut best = Peak::default();
	for bin in -max_bin..=max_bin {
		for sub in 0..SUB_BINS {
			let (index, magnitude) = corr.peak(baseband.row(sub, 0, bin as isize), code);
			best.keep_max(Peak{ index, doppler_hz: doppler_hz(bin, sub, 0, 0.0), magnitude });
			corr.pause();
		}
	}
	best
}
