
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::constants::gps;
use crate::utils::fixed::MagnitudeRule;

/// Wrap-around margin of every prepared baseband row [samples].  Bounds the coarse Doppler
/// search to +/- ROW_MARGIN kHz.
pub const ROW_MARGIN:usize = 100;

/// Search limits of one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
	/// Half-width of the Doppler search [Hz]; searched in whole kHz bins
	pub doppler_half_width_hz:u32,
	/// Detection threshold on the tier's peak magnitude
	pub threshold:f32,
}

impl TierConfig {
	pub fn max_bin(&self) -> i32 { (self.doppler_half_width_hz / 1000) as i32 }
}

/// Right-shift amounts applied after each fixed-point multiply.  Changing any of these
/// changes every magnitude the search reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaling {
	/// After each mix with a Q14 wipe-off table
	pub mix_shift:u32,
	/// After the frequency-domain product with a code spectrum
	pub corr_shift:u32,
	/// After accumulating the 10-point post-correlation DFT
	pub dft_shift:u32,
}

impl Default for Scaling {
	fn default() -> Self { Self { mix_shift: 14, corr_shift: 4, dft_shift: 14 } }
}

/// Delivery policy for acquisition results leaving the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffPolicy {
	/// Slots in each downstream channel
	pub capacity:usize,
	/// Extra attempts made while a channel is full
	pub retries:u32,
	pub backoff_us:u64,
}

impl Default for HandoffPolicy {
	fn default() -> Self { Self { capacity: 64, retries: 3, backoff_us: 250 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
	/// Decimated sample rate of the incoming frames [samples/sec]
	pub sample_rate_hz:f64,
	pub if_freq_hz:f64,
	/// Satellites in the code bank, PRN 1 through num_codes
	pub num_codes:usize,
	/// Tracking consumers of the sample buffer
	pub num_channels:usize,
	/// Sample buffer depth [frames]
	pub buffer_capacity:usize,
	/// Frames used only to settle the AGC before buffering starts
	pub agc_warmup_frames:u64,
	/// Every n-th buffered frame carries a measurement tag
	pub measurement_interval_ms:u64,
	pub consume_backoff_us:u64,
	/// Sleep between search rows to leave CPU to the other tasks; 0 disables
	pub search_yield_us:u64,
	pub strong:TierConfig,
	pub medium:TierConfig,
	pub weak:TierConfig,
	pub scaling:Scaling,
	pub magnitude:MagnitudeRule,
	/// SCHED_FIFO priority of the acquisition thread
	pub priority:Option<i32>,
	pub report_path:PathBuf,
	/// Precomputed code spectra; generated at startup when absent
	pub code_bank_path:Option<PathBuf>,
	pub handoff:HandoffPolicy,
}

impl Default for ReceiverConfig {
	fn default() -> Self {
		Self {
			sample_rate_hz: gps::SAMPLE_FREQUENCY,
			if_freq_hz: gps::IF_FREQUENCY,
			num_codes: 32,
			num_channels: 12,
			buffer_capacity: 500,
			agc_warmup_frames: 1000,
			measurement_interval_ms: 100,
			consume_backoff_us: 250,
			search_yield_us: 0,
			strong: TierConfig{ doppler_half_width_hz: 10000, threshold: 300.0 },
			medium: TierConfig{ doppler_half_width_hz: 10000, threshold: 700.0 },
			weak:   TierConfig{ doppler_half_width_hz: 10000, threshold: 3500.0 },
			scaling: Scaling::default(),
			magnitude: MagnitudeRule::default(),
			priority: None,
			report_path: PathBuf::from("Acq.txt"),
			code_bank_path: None,
			handoff: HandoffPolicy::default(),
		}
	}
}

impl ReceiverConfig {

	pub fn from_file<P: AsRef<Path>>(path:P) -> Result<Self, AcqError> {
		let cfg:Self = serde_json::from_reader(File::open(path)?)?;
		cfg.validate()?;
		Ok(cfg)
	}

	/// Samples in one millisecond frame
	pub fn samples_per_ms(&self) -> usize { (self.sample_rate_hz / 1000.0).ceil() as usize }

	pub fn validate(&self) -> Result<(), AcqError> {
		let fail = |msg:String| Err(AcqError::Config(msg));

		if !(self.sample_rate_hz > 0.0) { return fail(format!("sample rate {} must be positive", self.sample_rate_hz)); }
		if self.samples_per_ms() < ROW_MARGIN { return fail(format!("{} samples per ms is below the row margin", self.samples_per_ms())); }
		if self.num_codes == 0 || self.num_codes > gps::MAX_PRN {
			return fail(format!("num_codes {} outside 1..={}", self.num_codes, gps::MAX_PRN));
		}
		if self.buffer_capacity < 2 { return fail("buffer_capacity must be at least 2".to_string()); }
		if self.measurement_interval_ms == 0 { return fail("measurement_interval_ms must be positive".to_string()); }
		if self.handoff.capacity == 0 { return fail("handoff capacity must be positive".to_string()); }

		for (name, tier) in &[("strong", self.strong), ("medium", self.medium), ("weak", self.weak)] {
			if tier.max_bin() as usize > ROW_MARGIN {
				return fail(format!("{} Doppler half-width {} Hz exceeds the {} kHz row margin", name, tier.doppler_half_width_hz, ROW_MARGIN));
			}
		}

		if let Some(p) = self.priority {
			if !(1..=99).contains(&p) { return fail(format!("priority {} outside 1..=99", p)); }
		}

		Ok(())
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn defaults_are_valid() {
		let cfg = ReceiverConfig::default();
		assert!(cfg.validate().is_ok());
		assert_eq!(cfg.samples_per_ms(), 2048);
		assert_eq!(cfg.strong.max_bin(), 10);
	}

	#[test]
	fn rejects_doppler_wider_than_margin() {
		let mut cfg = ReceiverConfig::default();
		cfg.weak.doppler_half_width_hz = 150_000;
		assert!(matches!(cfg.validate(), Err(AcqError::Config(_))));

		let mut cfg = ReceiverConfig::default();
		cfg.num_codes = 0;
		assert!(cfg.validate().is_err());
	}

	#[test]
	fn partial_json_falls_back_to_defaults() {
		let cfg:ReceiverConfig = serde_json::from_str(r#"{ "num_codes": 4, "strong": { "doppler_half_width_hz": 5000, "threshold": 250.0 } }"#).unwrap();
		assert_eq!(cfg.num_codes, 4);
		assert_eq!(cfg.strong.max_bin(), 5);
		assert_eq!(cfg.medium, ReceiverConfig::default().medium);
		assert_eq!(cfg.magnitude, MagnitudeRule::SumOfAbs);
	}

}
