
use crate::RawSample;
use crate::utils::fixed::shr_round;

/// Output samples are clipped to +/- (2^AGC_BITS - 1) per component
pub const AGC_BITS:u32 = 5;
pub const AGC_LIMIT:i32 = (1 << AGC_BITS) - 1;

/// The gain is a Q11 fixed-point factor; UNITY_SCALE passes samples through unchanged
pub const SCALE_BITS:u32 = 11;
pub const UNITY_SCALE:i32 = 1 << SCALE_BITS;

/// RMS per component the loop steers the output towards
pub const AGC_TARGET_RMS:f64 = 8.0;

const MAX_SCALE:i32 = 1 << 20;

// Loop gain of the per-frame correction, as a right shift
const LOOP_SHIFT:u32 = 3;

/// Integer gain stage in front of the sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agc {
	scale:i32,
}

impl Default for Agc {
	fn default() -> Self { Self { scale: UNITY_SCALE } }
}

fn frame_rms(frame:&[RawSample]) -> f64 {
	if frame.is_empty() { return 0.0; }
	let power:f64 = frame.iter().map(|s| {
		let (re, im) = (s.re as f64, s.im as f64);
		re*re + im*im
	}).sum();
	(power / (2.0 * frame.len() as f64)).sqrt()
}

fn scale_for(rms:f64) -> Option<i32> {
	if rms > 0.0 {
		Some(((AGC_TARGET_RMS * (UNITY_SCALE as f64) / rms).round() as i32).max(1).min(MAX_SCALE))
	} else { None }
}

impl Agc {

	pub fn scale(&self) -> i32 { self.scale }

	/// Sets the gain directly from one frame's RMS.  A silent frame leaves the gain alone.
	pub fn init(&mut self, frame:&[RawSample]) {
		if let Some(scale) = scale_for(frame_rms(frame)) {
			self.scale = scale;
		}
	}

	/// Scales and clips `input` into `output` with the current gain, then moves the gain a
	/// fraction of the way towards the value that would have hit the target RMS.  Returns
	/// the number of clipped components.
	pub fn run(&mut self, input:&[RawSample], output:&mut [RawSample]) -> u32 {
		let scale = self.scale as i64;
		let mut clips:u32 = 0;
		let mut clip = |v:i16| -> i16 {
			let x = shr_round((v as i64) * scale, SCALE_BITS);
			if x > AGC_LIMIT as i64 { clips += 1; AGC_LIMIT as i16 }
			else if x < -AGC_LIMIT as i64 { clips += 1; -AGC_LIMIT as i16 }
			else { x as i16 }
		};

		for (o, s) in output.iter_mut().zip(input.iter()) {
			*o = RawSample{ re: clip(s.re), im: clip(s.im) };
		}

		if let Some(target) = scale_for(frame_rms(input)) {
			self.scale = (self.scale + ((target - self.scale) >> LOOP_SHIFT)).max(1).min(MAX_SCALE);
		}

		clips
	}

}
