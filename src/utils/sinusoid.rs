
use std::f64::consts;

use crate::Cpx;

/// Amplitude of the generated tables; 1.0 is represented as 2^SINE_BITS
pub const SINE_BITS:u32 = 14;

/// Complex exponential exp(j*2*pi*freq_hz*n/fs) for n in 0..len, quantized to Q14
pub fn sine_gen(freq_hz:f64, fs:f64, len:usize) -> Vec<Cpx> {
	let amp:f64 = (1i64 << SINE_BITS) as f64;
	let phase_step_rad:f64 = 2.0 * consts::PI * freq_hz / fs;
	(0..len).map(|n| {
		// Reduce the phase in f64 before taking sin/cos so long tables don't lose precision
		let phase = (phase_step_rad * (n as f64)) % (2.0 * consts::PI);
		Cpx{ re: (amp * phase.cos()).round() as i32, im: (amp * phase.sin()).round() as i32 }
	}).collect()
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn table_is_unit_amplitude_and_periodic() {
		// 250 Hz at 2.048 MHz repeats every 8192 samples
		let t = sine_gen(-250.0, 2.048e6, 3*8192);
		assert_eq!(t[0], Cpx{ re: 1 << SINE_BITS, im: 0 });
		for n in 0..8192 {
			assert!((t[n].re - t[n+8192].re).abs() <= 1);
			assert!((t[n].im - t[n+8192].im).abs() <= 1);
		}

		// Negative frequency rotates clockwise
		assert!(t[100].im < 0);
	}

}
