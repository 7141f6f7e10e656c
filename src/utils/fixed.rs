
use serde::{Serialize, Deserialize};

use crate::Cpx;

/// Cheap magnitude estimate applied to correlator outputs.  Thresholds are only meaningful
/// for the rule they were calibrated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnitudeRule {
	/// |re| + |im|
	SumOfAbs,
	/// re^2 + im^2
	Power,
}

impl Default for MagnitudeRule {
	fn default() -> Self { MagnitudeRule::SumOfAbs }
}

/// Arithmetic right shift that rounds half up; a zero shift is the identity
#[inline]
pub fn shr_round(v:i64, shift:u32) -> i64 {
	if shift == 0 { v } else { (v + (1i64 << (shift - 1))) >> shift }
}

/// Narrows to i32, saturating at the type bounds
#[inline]
pub fn saturate(v:i64) -> i32 {
	if v > i32::MAX as i64 { i32::MAX }
	else if v < i32::MIN as i64 { i32::MIN }
	else { v as i32 }
}

/// Block-level complex arithmetic the acquisition algorithms are written against.  Every
/// product is formed in 64 bits, shifted with `shr_round` and saturated back to 32 bits.
pub trait BlockArithmetic {

	/// out[i] = (a[i] * b[i]) >> shift
	fn mul(&self, a:&[Cpx], b:&[Cpx], out:&mut [Cpx], shift:u32);

	/// out[i] = (a[i] * conj(b[i])) >> shift
	fn mul_conj(&self, a:&[Cpx], b:&[Cpx], out:&mut [Cpx], shift:u32);

	/// (sum of a[i] * b[i]) >> shift, the shift applied once after accumulation
	fn dot(&self, a:&[Cpx], b:&[Cpx], shift:u32) -> Cpx;

	fn mag(&self, z:Cpx) -> i64;

	fn magnitude(&self, x:&[Cpx], out:&mut [i64]) {
		for (o, z) in out.iter_mut().zip(x.iter()) { *o = self.mag(*z); }
	}

	/// Index and value of the first maximum; (0, 0) for an empty or all non-positive block
	fn argmax(&self, x:&[i64]) -> (usize, i64) {
		let mut best:(usize, i64) = (0, 0);
		for (idx, v) in x.iter().enumerate() {
			if *v > best.1 { best = (idx, *v); }
		}
		best
	}

}

/// Portable backend; one plain loop per operation
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarArithmetic {
	pub rule: MagnitudeRule,
}

impl ScalarArithmetic {
	pub fn new(rule:MagnitudeRule) -> Self { Self{ rule } }
}

#[inline]
fn cmul(a:Cpx, b:Cpx, shift:u32) -> Cpx {
	let (ar, ai, br, bi) = (a.re as i64, a.im as i64, b.re as i64, b.im as i64);
	Cpx{ re: saturate(shr_round(ar*br - ai*bi, shift)), im: saturate(shr_round(ar*bi + ai*br, shift)) }
}

impl BlockArithmetic for ScalarArithmetic {

	fn mul(&self, a:&[Cpx], b:&[Cpx], out:&mut [Cpx], shift:u32) {
		for ((o, x), y) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
			*o = cmul(*x, *y, shift);
		}
	}

	fn mul_conj(&self, a:&[Cpx], b:&[Cpx], out:&mut [Cpx], shift:u32) {
		for ((o, x), y) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
			*o = cmul(*x, y.conj(), shift);
		}
	}

	fn dot(&self, a:&[Cpx], b:&[Cpx], shift:u32) -> Cpx {
		let mut re:i64 = 0;
		let mut im:i64 = 0;
		for (x, y) in a.iter().zip(b.iter()) {
			let (xr, xi, yr, yi) = (x.re as i64, x.im as i64, y.re as i64, y.im as i64);
			re += xr*yr - xi*yi;
			im += xr*yi + xi*yr;
		}
		Cpx{ re: saturate(shr_round(re, shift)), im: saturate(shr_round(im, shift)) }
	}

	fn mag(&self, z:Cpx) -> i64 {
		let (re, im) = (z.re as i64, z.im as i64);
		match self.rule {
			MagnitudeRule::SumOfAbs => re.abs() + im.abs(),
			MagnitudeRule::Power    => re*re + im*im,
		}
	}

}
