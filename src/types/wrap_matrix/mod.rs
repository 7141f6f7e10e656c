
/// Fixed-size 2D array whose rows carry a wrap-around margin of `margin` samples on each
/// side: a row of width W is stored as [last M][all W][first M].  Reading W samples starting
/// at `margin - shift` yields the row circularly rotated by `shift`, so a search can index
/// different rotations of the same row without copying it.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapMatrix<T> {
	data:Vec<T>,
	rows:usize,
	width:usize,
	margin:usize,
}

impl<T: Copy + Default> WrapMatrix<T> {

	/// Allocates `rows` rows of `width` samples; `None` if the allocation fails
	pub fn new(rows:usize, width:usize, margin:usize) -> Option<Self> {
		assert!(margin <= width, "margin wider than the row");
		let len = rows.checked_mul(width + 2*margin)?;
		let mut data:Vec<T> = Vec::new();
		data.try_reserve_exact(len).ok()?;
		data.resize(len, T::default());
		Some(Self { data, rows, width, margin })
	}

	pub fn rows(&self) -> usize { self.rows }
	pub fn width(&self) -> usize { self.width }
	pub fn margin(&self) -> usize { self.margin }

	fn stride(&self) -> usize { self.width + 2*self.margin }

	/// Stores `src` (exactly `width` samples) as row `r`, filling both margins
	pub fn set_row(&mut self, r:usize, src:&[T]) {
		assert!(r < self.rows, "row {} out of range", r);
		assert_eq!(src.len(), self.width, "row width mismatch");
		let (w, m) = (self.width, self.margin);
		let stride = self.stride();
		let start = r * stride;
		let row = &mut self.data[start..start + stride];
		row[..m].copy_from_slice(&src[w-m..]);
		row[m..m+w].copy_from_slice(src);
		row[m+w..].copy_from_slice(&src[..m]);
	}

	/// Row `r` rotated by `shift`: element j is the stored element (j - shift) mod width.
	///
	/// # Panics
	/// If `r` is out of range or |shift| exceeds the margin.
	pub fn row_at(&self, r:usize, shift:isize) -> &[T] {
		assert!(r < self.rows, "row {} out of range", r);
		assert!(shift.unsigned_abs() <= self.margin, "shift {} exceeds margin {}", shift, self.margin);
		let start = r * self.stride() + ((self.margin as isize) - shift) as usize;
		&self.data[start..start + self.width]
	}

	/// Row `r` without rotation
	pub fn row(&self, r:usize) -> &[T] { self.row_at(r, 0) }

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn rotated_reads_match_circular_shift() {
		let width = 16;
		let src:Vec<i32> = (0..width as i32).collect();
		let mut m:WrapMatrix<i32> = WrapMatrix::new(3, width, 4).unwrap();
		m.set_row(1, &src);

		assert_eq!(m.row(1), &src[..]);
		for shift in -4isize..=4 {
			let expected:Vec<i32> = (0..width as isize).map(|j| src[(j - shift).rem_euclid(width as isize) as usize]).collect();
			assert_eq!(m.row_at(1, shift), &expected[..]);
		}

		// Other rows untouched
		assert!(m.row(0).iter().all(|x| *x == 0));
		assert!(m.row(2).iter().all(|x| *x == 0));

		// Last row, margins filled from its own data
		let last:Vec<i32> = (100..100 + width as i32).collect();
		m.set_row(2, &last);
		assert_eq!(m.row_at(2, 4)[..4], last[width-4..]);
		assert_eq!(m.row_at(2, -4)[width-4..], last[..4]);
		assert_eq!(m.row(1), &src[..]);
	}

	#[test]
	#[should_panic]
	fn shift_beyond_margin_panics() {
		let m:WrapMatrix<i32> = WrapMatrix::new(1, 8, 2).unwrap();
		m.row_at(0, 3);
	}

}
