
use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::RawSample;

/// Reads one-millisecond frames of interleaved little-endian i16 I/Q from any source.
/// Iteration stops at the first short read; each item carries its frame index.
pub struct FrameSource<R: Read> {
	src:R,
	idx:usize,
	samples_per_frame:usize,
	interleaved:Vec<i16>,
}

impl<R: Read> FrameSource<R> {

	pub fn new(src:R, samples_per_frame:usize) -> Self {
		Self { src, idx: 0, samples_per_frame, interleaved: vec![0; 2*samples_per_frame] }
	}

	pub fn samples_per_frame(&self) -> usize { self.samples_per_frame }

	/// Next frame, Ok(None) at end of stream
	pub fn read_frame(&mut self) -> io::Result<Option<Vec<RawSample>>> {
		match self.src.read_i16_into::<LittleEndian>(&mut self.interleaved) {
			Ok(()) => Ok(Some(self.interleaved.chunks_exact(2).map(|iq| RawSample{ re: iq[0], im: iq[1] }).collect())),
			Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
			Err(e) => Err(e),
		}
	}

}

impl<R: Read> Iterator for FrameSource<R> {
	type Item = (Vec<RawSample>, usize);

	fn next(&mut self) -> Option<(Vec<RawSample>, usize)> {
		match self.read_frame() {
			Ok(Some(frame)) => {
				let ans = (frame, self.idx);
				self.idx += 1;
				Some(ans)
			},
			Ok(None) => None,
			Err(e) => {
				log::warn!("Sample source read failed: {}", e);
				None
			}
		}
	}
}
