
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::constants::gps;

pub mod code_bank;
pub mod engine;
pub mod handoff;
pub mod mix_table;
pub mod prepare;
pub mod report;
pub mod search;

#[cfg(test)]
pub(crate) mod test_signal;


/// Sub-kHz Doppler offsets mixed into the extra baseband copies [Hz]
pub const SUB_BIN_OFFSETS_HZ:[f64; 3] = [-250.0, -500.0, -750.0];

/// Baseband copies per millisecond: the plain one plus one per sub-bin offset
pub const SUB_BINS:usize = 1 + SUB_BIN_OFFSETS_HZ.len();

pub const SUB_BIN_HZ:f64 = 250.0;
pub const COARSE_BIN_HZ:f64 = 1000.0;

/// Longest collection window of any tier [ms]
pub const MAX_COLLECT_MS:usize = 310;

/// Search sensitivity, in order of increasing integration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
	Strong,
	Medium,
	Weak,
}

impl Tier {

	/// Contiguous milliseconds collected per cycle
	pub fn collect_ms(&self) -> usize { match self {
		Tier::Strong => 100,
		Tier::Medium => 100,
		Tier::Weak   => MAX_COLLECT_MS,
	}}

	/// Leading milliseconds of the window that get prepared and searched
	pub fn prepare_ms(&self) -> usize { match self {
		Tier::Strong => 1,
		Tier::Medium => 20,
		Tier::Weak   => MAX_COLLECT_MS,
	}}

	/// Tier of the next sweep once every satellite has been tried.  WEAK is never entered
	/// here, only through a request.
	pub fn next(&self) -> Tier { match self {
		Tier::Strong => Tier::Medium,
		Tier::Medium => Tier::Strong,
		Tier::Weak   => Tier::Strong,
	}}

	pub fn code(&self) -> u32 { match self {
		Tier::Strong => 0,
		Tier::Medium => 1,
		Tier::Weak   => 2,
	}}

	pub fn from_code(code:u32) -> Option<Tier> { match code {
		0 => Some(Tier::Strong),
		1 => Some(Tier::Medium),
		2 => Some(Tier::Weak),
		_ => None,
	}}

}

/// Asks the engine to try one satellite at one tier on its next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
	/// Zero-based satellite index into the code bank
	pub sv:usize,
	pub tier:Tier,
	/// Sequence number of the first frame of the window that served the request
	pub count:u64,
}

impl AcquisitionRequest {
	pub fn new(sv:usize, tier:Tier) -> Self { Self { sv, tier, count: 0 } }
}

/// Outcome of one search, successful or not
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
	pub tier:Tier,
	pub sv:usize,
	/// Code phase [chips]
	pub delay:f32,
	pub doppler:f32,
	pub magnitude:f32,
	pub success:bool,
	pub count:u64,
}

impl AcquisitionResult {

	/// Encoded size of one result [bytes]
	pub const RECORD_LEN:usize = 32;

	/// Placeholder for a satellite that has not been searched yet
	pub fn empty(sv:usize) -> Self {
		Self { tier: Tier::Strong, sv, delay: 0.0, doppler: 0.0, magnitude: 0.0, success: false, count: 0 }
	}

	/// Converts a correlation peak into a result.  The peak index counts samples into the
	/// code period, which maps to a code phase counted back from the end of the code.
	pub fn from_peak(tier:Tier, sv:usize, peak:&search::Peak, fs:f64, threshold:f32, count:u64) -> Self {
		let delay = gps::CODE_CHIPS - (peak.index as f64) * gps::CODE_RATE / fs;
		let magnitude = peak.magnitude as f32;
		Self { tier, sv, delay: delay as f32, doppler: peak.doppler_hz as f32, magnitude, success: magnitude > threshold, count }
	}

	/// Fixed little-endian record: tier, sv, delay, doppler, magnitude, success, count
	pub fn encode<W: Write>(&self, w:&mut W) -> std::io::Result<()> {
		w.write_u32::<LittleEndian>(self.tier.code())?;
		w.write_u32::<LittleEndian>(self.sv as u32)?;
		w.write_f32::<LittleEndian>(self.delay)?;
		w.write_f32::<LittleEndian>(self.doppler)?;
		w.write_f32::<LittleEndian>(self.magnitude)?;
		w.write_u32::<LittleEndian>(self.success as u32)?;
		w.write_u64::<LittleEndian>(self.count)?;
		Ok(())
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		let mut ans:Vec<u8> = Vec::with_capacity(Self::RECORD_LEN);
		// Writing into a Vec cannot fail
		let _ = self.encode(&mut ans);
		ans
	}

	pub fn decode<R: Read>(r:&mut R) -> Result<Self, AcqError> {
		let tier_code = r.read_u32::<LittleEndian>()?;
		let tier = Tier::from_code(tier_code)
			.ok_or_else(|| AcqError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown tier code {}", tier_code))))?;
		let sv = r.read_u32::<LittleEndian>()? as usize;
		let delay = r.read_f32::<LittleEndian>()?;
		let doppler = r.read_f32::<LittleEndian>()?;
		let magnitude = r.read_f32::<LittleEndian>()?;
		let success = r.read_u32::<LittleEndian>()? != 0;
		let count = r.read_u64::<LittleEndian>()?;
		Ok(Self { tier, sv, delay, doppler, magnitude, success, count })
	}

}
