
use num_complex::Complex;
use thiserror::Error;

pub mod buffer;
pub mod config;
pub mod fourier_analysis;
pub mod gnss;
pub mod io;
pub mod types;
pub mod utils;

/// Fixed-point complex value used from baseband mixing onwards
pub type Cpx = Complex<i32>;

/// Raw complex sample as delivered by the front end and stored in the sample buffer
pub type RawSample = Complex<i16>;

#[derive(Debug, Error)]
pub enum AcqError {
	#[error("frame has {got} samples, expected {expected}")]
	FrameLength{ expected:usize, got:usize },

	#[error("unknown consumer channel {0}")]
	UnknownConsumer(usize),

	/// Core buffers could not be allocated at startup
	#[error("unable to allocate {0}")]
	Allocation(&'static str),

	/// Search attempted without a complete collection window for the current tier
	#[error("collection window holds {got} samples, {needed} needed")]
	ShortWindow{ needed:usize, got:usize },

	#[error("code bank unavailable: {0}")]
	CodeBank(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("unable to set real-time priority: {0}")]
	Priority(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
