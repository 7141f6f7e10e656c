
pub mod gps {

	/// Chips per C/A code period
	pub const CODE_LENGTH:usize = 1023;

	/// Code length as used in delay arithmetic [chips]
	pub const CODE_CHIPS:f64 = 1023.0;

	/// C/A chipping rate [chips/sec]
	pub const CODE_RATE:f64 = 1.023e6;

	pub const SEC_PER_CHIP:f64 = 1.0 / CODE_RATE;

	/// Largest PRN the code generator knows about
	pub const MAX_PRN:usize = 37;

	/// Decimated front-end rate the receiver runs at by default [samples/sec]
	pub const SAMPLE_FREQUENCY:f64 = 2.048e6;

	/// Intermediate frequency of the default front end [Hz]
	pub const IF_FREQUENCY:f64 = 604.0e3;

}
