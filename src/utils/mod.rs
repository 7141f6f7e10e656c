
pub mod fixed;
pub mod realtime;
pub mod sinusoid;
