
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::AcqError;

use super::AcquisitionResult;

/// Text file holding the latest result of every satellite, rewritten after each cycle
pub struct DiagnosticReport {
	path:PathBuf,
	results:Vec<AcquisitionResult>,
}

impl DiagnosticReport {

	pub fn new<P: AsRef<Path>>(path:P, num_codes:usize) -> Self {
		Self { path: path.as_ref().to_path_buf(), results: (0..num_codes).map(AcquisitionResult::empty).collect() }
	}

	pub fn path(&self) -> &Path { &self.path }

	pub fn results(&self) -> &[AcquisitionResult] { &self.results }

	pub fn update(&mut self, result:&AcquisitionResult) {
		if let Some(r) = self.results.get_mut(result.sv) { *r = *result; }
	}

	/// One `tier,prn,delay,doppler,magnitude,success` line per satellite
	pub fn render(&self) -> String {
		self.results.iter().map(|r| format!("{:02},{:02},{:10.2},{:10.0},{:15.0},{:1}\n",
			r.tier.code(), r.sv + 1, r.delay, r.doppler, r.magnitude, r.success as u8)).collect()
	}

	pub fn write(&self) -> Result<(), AcqError> {
		let mut w = BufWriter::new(File::create(&self.path)?);
		w.write_all(self.render().as_bytes())?;
		w.flush()?;
		Ok(())
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use crate::gnss::acquisition::Tier;

	#[test]
	fn lines_follow_fixed_format() {
		let dir = tempfile::tempdir().unwrap();
		let mut report = DiagnosticReport::new(dir.path().join("Acq.txt"), 2);
		report.update(&AcquisitionResult{ tier: Tier::Medium, sv: 1, delay: 512.25, doppler: -3025.0, magnitude: 1830.0, success: true, count: 40 });
		// Satellites outside the report are ignored
		report.update(&AcquisitionResult::empty(9));
		report.write().unwrap();

		let text = std::fs::read_to_string(report.path()).unwrap();
		let lines:Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 2);
		assert_eq!(lines[0], "00,01,      0.00,         0,              0,0");
		assert_eq!(lines[1], "01,02,    512.25,     -3025,           1830,1");
	}

}
