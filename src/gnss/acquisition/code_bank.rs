
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use serde::{Serialize, Deserialize};

use crate::{AcqError, Cpx};
use crate::fourier_analysis::SpectralTransform;
use crate::gnss::gps_l1_ca::signal_modulation;

/// Spectra of the sampled C/A codes, one per satellite, indexed by zero-based sv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBank {
	samples_per_ms:usize,
	codes:Vec<Vec<Cpx>>,
}

impl CodeBank {

	/// Forward transforms of PRN 1 through `num_codes` sampled at `fs`
	pub fn generate<T: SpectralTransform>(num_codes:usize, fs:f64, transform:&mut T) -> Result<Self, AcqError> {
		let samples_per_ms = transform.len();
		let mut codes:Vec<Vec<Cpx>> = Vec::with_capacity(num_codes);
		for prn in 1..=num_codes {
			let chips = signal_modulation::prn_int_sampled(prn, fs)
				.ok_or_else(|| AcqError::CodeBank(format!("no C/A code for PRN {}", prn)))?;
			if chips.len() != samples_per_ms {
				return Err(AcqError::CodeBank(format!("PRN {} sampled to {} samples, transform length is {}", prn, chips.len(), samples_per_ms)));
			}

			let mut spectrum:Vec<Cpx> = chips.into_iter().map(|c| Cpx{ re: c as i32, im: 0 }).collect();
			transform.forward(&mut spectrum);
			codes.push(spectrum);
		}
		Ok(Self { samples_per_ms, codes })
	}

	/// Loads a bank written by `save`, checking it against the expected shape
	pub fn load<P: AsRef<Path>>(path:P, num_codes:usize, samples_per_ms:usize) -> Result<Self, AcqError> {
		let file = File::open(path.as_ref())
			.map_err(|e| AcqError::CodeBank(format!("{}: {}", path.as_ref().display(), e)))?;
		let bank:Self = serde_json::from_reader(BufReader::new(file))
			.map_err(|e| AcqError::CodeBank(format!("{}: {}", path.as_ref().display(), e)))?;

		if bank.samples_per_ms != samples_per_ms || bank.codes.iter().any(|c| c.len() != samples_per_ms) {
			return Err(AcqError::CodeBank(format!("bank holds {}-sample codes, expected {}", bank.samples_per_ms, samples_per_ms)));
		}
		if bank.codes.len() < num_codes {
			return Err(AcqError::CodeBank(format!("bank holds {} codes, expected {}", bank.codes.len(), num_codes)));
		}

		info!("Loaded {} code spectra from {}", bank.codes.len(), path.as_ref().display());
		Ok(bank)
	}

	pub fn save<P: AsRef<Path>>(&self, path:P) -> Result<(), AcqError> {
		serde_json::to_writer(BufWriter::new(File::create(path)?), self)?;
		Ok(())
	}

	pub fn len(&self) -> usize { self.codes.len() }
	pub fn is_empty(&self) -> bool { self.codes.is_empty() }
	pub fn samples_per_ms(&self) -> usize { self.samples_per_ms }

	pub fn code(&self, sv:usize) -> Option<&[Cpx]> { self.codes.get(sv).map(|c| &c[..]) }

}
