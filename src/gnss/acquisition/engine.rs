
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::{AcqError, RawSample};
use crate::buffer::{ConsumerId, RingBuffer};
use crate::config::ReceiverConfig;
use crate::fourier_analysis::SpectralTransform;
use crate::utils::fixed::BlockArithmetic;
use crate::utils::realtime;

use super::{AcquisitionRequest, AcquisitionResult, MAX_COLLECT_MS, Tier};
use super::code_bank::CodeBank;
use super::handoff::{Handoff, HandoffStats};
use super::mix_table::MixTable;
use super::prepare::{PreparedBaseband, Preparation};
use super::report::DiagnosticReport;
use super::search::{self, Correlator, fine_doppler::{self, FineDft, FinePlan}};

/// Requests held between cycles; later ones are refused once this many wait
pub const MAX_PENDING_REQUESTS:usize = 8;

/// Sweeps every satellite in the code bank, one per cycle, moving between tiers after
/// each full sweep
pub struct Acquisition<T: SpectralTransform, A: BlockArithmetic> {
	cfg:ReceiverConfig,
	codes:Arc<CodeBank>,
	mix:Arc<MixTable>,
	prep:Preparation<T, A>,
	corr:Correlator<T, A>,
	fine:FineDft,
	baseband:PreparedBaseband,
	window:Vec<RawSample>,
	sv:usize,
	tier:Tier,
	request:AcquisitionRequest,
	pending:VecDeque<AcquisitionRequest>,
	report:DiagnosticReport,
	handoff:Handoff,
}

impl<T: SpectralTransform + Clone, A: BlockArithmetic + Clone> Acquisition<T, A> {

	/// Builds the engine and allocates every buffer it will use.  Fails on an invalid
	/// configuration, a code bank of the wrong shape or an allocation failure.
	pub fn new(cfg:&ReceiverConfig, codes:Arc<CodeBank>, transform:T, arith:A, handoff:Handoff) -> Result<Self, AcqError> {
		cfg.validate()?;
		let mix = Arc::new(MixTable::new(cfg.sample_rate_hz, cfg.if_freq_hz, MAX_COLLECT_MS * cfg.samples_per_ms()));
		Self::with_mix_table(cfg, codes, mix, transform, arith, handoff)
	}

	/// As `new`, sharing an existing mix table when it was built for the same rates
	pub fn with_mix_table(cfg:&ReceiverConfig, codes:Arc<CodeBank>, mix:Arc<MixTable>, transform:T, arith:A, handoff:Handoff) -> Result<Self, AcqError> {
		cfg.validate()?;
		let spm = cfg.samples_per_ms();
		if transform.len() != spm {
			return Err(AcqError::Config(format!("transform length {} does not match {} samples per ms", transform.len(), spm)));
		}
		if codes.samples_per_ms() != spm || codes.len() < cfg.num_codes {
			return Err(AcqError::CodeBank(format!("bank of {} codes x {} samples cannot serve {} codes x {} samples", codes.len(), codes.samples_per_ms(), cfg.num_codes, spm)));
		}

		let mix = if mix.matches(cfg.sample_rate_hz, cfg.if_freq_hz) && mix.len() >= MAX_COLLECT_MS * spm { mix }
			else { Arc::new(MixTable::new(cfg.sample_rate_hz, cfg.if_freq_hz, MAX_COLLECT_MS * spm)) };

		let mut window:Vec<RawSample> = Vec::new();
		window.try_reserve_exact(MAX_COLLECT_MS * spm).map_err(|_| AcqError::Allocation("collection window"))?;
		let baseband = PreparedBaseband::new(MAX_COLLECT_MS, spm)?;

		let prep = Preparation::new(transform.clone(), arith.clone(), cfg.scaling.mix_shift);
		let corr = Correlator::new(transform, arith, cfg.scaling.corr_shift)
			.with_yield(Duration::from_micros(cfg.search_yield_us));

		Ok(Self {
			cfg: cfg.clone(),
			codes,
			mix,
			prep,
			corr,
			fine: FineDft::new(spm, cfg.scaling.dft_shift),
			baseband,
			window,
			sv: 0,
			tier: Tier::Strong,
			request: AcquisitionRequest::new(0, Tier::Strong),
			pending: VecDeque::new(),
			report: DiagnosticReport::new(&cfg.report_path, cfg.num_codes),
			handoff,
		})
	}

	pub fn sv(&self) -> usize { self.sv }
	pub fn tier(&self) -> Tier { self.tier }
	pub fn results(&self) -> &[AcquisitionResult] { self.report.results() }
	pub fn handoff_stats(&self) -> HandoffStats { self.handoff.stats() }

	/// Queues a request; one is applied at the start of each cycle.  Returns false and drops
	/// the request if the queue is full.
	pub fn request(&mut self, req:AcquisitionRequest) -> bool {
		if self.pending.len() >= MAX_PENDING_REQUESTS {
			warn!("Request queue full, dropping request for sv index {}", req.sv);
			return false;
		}
		self.pending.push_back(req);
		true
	}

	pub fn pending_requests(&self) -> usize { self.pending.len() }

	fn apply_request(&mut self) {
		if let Some(req) = self.pending.pop_front() {
			if req.sv < self.cfg.num_codes {
				info!("Request: sv {} at {:?}", req.sv + 1, req.tier);
				self.sv = req.sv;
				self.tier = req.tier;
			} else {
				warn!("Ignoring request for sv index {}, only {} codes loaded", req.sv, self.cfg.num_codes);
			}
		}
	}

	/// Collects `collect_ms` contiguous frames for the current tier.  Returns false if the
	/// run flag cleared first.
	pub fn inport(&mut self, buffer:&RingBuffer, running:&AtomicBool) -> Result<bool, AcqError> {
		let need = self.tier.collect_ms();
		buffer.register_active(ConsumerId::Acquisition, true)?;

		self.window.clear();
		let mut first:u64 = 0;
		let mut last:Option<u64> = None;
		let mut got:usize = 0;
		while got < need {
			let frame = match buffer.consume(ConsumerId::Acquisition, running)? {
				Some(f) => f,
				None => {
					buffer.register_active(ConsumerId::Acquisition, false)?;
					return Ok(false);
				}
			};

			match last {
				Some(l) if frame.count != l + 1 => {
					debug!("Frame {} follows {}, restarting collection", frame.count, l);
					self.window.clear();
					got = 0;
					first = frame.count;
				},
				None => first = frame.count,
				_ => {},
			}
			self.window.extend_from_slice(&frame.samples);
			last = Some(frame.count);
			got += 1;
		}

		buffer.register_active(ConsumerId::Acquisition, false)?;
		self.request = AcquisitionRequest{ sv: self.sv, tier: self.tier, count: first };
		Ok(true)
	}

	/// Prepares the collected window and searches it for the current satellite.  Fails with
	/// `ShortWindow` unless `inport` has collected enough samples for the current tier.
	pub fn acquire(&mut self) -> Result<AcquisitionResult, AcqError> {
		let needed = self.tier.prepare_ms() * self.cfg.samples_per_ms();
		if self.window.len() < needed {
			return Err(AcqError::ShortWindow{ needed, got: self.window.len() });
		}
		let code = self.codes.code(self.sv)
			.ok_or_else(|| AcqError::CodeBank(format!("no code for sv index {}", self.sv)))?;
		let tier = self.tier;
		let tier_cfg = match tier {
			Tier::Strong => self.cfg.strong,
			Tier::Medium => self.cfg.medium,
			Tier::Weak   => self.cfg.weak,
		};

		self.prep.prepare(&self.window, tier.prepare_ms(), &self.mix, &mut self.baseband);
		let peak = match tier {
			Tier::Strong => search::strong::search(&mut self.corr, &self.baseband, code, tier_cfg.max_bin()),
			Tier::Medium => fine_doppler::search(&mut self.corr, &mut self.fine, &self.baseband, code, tier_cfg.max_bin(), FinePlan::medium()),
			Tier::Weak   => fine_doppler::search(&mut self.corr, &mut self.fine, &self.baseband, code, tier_cfg.max_bin(), FinePlan::weak()),
		};

		Ok(AcquisitionResult::from_peak(tier, self.sv, &peak, self.cfg.sample_rate_hz, tier_cfg.threshold, self.request.count))
	}

	/// Records a result and hands it downstream
	pub fn export(&mut self, result:&AcquisitionResult) {
		if result.success {
			info!("Acquired sv {:2} {:?}: delay {:7.2} chips, doppler {:6.0} Hz, magnitude {:.0}", result.sv + 1, result.tier, result.delay, result.doppler, result.magnitude);
		} else {
			debug!("No detection for sv {:2} {:?}: magnitude {:.0}", result.sv + 1, result.tier, result.magnitude);
		}

		self.report.update(result);
		if let Err(e) = self.report.write() {
			warn!("Unable to write {}: {}", self.report.path().display(), e);
		}
		self.handoff.publish(result);
	}

	/// Moves to the next satellite, and to the next tier after the last one
	pub fn update_state(&mut self) {
		self.sv += 1;
		if self.sv >= self.cfg.num_codes {
			self.sv = 0;
			self.tier = self.tier.next();
			debug!("Sweep complete, next tier {:?}", self.tier);
		}
	}

	/// One full cycle; None if the run flag cleared while collecting
	pub fn cycle(&mut self, buffer:&RingBuffer, running:&AtomicBool) -> Result<Option<AcquisitionResult>, AcqError> {
		self.apply_request();
		if !self.inport(buffer, running)? { return Ok(None); }
		let result = self.acquire()?;
		self.export(&result);
		self.update_state();
		Ok(Some(result))
	}

	/// Runs cycles until `running` clears, picking up requests between cycles
	pub fn run(mut self, buffer:Arc<RingBuffer>, mut requests:mpsc::Receiver<AcquisitionRequest>, running:Arc<AtomicBool>) -> Result<(), AcqError> {
		if let Some(priority) = self.cfg.priority {
			match realtime::set_current_thread_priority(priority) {
				Ok(()) => info!("Acquisition running at SCHED_FIFO priority {}", priority),
				Err(e) => warn!("{}", e),
			}
		}

		info!("Acquisition started: {} codes, {} samples per ms", self.cfg.num_codes, self.cfg.samples_per_ms());
		while running.load(Ordering::Relaxed) {
			// Leave the rest in the bounded channel until the queue drains
			if self.pending.is_empty() {
				if let Ok(req) = requests.try_recv() { self.request(req); }
			}
			if self.cycle(&buffer, &running)?.is_none() { break; }
		}

		let stats = self.handoff.stats();
		info!("Acquisition stopped: {} results delivered, {} dropped", stats.delivered, stats.dropped);
		Ok(())
	}

}
