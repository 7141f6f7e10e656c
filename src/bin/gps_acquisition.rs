extern crate clap;
extern crate colored;
extern crate gps_acquisition;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Arg, App, ArgMatches};
use colored::*;
use log::{info, warn};
use tokio::sync::mpsc;

use gps_acquisition::AcqError;
use gps_acquisition::buffer::{ConsumerId, RingBuffer};
use gps_acquisition::config::ReceiverConfig;
use gps_acquisition::fourier_analysis::RustFftTransform;
use gps_acquisition::gnss::acquisition::{AcquisitionRequest, Tier};
use gps_acquisition::gnss::acquisition::code_bank::CodeBank;
use gps_acquisition::gnss::acquisition::engine::Acquisition;
use gps_acquisition::gnss::acquisition::handoff::Handoff;
use gps_acquisition::io::FrameSource;
use gps_acquisition::utils::fixed::ScalarArithmetic;

fn parse_arg<T: FromStr>(matches:&ArgMatches, name:&str) -> Result<Option<T>, AcqError> {
	match matches.value_of(name) {
		Some(s) => s.parse().map(Some).map_err(|_| AcqError::Config(format!("unable to parse --{} value {}", name, s))),
		None => Ok(None),
	}
}

#[tokio::main]
async fn main() {
	if let Err(e) = run().await {
		eprintln!("{}", format!("{}", e).red());
		std::process::exit(1);
	}
}

async fn run() -> Result<(), AcqError> {

	let matches = App::new("GPS L1 C/A Acquisition")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Searches decimated IF samples for GPS L1 C/A signals and reports code phase and Doppler")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input file of interleaved little-endian i16 I/Q, or - for stdin")
			.required(true).takes_value(true))
		.arg(Arg::with_name("config")
			.short("c").long("config")
			.help("JSON receiver configuration")
			.takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true))
		.arg(Arg::with_name("if_freq_hz")
			.long("if_freq_hz")
			.takes_value(true))
		.arg(Arg::with_name("num_codes")
			.short("n").long("num_codes")
			.help("Search PRN 1 through this number")
			.takes_value(true))
		.arg(Arg::with_name("channels")
			.long("channels")
			.help("Tracking consumers draining the sample buffer")
			.takes_value(true))
		.arg(Arg::with_name("report")
			.short("r").long("report")
			.help("Diagnostic report, rewritten every cycle")
			.takes_value(true))
		.arg(Arg::with_name("code_bank")
			.long("code_bank")
			.help("Load code spectra from this file instead of generating them")
			.takes_value(true))
		.arg(Arg::with_name("save_code_bank")
			.long("save_code_bank")
			.help("Write the code spectra in use to this file")
			.takes_value(true))
		.arg(Arg::with_name("results")
			.short("o").long("results")
			.help("Append every result to this file as fixed 32-byte records")
			.takes_value(true))
		.arg(Arg::with_name("weak")
			.long("weak")
			.help("Start with a WEAK search for this PRN")
			.takes_value(true))
		.arg(Arg::with_name("priority")
			.long("priority")
			.help("SCHED_FIFO priority for the acquisition thread")
			.takes_value(true))
		.arg(Arg::with_name("realtime")
			.long("realtime")
			.help("Feed frames at one per millisecond instead of as fast as possible"))
		.get_matches();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let mut cfg = match matches.value_of("config") {
		Some(path) => ReceiverConfig::from_file(path)?,
		None => ReceiverConfig::default(),
	};
	if let Some(fs) = parse_arg(&matches, "sample_rate_sps")? { cfg.sample_rate_hz = fs; }
	if let Some(fif) = parse_arg(&matches, "if_freq_hz")? { cfg.if_freq_hz = fif; }
	if let Some(n) = parse_arg(&matches, "num_codes")? { cfg.num_codes = n; }
	if let Some(n) = parse_arg(&matches, "channels")? { cfg.num_channels = n; }
	if let Some(p) = parse_arg(&matches, "priority")? { cfg.priority = Some(p); }
	if let Some(path) = matches.value_of("report") { cfg.report_path = path.into(); }
	if let Some(path) = matches.value_of("code_bank") { cfg.code_bank_path = Some(path.into()); }
	cfg.validate()?;
	let weak_prn:Option<usize> = parse_arg(&matches, "weak")?;
	let realtime = matches.is_present("realtime");

	let spm = cfg.samples_per_ms();
	let mut transform = RustFftTransform::new(spm);
	let codes = match &cfg.code_bank_path {
		Some(path) => CodeBank::load(path, cfg.num_codes, spm)?,
		None => CodeBank::generate(cfg.num_codes, cfg.sample_rate_hz, &mut transform)?,
	};
	if let Some(path) = matches.value_of("save_code_bank") {
		codes.save(path)?;
		eprintln!("Saved {} code spectra to {}", codes.len(), path);
	}

	let fname:&str = matches.value_of("filename").unwrap_or("-");
	let reader:Box<dyn Read + Send> = if fname == "-" { Box::new(std::io::stdin()) } else { Box::new(BufReader::new(File::open(fname)?)) };

	eprintln!("Acquiring PRN 1-{} from {} at {} [samples/sec], IF {} [Hz]", cfg.num_codes, fname, cfg.sample_rate_hz, cfg.if_freq_hz);

	let buffer = Arc::new(RingBuffer::new(&cfg)?);
	let running = Arc::new(AtomicBool::new(true));
	{
		let running = running.clone();
		ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
			.map_err(|e| AcqError::Config(format!("unable to install Ctrl-C handler: {}", e)))?;
	}

	let mut handoff = Handoff::new(cfg.handoff);
	let mut tracking_rx = handoff.channel("tracking");
	let mut telemetry_rx = handoff.channel("telemetry");

	let (request_tx, request_rx) = mpsc::channel::<AcquisitionRequest>(16);
	if let Some(prn) = weak_prn {
		if prn == 0 { return Err(AcqError::Config("PRN numbers start at 1".to_string())); }
		request_tx.try_send(AcquisitionRequest::new(prn - 1, Tier::Weak))
			.map_err(|e| AcqError::Config(format!("unable to queue request: {}", e)))?;
	}

	let acq = Acquisition::new(&cfg, Arc::new(codes), transform, ScalarArithmetic::new(cfg.magnitude), handoff)?;

	// Sample producer
	let producer = {
		let (buffer, running) = (buffer.clone(), running.clone());
		thread::spawn(move || {
			let start = Instant::now();
			let mut frames:usize = 0;
			for (frame, idx) in FrameSource::new(reader, spm) {
				if !running.load(Ordering::Relaxed) { break; }
				if let Err(e) = buffer.ingest(&frame) {
					warn!("{}", e);
					break;
				}
				frames = idx + 1;
				if realtime {
					let due = start + Duration::from_millis(frames as u64);
					let now = Instant::now();
					if due > now { thread::sleep(due - now); }
				}
			}
			info!("Sample source done after {} frames", frames);
			running.store(false, Ordering::SeqCst);
		})
	};

	// Stand-ins for the tracking channels so the buffer keeps moving
	let drains:Vec<thread::JoinHandle<()>> = (0..cfg.num_channels).map(|chn| {
		let (buffer, running) = (buffer.clone(), running.clone());
		thread::spawn(move || {
			while let Ok(Some(_)) = buffer.consume(ConsumerId::Channel(chn), &running) {}
		})
	}).collect();

	let acquisition = {
		let (buffer, running) = (buffer.clone(), running.clone());
		thread::spawn(move || acq.run(buffer, request_rx, running))
	};

	let tracking = tokio::spawn(async move {
		let mut acquired:usize = 0;
		while let Some(r) = tracking_rx.recv().await {
			if r.success {
				acquired += 1;
				eprintln!("{}", format!("PRN {:2}: {:?} acquisition at {:.2} [chips], {:.0} [Hz], magnitude {:.0}", r.sv + 1, r.tier, r.delay, r.doppler, r.magnitude).green());
			}
		}
		acquired
	});

	let results_path = matches.value_of("results").map(String::from);
	let telemetry = tokio::spawn(async move {
		let mut out = match results_path.map(File::create) {
			Some(Ok(f)) => Some(BufWriter::new(f)),
			Some(Err(e)) => { warn!("Unable to create results file: {}", e); None },
			None => None,
		};
		let mut total:usize = 0;
		while let Some(r) = telemetry_rx.recv().await {
			total += 1;
			if let Some(w) = out.as_mut() {
				if let Err(e) = r.encode(w) { warn!("Unable to record result: {}", e); }
			}
		}
		if let Some(w) = out.as_mut() { let _ = w.flush(); }
		total
	});

	let monitor = {
		let status = buffer.subscribe();
		let running = running.clone();
		tokio::spawn(async move {
			let mut last_overflows:u64 = 0;
			while running.load(Ordering::Relaxed) {
				tokio::time::sleep(Duration::from_secs(1)).await;
				let s = *status.borrow();
				let line = format!("tic {:6} count {:8} len {:4} agc {:5} clips {:4} overflows {}", s.tic, s.count, s.len, s.agc_scale, s.clips, s.overflows);
				if s.overflows > last_overflows { eprintln!("{}", line.yellow()); } else { log::debug!("{}", line); }
				last_overflows = s.overflows;
			}
		})
	};

	let acq_result = tokio::task::spawn_blocking(move || acquisition.join()).await
		.map_err(|e| AcqError::Config(format!("acquisition task failed: {}", e)))?;
	running.store(false, Ordering::SeqCst);

	let _ = producer.join();
	for d in drains { let _ = d.join(); }
	let _ = monitor.await;
	let acquired = tracking.await.unwrap_or(0);
	let total = telemetry.await.unwrap_or(0);

	match acq_result {
		Ok(res) => res?,
		Err(_) => return Err(AcqError::Config("acquisition thread panicked".to_string())),
	}

	let status = buffer.status();
	eprintln!("{}", format!("{} of {} searches succeeded, {} frames overflowed", acquired, total, status.overflows).blue());
	Ok(())
}
