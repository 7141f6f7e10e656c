
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use serde::{Serialize, Deserialize};
use tokio::sync::watch;

use crate::{AcqError, RawSample};
use crate::config::ReceiverConfig;

pub mod agc;

use self::agc::Agc;


/// Identifies a reader of the sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerId {
	Channel(usize),
	Acquisition,
}

/// One millisecond of gain-controlled samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
	pub samples:Vec<RawSample>,
	/// Sequence number of the frame since the first ingest
	pub count:u64,
	/// Measurement epoch, present on every measurement_interval_ms-th frame
	pub measurement:Option<u64>,
}

/// Snapshot of the buffer for the monitoring sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStatus {
	/// Measurement epoch of the most recently released tagged frame, counting from 1 at the
	/// first tagged frame after warm-up
	pub tic:u64,
	/// Sequence number of the frame that carried `tic`
	pub count:u64,
	pub head:usize,
	pub tail:usize,
	pub len:usize,
	pub agc_scale:i32,
	/// Components clipped by the AGC in the last buffered frame
	pub clips:u32,
	pub overflows:u64,
}

struct Slot {
	frame:SampleFrame,
	consumed:Vec<bool>,
}

struct Fifo {
	slots:Vec<Slot>,
	// Next slot to write
	head:usize,
	tail:usize,
	len:usize,
	overflows:u64,
	last_read:Vec<Option<u64>>,
	status:BufferStatus,
}

struct Producer {
	agc:Agc,
	frames_seen:u64,
	// Tagged frames buffered so far
	tics:u64,
	scratch:Vec<RawSample>,
}

/// Fixed-capacity single-producer, multi-consumer frame buffer.  The oldest frame is only
/// released once every required consumer has read it; a full buffer overwrites it instead.
pub struct RingBuffer {
	samples_per_ms:usize,
	num_channels:usize,
	warmup:u64,
	measurement_interval:u64,
	backoff:Duration,
	producer:Mutex<Producer>,
	fifo:Mutex<Fifo>,
	active:Vec<AtomicBool>,
	status_tx:watch::Sender<BufferStatus>,
}

fn lock<T>(m:&Mutex<T>) -> MutexGuard<T> {
	m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Fifo {

	fn capacity(&self) -> usize { self.slots.len() }

	fn newest_count(&self) -> Option<u64> {
		if self.len == 0 { None } else { Some(self.slots[self.tail].frame.count + (self.len as u64) - 1) }
	}

	fn snapshot(&self) -> BufferStatus {
		BufferStatus {
			head: self.head,
			tail: self.tail,
			len: self.len,
			overflows: self.overflows,
			..self.status
		}
	}

}

impl RingBuffer {

	pub fn new(cfg:&ReceiverConfig) -> Result<Self, AcqError> {
		let samples_per_ms = cfg.samples_per_ms();
		let capacity = cfg.buffer_capacity;
		let num_consumers = cfg.num_channels + 1;

		let mut slots:Vec<Slot> = Vec::new();
		slots.try_reserve_exact(capacity).map_err(|_| AcqError::Allocation("sample buffer"))?;
		for _ in 0..capacity {
			let mut samples:Vec<RawSample> = Vec::new();
			samples.try_reserve_exact(samples_per_ms).map_err(|_| AcqError::Allocation("sample buffer"))?;
			samples.resize(samples_per_ms, RawSample{ re: 0, im: 0 });
			slots.push(Slot{ frame: SampleFrame{ samples, count: 0, measurement: None }, consumed: vec![false; num_consumers] });
		}

		let fifo = Fifo { slots, head: 0, tail: 0, len: 0, overflows: 0, last_read: vec![None; num_consumers], status: BufferStatus::default() };
		let producer = Producer { agc: Agc::default(), frames_seen: 0, tics: 0, scratch: vec![RawSample{ re: 0, im: 0 }; samples_per_ms] };

		// Tracking channels start out active, acquisition only while it collects
		let active:Vec<AtomicBool> = (0..num_consumers).map(|idx| AtomicBool::new(idx < cfg.num_channels)).collect();

		let (status_tx, _) = watch::channel(BufferStatus::default());

		Ok(Self {
			samples_per_ms,
			num_channels: cfg.num_channels,
			warmup: cfg.agc_warmup_frames,
			measurement_interval: cfg.measurement_interval_ms.max(1),
			backoff: Duration::from_micros(cfg.consume_backoff_us),
			producer: Mutex::new(producer),
			fifo: Mutex::new(fifo),
			active,
			status_tx,
		})
	}

	pub fn samples_per_ms(&self) -> usize { self.samples_per_ms }
	pub fn num_channels(&self) -> usize { self.num_channels }
	pub fn capacity(&self) -> usize { lock(&self.fifo).capacity() }

	fn consumer_idx(&self, id:ConsumerId) -> Result<usize, AcqError> {
		match id {
			ConsumerId::Channel(i) if i < self.num_channels => Ok(i),
			ConsumerId::Channel(i) => Err(AcqError::UnknownConsumer(i)),
			ConsumerId::Acquisition => Ok(self.num_channels),
		}
	}

	/// Runs the AGC on one raw frame and appends it.  The first frame only initializes the
	/// gain and the warm-up frames only run it, so the first buffered frame has count
	/// max(warmup, 1).
	pub fn ingest(&self, raw:&[RawSample]) -> Result<(), AcqError> {
		if raw.len() != self.samples_per_ms {
			return Err(AcqError::FrameLength{ expected: self.samples_per_ms, got: raw.len() });
		}

		let mut producer = lock(&self.producer);
		let count = producer.frames_seen;
		producer.frames_seen += 1;

		if count == 0 {
			producer.agc.init(raw);
			return Ok(());
		}

		let Producer{ agc, scratch, tics, .. } = &mut *producer;
		let clips = agc.run(raw, scratch);
		if count < self.warmup { return Ok(()); }

		let mut fifo = lock(&self.fifo);
		if fifo.len == fifo.capacity() {
			let cap = fifo.capacity();
			fifo.tail = (fifo.tail + 1) % cap;
			fifo.len -= 1;
			fifo.overflows += 1;
			if fifo.overflows == 1 || fifo.overflows % 1000 == 0 {
				warn!("Sample buffer overflow, {} frames dropped so far", fifo.overflows);
			}
		}

		let measurement = if count % self.measurement_interval == 0 {
			*tics += 1;
			Some(*tics)
		} else { None };
		let head = fifo.head;
		let slot = &mut fifo.slots[head];
		slot.frame.samples.copy_from_slice(scratch);
		slot.frame.count = count;
		slot.frame.measurement = measurement;
		for c in slot.consumed.iter_mut() { *c = false; }

		fifo.head = (head + 1) % fifo.capacity();
		fifo.len += 1;
		fifo.status.agc_scale = agc.scale();
		fifo.status.clips = clips;

		self.release(&mut fifo);
		Ok(())
	}

	// Frees tail frames every required consumer has read
	fn release(&self, fifo:&mut Fifo) {
		while fifo.len > 0 {
			let slot = &fifo.slots[fifo.tail];
			let done = slot.consumed.iter().zip(self.active.iter()).all(|(c, a)| *c || !a.load(Ordering::Acquire));
			if !done { break; }

			let released = (slot.frame.count, slot.frame.measurement);
			fifo.tail = (fifo.tail + 1) % fifo.capacity();
			fifo.len -= 1;

			if let (count, Some(tic)) = released {
				fifo.status.tic = tic;
				fifo.status.count = count;
				self.status_tx.send_replace(fifo.snapshot());
			}
		}
	}

	/// Oldest buffered frame newer than the last one `id` read, if any.  When that frame has
	/// been overwritten the consumer gets the oldest frame still buffered and sees the gap
	/// in `count`.
	pub fn try_consume(&self, id:ConsumerId) -> Result<Option<SampleFrame>, AcqError> {
		let idx = self.consumer_idx(id)?;
		let mut fifo = lock(&self.fifo);

		let newest = match fifo.newest_count() {
			Some(c) => c,
			None => return Ok(None),
		};
		let oldest = fifo.slots[fifo.tail].frame.count;
		let wanted = fifo.last_read[idx].map(|c| c + 1).unwrap_or(oldest).max(oldest);
		if wanted > newest { return Ok(None); }

		let pos = (fifo.tail + ((wanted - oldest) as usize)) % fifo.capacity();
		let slot = &mut fifo.slots[pos];
		slot.consumed[idx] = true;
		let frame = slot.frame.clone();
		fifo.last_read[idx] = Some(wanted);

		self.release(&mut fifo);
		Ok(Some(frame))
	}

	/// Polls until a frame is available for `id`; None once `running` clears
	pub fn consume(&self, id:ConsumerId, running:&AtomicBool) -> Result<Option<SampleFrame>, AcqError> {
		loop {
			if !running.load(Ordering::Relaxed) { return Ok(None); }
			if let Some(frame) = self.try_consume(id)? { return Ok(Some(frame)); }
			std::thread::sleep(self.backoff);
		}
	}

	/// Adds `id` to or removes it from the set of consumers that hold the tail
	pub fn register_active(&self, id:ConsumerId, active:bool) -> Result<(), AcqError> {
		let idx = self.consumer_idx(id)?;
		self.active[idx].store(active, Ordering::Release);
		debug!("{:?} {}", id, if active { "active" } else { "inactive" });
		if !active {
			let mut fifo = lock(&self.fifo);
			self.release(&mut fifo);
		}
		Ok(())
	}

	pub fn is_active(&self, id:ConsumerId) -> Result<bool, AcqError> {
		Ok(self.active[self.consumer_idx(id)?].load(Ordering::Acquire))
	}

	pub fn status(&self) -> BufferStatus { lock(&self.fifo).snapshot() }

	pub fn overflows(&self) -> u64 { lock(&self.fifo).overflows }

	/// Receives a new status each time a measurement-tagged frame leaves the buffer
	pub fn subscribe(&self) -> watch::Receiver<BufferStatus> { self.status_tx.subscribe() }

}
