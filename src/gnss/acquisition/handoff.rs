
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::HandoffPolicy;

use super::AcquisitionResult;

/// Delivery counts across every sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandoffStats {
	pub delivered:u64,
	pub dropped:u64,
}

struct Sink {
	name:&'static str,
	tx:mpsc::Sender<AcquisitionResult>,
	closed:bool,
}

/// Pushes each result to every downstream sink without ever blocking on a slow one.  A
/// full sink is retried a bounded number of times and then skipped for that result.
pub struct Handoff {
	sinks:Vec<Sink>,
	policy:HandoffPolicy,
	stats:HandoffStats,
}

impl Handoff {

	pub fn new(policy:HandoffPolicy) -> Self {
		Self { sinks: vec![], policy, stats: HandoffStats::default() }
	}

	/// Creates a channel sized by the policy, attaches its sender and returns the receiver
	pub fn channel(&mut self, name:&'static str) -> mpsc::Receiver<AcquisitionResult> {
		let (tx, rx) = mpsc::channel(self.policy.capacity.max(1));
		self.add_sink(name, tx);
		rx
	}

	pub fn add_sink(&mut self, name:&'static str, tx:mpsc::Sender<AcquisitionResult>) {
		self.sinks.push(Sink{ name, tx, closed: false });
	}

	pub fn stats(&self) -> HandoffStats { self.stats }

	pub fn publish(&mut self, result:&AcquisitionResult) {
		let backoff = Duration::from_micros(self.policy.backoff_us);
		for sink in self.sinks.iter_mut().filter(|s| !s.closed) {
			let mut attempts:u32 = 0;
			loop {
				match sink.tx.try_send(*result) {
					Ok(()) => {
						self.stats.delivered += 1;
						break;
					},
					Err(TrySendError::Full(_)) if attempts < self.policy.retries => {
						attempts += 1;
						std::thread::sleep(backoff);
					},
					Err(TrySendError::Full(_)) => {
						self.stats.dropped += 1;
						if self.stats.dropped == 1 || self.stats.dropped % 100 == 0 {
							warn!("{} sink full, {} results dropped so far", sink.name, self.stats.dropped);
						}
						break;
					},
					Err(TrySendError::Closed(_)) => {
						warn!("{} sink closed, no further results will be sent to it", sink.name);
						sink.closed = true;
						break;
					},
				}
			}
		}
		debug!("Published sv {} {:?}", result.sv + 1, result.tier);
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use crate::gnss::acquisition::Tier;

	fn policy(capacity:usize) -> HandoffPolicy { HandoffPolicy{ capacity, retries: 2, backoff_us: 10 } }

	#[test]
	fn full_sink_drops_after_retries() {
		let mut handoff = Handoff::new(policy(1));
		let mut rx = handoff.channel("tracking");

		let mut r = AcquisitionResult::empty(3);
		handoff.publish(&r);
		r.tier = Tier::Medium;
		handoff.publish(&r);

		assert_eq!(handoff.stats(), HandoffStats{ delivered: 1, dropped: 1 });
		assert_eq!(rx.try_recv().unwrap().tier, Tier::Strong);
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn closed_sink_is_skipped_but_others_still_receive() {
		let mut handoff = Handoff::new(policy(4));
		let rx_closed = handoff.channel("telemetry");
		let mut rx = handoff.channel("tracking");
		drop(rx_closed);

		for sv in 0..3 { handoff.publish(&AcquisitionResult::empty(sv)); }

		assert_eq!(handoff.stats(), HandoffStats{ delivered: 3, dropped: 0 });
		let got:Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok()).map(|r| r.sv).collect();
		assert_eq!(got, vec![0, 1, 2]);
	}

}
