use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
	normalize::Normalizer,
	snapshot::RawSnapshot,
	source::{SourceError, StatusSource},
	statsd::MetricSink,
};

#[derive(Error, Debug)]
pub enum CycleError {
	#[error("error fetching status: {0}")]
	Source(#[from] SourceError),
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
	pub emitted: usize,
	pub failed_fields: usize,
	pub send_failures: usize,
}

/// Polls a status source, normalizes the snapshot and forwards numeric values to a sink.
pub struct Reporter<S, M> {
	source: S,
	sink: M,
	normalizer: Normalizer,
	fetch_timeout: Duration,
}

impl<S: StatusSource, M: MetricSink> Reporter<S, M> {
	pub fn new(source: S, sink: M, normalizer: Normalizer, fetch_timeout: Duration) -> Self {
		Self {
			source,
			sink,
			normalizer,
			fetch_timeout,
		}
	}

	pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
		let status = timeout(self.fetch_timeout, self.source.fetch()).await.map_err(|_| SourceError::Timeout(self.fetch_timeout))??;
		let snapshot = RawSnapshot::parse(&status);
		if snapshot.is_empty() {
			warn!("status output contained no fields");
		}
		let normalized = self.normalizer.normalize(&snapshot);
		debug!("{} of {} fields watched and converted", normalized.metrics.len(), snapshot.len());

		let mut report = CycleReport {
			failed_fields: normalized.failures.len(),
			..Default::default()
		};
		for failure in &normalized.failures {
			warn!("skipping field {failure}");
		}
		for (name, value) in normalized.metrics.numeric() {
			debug!("{name} = {value}");
			match self.sink.histogram(name, value).await {
				Ok(()) => report.emitted += 1,
				Err(e) => {
					warn!("failed to send {name}: {e}");
					report.send_failures += 1;
				},
			}
		}
		Ok(report)
	}

	/// Run one cycle per `period` until `shutdown` resolves. Returns the number of cycles started.
	///
	/// The first cycle starts immediately. A cycle that overruns delays the next tick instead of bunching them up.
	/// A cycle still in flight when `shutdown` resolves is dropped.
	pub async fn run(&mut self, period: Duration, shutdown: impl Future<Output = ()>) -> u64 {
		let mut ticker = interval(period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		tokio::pin!(shutdown);

		let mut cycles = 0;
		loop {
			tokio::select! {
				_ = &mut shutdown => {
					info!("shutting down after {cycles} cycles");
					return cycles;
				}
				_ = ticker.tick() => {}
			}
			cycles += 1;
			tokio::select! {
				_ = &mut shutdown => {
					info!("shutting down during cycle {cycles}");
					return cycles;
				}
				result = self.run_cycle() => match result {
					Ok(report) => debug!(?report, "cycle {cycles} done"),
					Err(e) => error!("cycle {cycles} failed: {e}"),
				}
			}
		}
	}
}
