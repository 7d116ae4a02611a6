//! Frame sampler: periodic detection over the live feed.
//!
//! Every tick grabs the latest frame, runs multi-face detection, classifies
//! each descriptor and forwards the result to the attendance tracker. Each
//! tick runs as its own task, so a slow detector produces overlapping ticks
//! rather than a stalled timer.

use crate::analyzer::{FaceAnalyzer, FrameSource};
use crate::gallery::ReferenceSet;
use crate::matcher::{find_best, DEFAULT_MATCH_THRESHOLD};
use crate::tracker::AttendanceTracker;
use crate::types::{AttendanceRecord, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// Default sampling period.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub threshold: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Handle to a running sampler. Dropping it stops sampling.
pub struct SamplerHandle {
    task: JoinHandle<()>,
    stop_signal: Option<oneshot::Sender<()>>,
}

impl SamplerHandle {
    /// Cancel the timer and every in-flight tick, and wait until all of them
    /// have ended.
    pub async fn stop(mut self) {
        if let Some(signal) = self.stop_signal.take() {
            let _ = signal.send(());
        }
        if let Err(err) = (&mut self.task).await {
            if err.is_panic() {
                tracing::error!(error = %err, "sampler loop panicked");
            }
        }
        tracing::debug!("sampler stopped");
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start sampling `frames` on the configured period.
///
/// Must only be called once `reference` is fully built.
pub fn spawn<A, F>(
    analyzer: Arc<A>,
    frames: F,
    reference: Arc<ReferenceSet>,
    tracker: Arc<AttendanceTracker>,
    config: SamplerConfig,
) -> SamplerHandle
where
    A: FaceAnalyzer,
    F: FrameSource,
{
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Aborted together with this loop if the task itself is aborted.
        let mut in_flight = JoinSet::new();
        let mut tick: u64 = 0;

        tracing::info!(
            interval_ms = config.interval.as_millis() as u64,
            threshold = config.threshold,
            "sampler started"
        );

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    tick += 1;
                    let Some(frame) = frames.latest() else {
                        tracing::trace!(tick, "no frame available");
                        continue;
                    };
                    in_flight.spawn(run_tick(
                        tick,
                        Arc::clone(&analyzer),
                        frame,
                        Arc::clone(&reference),
                        Arc::clone(&tracker),
                        config.threshold,
                    ));
                }
                Some(joined) = in_flight.join_next() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            tracing::error!(error = %err, "sampling tick panicked");
                        }
                    }
                }
            }
        }

        in_flight.shutdown().await;
    });

    SamplerHandle {
        task,
        stop_signal: Some(stop_tx),
    }
}

/// Run detection over one frame and admit every recognized face.
///
/// Detection errors are logged; the tick yields no records.
pub async fn run_tick<A: FaceAnalyzer>(
    tick: u64,
    analyzer: Arc<A>,
    frame: Arc<Frame>,
    reference: Arc<ReferenceSet>,
    tracker: Arc<AttendanceTracker>,
    threshold: f32,
) -> Vec<AttendanceRecord> {
    let descriptors = match analyzer.detect_all(&frame).await {
        Ok(descriptors) => descriptors,
        Err(err) => {
            tracing::error!(tick, seq = frame.sequence, error = %err, "face detection failed");
            return Vec::new();
        }
    };

    tracing::trace!(tick, seq = frame.sequence, faces = descriptors.len(), "frame analysed");

    let mut admitted = Vec::new();
    for descriptor in descriptors {
        let result = find_best(descriptor, &reference, threshold);
        tracing::trace!(tick, label = %result.label, distance = result.distance, "face classified");
        if let Some(record) = tracker.admit(&result) {
            tracing::info!(
                identity = %record.identity,
                timestamp = %record.timestamp.with_timezone(&chrono::Local),
                "attendance marked"
            );
            admitted.push(record);
        }
    }
    admitted
}
