//! Attendance session lifecycle.
//!
//! Startup runs strictly in order: load models, build the reference gallery,
//! mark the session ready, then start sampling. A model loading failure
//! leaves the session in [`Readiness::Loading`] for good.

use crate::analyzer::{FaceAnalyzer, FrameSource};
use crate::gallery::{build_reference_set, ImageSource};
use crate::identity::IdentityTable;
use crate::sampler::{self, SamplerConfig, SamplerHandle};
use crate::tracker::AttendanceTracker;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Models or reference gallery not available yet.
    Loading,
    /// Gallery built and sampling running.
    Ready,
}

/// Running session. Dropping the handle tears the session down.
pub struct SessionHandle {
    tracker: Arc<AttendanceTracker>,
    readiness: watch::Receiver<Readiness>,
    /// Startup task: models, gallery, then handing over to the sampler.
    startup: JoinHandle<()>,
    sampler: Arc<Mutex<Option<SamplerHandle>>>,
}

/// Start a session over `frames`, recognizing the people in `identities`.
pub fn start<A, F, I>(
    analyzer: Arc<A>,
    frames: F,
    images: I,
    identities: Arc<IdentityTable>,
    config: SamplerConfig,
) -> SessionHandle
where
    A: FaceAnalyzer,
    F: FrameSource,
    I: ImageSource + Send + Sync + 'static,
{
    let tracker = Arc::new(AttendanceTracker::new());
    let (ready_tx, readiness) = watch::channel(Readiness::Loading);
    let session_tracker = Arc::clone(&tracker);
    let sampler_slot = Arc::new(Mutex::new(None));
    let session_sampler = Arc::clone(&sampler_slot);

    let startup = tokio::spawn(async move {
        if let Err(err) = analyzer.load_models().await {
            tracing::error!(error = %err, "model loading failed; session stays in loading state");
            return;
        }
        tracing::info!("face models loaded");

        let reference = build_reference_set(&identities, analyzer.as_ref(), &images).await;
        ready_tx.send_replace(Readiness::Ready);
        tracing::info!(identities = identities.len(), "session ready");

        // No await between spawning and parking the handle, so an abort of
        // this task cannot strand a running sampler.
        let handle = sampler::spawn(analyzer, frames, Arc::new(reference), session_tracker, config);
        *session_sampler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    });

    SessionHandle {
        tracker,
        readiness,
        startup,
        sampler: sampler_slot,
    }
}

impl SessionHandle {
    /// Read-only access to the roster.
    pub fn tracker(&self) -> &Arc<AttendanceTracker> {
        &self.tracker
    }

    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    /// Receiver that observes readiness transitions.
    pub fn readiness_watch(&self) -> watch::Receiver<Readiness> {
        self.readiness.clone()
    }

    /// Stop startup or sampling, whichever is in progress, and wait for it to end.
    pub async fn shutdown(mut self) {
        self.startup.abort();
        let _ = (&mut self.startup).await;

        let sampler = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sampler) = sampler {
            sampler.stop().await;
        }
        tracing::info!(admitted = self.tracker.len(), "session stopped");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // A parked sampler is dropped with the slot, which aborts it.
        self.startup.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{identity, wait_until, FakeAnalyzer, FakeImages};
    use crate::types::Frame;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const FAST: SamplerConfig = SamplerConfig {
        interval: Duration::from_millis(10),
        threshold: 0.6,
    };

    fn live_feed() -> watch::Receiver<Option<Arc<Frame>>> {
        let (tx, rx) = watch::channel(Some(Arc::new(Frame::new(vec![0u8; 16], 4, 4, 100))));
        // Keep the latest frame available after the sender goes away.
        drop(tx);
        rx
    }

    fn alice_and_bob() -> (Arc<IdentityTable>, FakeImages) {
        let table = IdentityTable::new(vec![
            identity("Alice", &["alice.jpg"]),
            identity("Bob", &["bob.jpg"]),
        ])
        .unwrap();
        (Arc::new(table), FakeImages::new(&["alice.jpg", "bob.jpg"]))
    }

    #[tokio::test]
    async fn test_session_becomes_ready_and_admits() {
        let (table, images) = alice_and_bob();
        // A single live batch: if sampling started before the gallery was
        // built, it would be classified as unknown and Alice never admitted.
        let analyzer = Arc::new(
            FakeAnalyzer::new()
                .with_face(images.sequence_of("alice.jpg"), vec![0.0, 0.0])
                .with_face(images.sequence_of("bob.jpg"), vec![9.0, 9.0])
                .with_batch(vec![vec![0.05, 0.0]]),
        );

        let session = start(Arc::clone(&analyzer), live_feed(), images, table, FAST);

        wait_until(|| session.readiness() == Readiness::Ready).await;
        wait_until(|| session.tracker().contains("Alice")).await;
        assert_eq!(session.tracker().len(), 1);
        assert_eq!(analyzer.loads.load(Ordering::SeqCst), 1);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_model_load_failure_stays_loading() {
        let (table, images) = alice_and_bob();
        let analyzer = Arc::new(FakeAnalyzer::new().with_load_failure());

        let session = start(Arc::clone(&analyzer), live_feed(), images, table, FAST);

        wait_until(|| analyzer.loads.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.readiness(), Readiness::Loading);
        assert_eq!(analyzer.live_calls.load(Ordering::SeqCst), 0);
        assert!(session.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_sampling() {
        let (table, images) = alice_and_bob();
        let analyzer = Arc::new(FakeAnalyzer::new());

        let session = start(Arc::clone(&analyzer), live_feed(), images, table, FAST);
        wait_until(|| analyzer.live_calls.load(Ordering::SeqCst) > 0).await;

        let tracker = Arc::clone(session.tracker());
        session.shutdown().await;
        let calls = analyzer.live_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(analyzer.live_calls.load(Ordering::SeqCst), calls);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_detection() {
        let (table, images) = alice_and_bob();
        let analyzer = Arc::new(FakeAnalyzer::new().with_delay(Duration::from_secs(5)));

        let session = start(Arc::clone(&analyzer), live_feed(), images, table, FAST);
        wait_until(|| analyzer.live_calls.load(Ordering::SeqCst) > 0).await;

        session.shutdown().await;
        assert_eq!(Arc::strong_count(&analyzer), 1);
    }

    #[tokio::test]
    async fn test_readiness_watch_observes_transition() {
        let (table, images) = alice_and_bob();
        let session = start(Arc::new(FakeAnalyzer::new()), live_feed(), images, table, FAST);

        let mut watch = session.readiness_watch();
        watch.wait_for(|r| *r == Readiness::Ready).await.unwrap();
        assert_eq!(session.readiness(), Readiness::Ready);
    }
}
