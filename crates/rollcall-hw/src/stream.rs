//! Live camera stream: a capture thread publishing the latest frame.

use crate::camera::{Camera, CameraError};
use crate::frame::is_dark_frame;
use rollcall_core::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;

/// Fraction of near-black pixels above which a frame counts as dark.
const DARK_FRAME_THRESHOLD: f32 = 0.95;

/// Consecutive capture failures tolerated before the thread gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

pub type FrameReceiver = watch::Receiver<Option<Arc<Frame>>>;

/// Owns the capture thread for one camera.
///
/// The newest usable frame is published through a `watch` channel; `None`
/// means no frame is available (not started yet, dark, or capture lost).
/// Stopping or dropping the stream joins the thread and releases the device.
pub struct CameraStream {
    frames: FrameReceiver,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    device_path: Option<String>,
}

impl CameraStream {
    /// Open `device_path` and start capturing.
    ///
    /// The first `warmup_frames` frames are discarded while exposure settles.
    pub fn start(
        device_path: &str,
        width: u32,
        height: u32,
        warmup_frames: usize,
    ) -> Result<Self, CameraError> {
        let camera = Camera::open(device_path, width, height)?;
        let (tx, rx) = watch::channel(None);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("rollcall-capture".into())
            .spawn(move || capture_loop(camera, tx, thread_stop, warmup_frames))
            .map_err(|e| CameraError::CaptureFailed(format!("failed to spawn capture thread: {e}")))?;

        Ok(Self {
            frames: rx,
            stop,
            thread: Some(thread),
            device_path: Some(device_path.to_string()),
        })
    }

    /// A stream with no camera behind it. It never yields a frame.
    pub fn unavailable() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self {
            frames: rx,
            stop: Arc::new(AtomicBool::new(true)),
            thread: None,
            device_path: None,
        }
    }

    /// Receiver for the latest frame; usable as a `FrameSource`.
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// Whether the capture thread is still running.
    pub fn is_live(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn device_path(&self) -> Option<&str> {
        self.device_path.as_deref()
    }

    /// Stop capturing and wait for the capture thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("capture thread panicked");
            }
            tracing::info!(device = ?self.device_path, "camera stream stopped");
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    camera: Camera,
    tx: watch::Sender<Option<Arc<Frame>>>,
    stop: Arc<AtomicBool>,
    warmup_frames: usize,
) {
    let mut stream = match camera.stream() {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(device = %camera.device_path, error = %err, "failed to start streaming");
            return;
        }
    };

    tracing::info!(device = %camera.device_path, warmup_frames, "capture thread started");
    publish_frames(|| camera.next_frame(&mut stream), &tx, &stop, warmup_frames);
    tracing::debug!(device = %camera.device_path, "capture thread exiting");
}

/// Pull frames from `next` until `stop` is set or capture fails for good.
///
/// Timeouts only give the loop a chance to observe `stop`; they neither
/// publish anything nor count as failures. `None` is published on exit.
fn publish_frames(
    mut next: impl FnMut() -> Result<Frame, CameraError>,
    tx: &watch::Sender<Option<Arc<Frame>>>,
    stop: &AtomicBool,
    warmup_frames: usize,
) {
    let mut discarded = 0usize;
    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::Relaxed) {
        let frame = match next() {
            Ok(frame) => {
                consecutive_errors = 0;
                frame
            }
            Err(CameraError::Timeout(_)) => continue,
            Err(err) => {
                consecutive_errors += 1;
                tracing::warn!(error = %err, consecutive_errors, "frame capture failed");
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    tracing::error!("too many capture failures; stopping camera");
                    break;
                }
                continue;
            }
        };

        if discarded < warmup_frames {
            discarded += 1;
            continue;
        }

        if is_dark_frame(&frame.data, DARK_FRAME_THRESHOLD) {
            tracing::debug!(seq = frame.sequence, "dark frame");
            tx.send_replace(None);
            continue;
        }

        tx.send_replace(Some(Arc::new(frame)));
    }

    tx.send_replace(None);
}
