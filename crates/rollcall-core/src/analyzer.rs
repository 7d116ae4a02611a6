//! Seams to the outside world: the face detection/embedding service and the
//! live video feed.

use crate::types::{Descriptor, Frame};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),
    #[error("face analysis service error: {0}")]
    Service(String),
    #[error("malformed descriptor payload: {0}")]
    Decode(String),
}

/// Face detection, landmarking and descriptor extraction.
///
/// Implementations are black boxes; their accuracy is not this crate's concern.
pub trait FaceAnalyzer: Send + Sync + 'static {
    /// Load detection and recognition models. Called once before any detection.
    fn load_models(&self) -> impl Future<Output = Result<(), AnalyzerError>> + Send;

    /// Detect the most prominent face in a still image.
    ///
    /// `Ok(None)` means no face was found.
    fn detect_single(
        &self,
        image: &Frame,
    ) -> impl Future<Output = Result<Option<Descriptor>, AnalyzerError>> + Send;

    /// Detect every face in a video frame. Order is detector-defined.
    fn detect_all(
        &self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Vec<Descriptor>, AnalyzerError>> + Send;
}

/// Provider of the most recent video frame.
pub trait FrameSource: Send + Sync + 'static {
    /// The current frame, or `None` when no live frame is available yet.
    fn latest(&self) -> Option<Arc<Frame>>;
}

impl FrameSource for watch::Receiver<Option<Arc<Frame>>> {
    fn latest(&self) -> Option<Arc<Frame>> {
        self.borrow().clone()
    }
}
