//! rollcall-core: Face-recognition attendance engine.
//!
//! Builds a reference gallery from labeled images, matches live face
//! descriptors against it by Euclidean distance, and keeps a deduplicated,
//! timestamped attendance roster. Detection and embedding are delegated to
//! a [`FaceAnalyzer`] implementation; frames come from a [`FrameSource`].

pub mod analyzer;
pub mod gallery;
pub mod identity;
pub mod matcher;
pub mod sampler;
pub mod session;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::{AnalyzerError, FaceAnalyzer, FrameSource};
pub use gallery::{DiskImages, GalleryError, ImageSource, ReferenceSet};
pub use identity::{Identity, IdentityError, IdentityTable};
pub use matcher::{find_best, DEFAULT_MATCH_THRESHOLD};
pub use sampler::{SamplerConfig, SamplerHandle};
pub use session::{Readiness, SessionHandle};
pub use tracker::AttendanceTracker;
pub use types::{AttendanceRecord, Descriptor, Frame, Label, MatchResult};
