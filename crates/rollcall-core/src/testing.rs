//! Test doubles for the analyzer and image seams.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::gallery::{GalleryError, ImageSource};
use crate::identity::Identity;
use crate::types::{Descriptor, Frame, Label, MatchResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn known(name: &str) -> MatchResult {
    MatchResult {
        descriptor: Descriptor::new(vec![0.0]),
        label: Label::Known(name.to_string()),
        distance: 0.0,
    }
}

pub fn unknown() -> MatchResult {
    MatchResult {
        descriptor: Descriptor::new(vec![0.9]),
        label: Label::Unknown,
        distance: 0.9,
    }
}

pub fn identity(name: &str, images: &[&str]) -> Identity {
    Identity {
        name: name.to_string(),
        id: format!("id-{name}"),
        department: String::new(),
        email: String::new(),
        phone: String::new(),
        address: String::new(),
        reference_images: images.iter().map(PathBuf::from).collect(),
    }
}

/// Serves a blank frame per registered path, tagged with a unique sequence
/// number so the analyzer can tell reference images apart.
pub struct FakeImages {
    sequences: HashMap<PathBuf, u32>,
}

impl FakeImages {
    pub fn new(paths: &[&str]) -> Self {
        let sequences = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (PathBuf::from(p), i as u32 + 1))
            .collect();
        Self { sequences }
    }

    pub fn sequence_of(&self, path: &str) -> u32 {
        self.sequences[Path::new(path)]
    }
}

impl ImageSource for FakeImages {
    async fn load(&self, path: &Path) -> Result<Frame, GalleryError> {
        match self.sequences.get(path) {
            Some(&seq) => Ok(Frame::new(vec![0u8; 4], 2, 2, seq)),
            None => Err(GalleryError::ImageLoad {
                path: path.display().to_string(),
                source: image::ImageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such image",
                )),
            }),
        }
    }
}

/// Scripted analyzer.
///
/// Still images resolve by frame sequence number; live frames pop the next
/// scripted detection batch (an empty batch once the script runs out).
#[derive(Default)]
pub struct FakeAnalyzer {
    faces: HashMap<u32, Vec<f32>>,
    broken: HashSet<u32>,
    batches: Mutex<VecDeque<Result<Vec<Descriptor>, AnalyzerError>>>,
    fail_load: bool,
    delay: Duration,
    pub loads: AtomicUsize,
    pub live_calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_face(mut self, sequence: u32, values: Vec<f32>) -> Self {
        self.faces.insert(sequence, values);
        self
    }

    pub fn with_detection_error(mut self, sequence: u32) -> Self {
        self.broken.insert(sequence);
        self
    }

    pub fn with_batch(self, descriptors: Vec<Vec<f32>>) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Ok(descriptors.into_iter().map(Descriptor::new).collect()));
        self
    }

    pub fn with_failed_batch(self) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(AnalyzerError::Service("detector crashed".into())));
        self
    }

    pub fn with_load_failure(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Delay every live detection, forcing ticks to overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl FaceAnalyzer for FakeAnalyzer {
    async fn load_models(&self) -> Result<(), AnalyzerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(AnalyzerError::ModelLoad("weights unavailable".into()));
        }
        Ok(())
    }

    async fn detect_single(&self, image: &Frame) -> Result<Option<Descriptor>, AnalyzerError> {
        if self.broken.contains(&image.sequence) {
            return Err(AnalyzerError::Service("detector crashed".into()));
        }
        Ok(self
            .faces
            .get(&image.sequence)
            .map(|v| Descriptor::new(v.clone())))
    }

    async fn detect_all(&self, _frame: &Frame) -> Result<Vec<Descriptor>, AnalyzerError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
