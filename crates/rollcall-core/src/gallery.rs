//! Reference gallery: per-identity face descriptors built from labeled images.

use crate::analyzer::FaceAnalyzer;
use crate::identity::IdentityTable;
use crate::types::{Descriptor, Frame};
use std::future::Future;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to load reference image {path}: {source}")]
    ImageLoad {
        path: String,
        source: image::ImageError,
    },
    #[error("image decoding task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Loads reference images as grayscale frames.
pub trait ImageSource {
    fn load(&self, path: &Path) -> impl Future<Output = Result<Frame, GalleryError>> + Send;
}

/// Reads reference images from the local filesystem.
///
/// Decoding is blocking, so it runs on the blocking thread pool.
pub struct DiskImages;

impl ImageSource for DiskImages {
    async fn load(&self, path: &Path) -> Result<Frame, GalleryError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || decode_grayscale(&path)).await?
    }
}

fn decode_grayscale(path: &Path) -> Result<Frame, GalleryError> {
    let img = image::open(path).map_err(|source| GalleryError::ImageLoad {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Frame::from(img.to_luma8()))
}

/// Descriptors for a single identity.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub name: String,
    pub descriptors: Vec<Descriptor>,
}

/// Mapping from identity name to its reference descriptors.
///
/// Holds at most one entry per identity, in insertion order. An entry may
/// have zero descriptors when none of the identity's images yielded a face.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add descriptors for `name`, merging into an existing entry.
    pub fn insert(&mut self, name: &str, descriptors: Vec<Descriptor>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.descriptors.extend(descriptors),
            None => self.entries.push(ReferenceEntry {
                name: name.to_string(),
                descriptors,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Descriptor]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.descriptors.as_slice())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of descriptors across all identities.
    pub fn descriptor_count(&self) -> usize {
        self.entries.iter().map(|e| e.descriptors.len()).sum()
    }

    /// Identities that can never be matched.
    pub fn identities_without_descriptors(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.descriptors.is_empty())
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// Build the reference set for every identity in the table.
///
/// Images that fail to load or contain no detectable face are skipped with a
/// warning; the build itself never fails. The first usable descriptor fixes
/// the gallery's dimension, and descriptors of any other dimension (including
/// empty ones) are skipped as well.
pub async fn build_reference_set<A, I>(
    identities: &IdentityTable,
    analyzer: &A,
    images: &I,
) -> ReferenceSet
where
    A: FaceAnalyzer,
    I: ImageSource,
{
    let mut set = ReferenceSet::new();
    let mut dim: Option<usize> = None;

    for identity in identities {
        let mut descriptors = Vec::with_capacity(identity.reference_images.len());
        for path in &identity.reference_images {
            let Some(descriptor) = reference_descriptor(analyzer, images, path).await else {
                continue;
            };
            if descriptor.dim() == 0 {
                tracing::warn!(path = %path.display(), "skipping empty reference descriptor");
                continue;
            }
            let expected = *dim.get_or_insert(descriptor.dim());
            if descriptor.dim() != expected {
                tracing::warn!(
                    path = %path.display(),
                    expected,
                    actual = descriptor.dim(),
                    "skipping reference descriptor with unexpected dimension"
                );
                continue;
            }
            descriptors.push(descriptor);
        }
        tracing::debug!(
            identity = %identity.name,
            descriptors = descriptors.len(),
            images = identity.reference_images.len(),
            "reference descriptors built"
        );
        set.insert(&identity.name, descriptors);
    }

    for name in set.identities_without_descriptors() {
        tracing::warn!(identity = name, "no usable reference image; identity cannot be matched");
    }
    tracing::info!(
        identities = set.len(),
        descriptors = set.descriptor_count(),
        "reference gallery ready"
    );

    set
}

async fn reference_descriptor<A, I>(analyzer: &A, images: &I, path: &Path) -> Option<Descriptor>
where
    A: FaceAnalyzer,
    I: ImageSource,
{
    let frame = match images.load(path).await {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(error = %err, "skipping reference image");
            return None;
        }
    };

    match analyzer.detect_single(&frame).await {
        Ok(Some(descriptor)) => Some(descriptor),
        Ok(None) => {
            tracing::warn!(path = %path.display(), "no face detected in reference image");
            None
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "reference detection failed");
            None
        }
    }
}
