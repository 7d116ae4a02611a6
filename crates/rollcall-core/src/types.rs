use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Face descriptor: fixed-length embedding vector for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another descriptor.
    ///
    /// Returns `None` when the dimensions differ (such descriptors come from
    /// different embedding models) or when either side is empty.
    pub fn euclidean_distance(&self, other: &Descriptor) -> Option<f32> {
        if self.values.is_empty() || self.values.len() != other.values.len() {
            return None;
        }
        let sum = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>();
        Some(sum.sqrt())
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// A grayscale image handed to the face analyzer.
///
/// Used both for reference images loaded from disk and for live camera frames.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture sequence number (0 for still images).
    pub sequence: u32,
    pub captured_at: std::time::Instant,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
            captured_at: std::time::Instant::now(),
        }
    }
}

impl From<image::GrayImage> for Frame {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 0)
    }
}

/// Outcome of classifying a query descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Known(name) => Some(name),
            Label::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Label::Known(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Known(name) => f.write_str(name),
            Label::Unknown => f.write_str("unknown"),
        }
    }
}

/// Result of matching one detected face against the reference set.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub descriptor: Descriptor,
    pub label: Label,
    /// Distance to the closest comparable reference descriptor,
    /// `f32::INFINITY` if there was none.
    pub distance: f32,
}

/// One roster entry: an identity and the instant it was first recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub identity: String,
    pub timestamp: DateTime<Utc>,
}
