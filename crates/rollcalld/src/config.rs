use rollcall_core::{IdentityError, IdentityTable, SamplerConfig, DEFAULT_MATCH_THRESHOLD};
use std::path::PathBuf;
use std::time::Duration;

/// Identity table used when `ROLLCALL_IDENTITIES` is not set.
const DEFAULT_IDENTITIES: &str = include_str!("../../../contrib/identities.toml");

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture resolution.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Identity table file; `None` uses the compiled-in table.
    pub identities_path: Option<PathBuf>,
    /// Base directory for relative reference image paths.
    pub image_dir: PathBuf,
    /// Model location handed to the embedding service.
    pub model_uri: String,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Period between sampling ticks.
    pub sample_interval_ms: u64,
    /// Frames discarded after opening the camera (exposure stabilization).
    pub warmup_frames: usize,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        Self {
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            frame_width: env_parse("ROLLCALL_FRAME_WIDTH", 640),
            frame_height: env_parse("ROLLCALL_FRAME_HEIGHT", 480),
            identities_path: std::env::var("ROLLCALL_IDENTITIES").ok().map(PathBuf::from),
            image_dir: std::env::var("ROLLCALL_IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("labeled_images")),
            model_uri: std::env::var("ROLLCALL_MODEL_URI")
                .unwrap_or_else(|_| data_dir.join("models").to_string_lossy().into_owned()),
            match_threshold: env_parse("ROLLCALL_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            sample_interval_ms: env_parse("ROLLCALL_SAMPLE_INTERVAL_MS", 1000),
            warmup_frames: env_parse("ROLLCALL_WARMUP_FRAMES", 4),
        }
    }

    /// Load the identity table and resolve reference image paths.
    pub fn identities(&self) -> Result<IdentityTable, IdentityError> {
        let table = match &self.identities_path {
            Some(path) => IdentityTable::load(path)?,
            None => IdentityTable::from_toml(DEFAULT_IDENTITIES)?,
        };
        Ok(table.with_image_dir(&self.image_dir))
    }

    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.sample_interval_ms.max(1)),
            threshold: self.match_threshold,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
