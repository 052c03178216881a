//! Media inspection facilities.
//!
//! A [`MediaInspector`] opens a resolved source and reports the raw,
//! container-level fields the extractor turns into `VideoMetadata`. The
//! built-in [`NativeInspector`] parses containers in-process; callers with a
//! platform facility of their own plug it in behind the same trait.

mod native;
mod remote;

pub use native::NativeInspector;

use async_trait::async_trait;

use crate::color::RawColorParams;
use crate::resolve::MediaSource;

/// Errors raised while inspecting a source.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error(transparent)]
    Probe(#[from] hdrscope_probe::ProbeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No data from {url} for {secs}s")]
    Stalled { url: String, secs: u64 },

    #[error("Download exceeds the {limit} byte limit")]
    DownloadTooLarge { limit: u64 },

    #[error("Inspection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Raw fields of the first video track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVideoTrack {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Clockwise display rotation in degrees
    pub rotation: Option<u16>,
    pub frame_rate: Option<f64>,
    pub bitrate: Option<u64>,
    /// Present only when the facility exposes color parameters
    pub color: Option<RawColorParams>,
}

/// What an inspector reports about a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub duration_ms: Option<u64>,
    /// Overall bitrate in bits per second
    pub bitrate: Option<u64>,
    /// `None` when the source has no video track
    pub video: Option<RawVideoTrack>,
}

/// A facility able to read container metadata from a resolved source.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    /// Short identifier for logs (e.g. `"native"`).
    fn name(&self) -> &'static str;

    /// Whether this facility can run on the current platform.
    fn is_available(&self) -> bool {
        true
    }

    async fn inspect(&self, source: &MediaSource) -> Result<RawMetadata, InspectError>;
}
