//! Metadata extraction: guard, resolve, inspect, classify.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::color::{ColorClassifier, ColorRange, ColorStandard, ColorTransfer};
use crate::error::{Error, Result};
use crate::guard;
use crate::inspect::{MediaInspector, RawMetadata};
use crate::resolve::SourceResolver;
use crate::source::SourceReference;

/// Structural and color properties of a video source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Bits per second
    pub bitrate: Option<u64>,
    /// Milliseconds
    pub duration: Option<u64>,
    /// Clockwise degrees: 0, 90, 180 or 270
    #[serde(default)]
    pub rotation: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_standard: Option<ColorStandard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_transfer: Option<ColorTransfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_range: Option<ColorRange>,
}

impl VideoMetadata {
    /// Build from inspector output. `None` when there is no video track.
    pub fn from_raw(raw: RawMetadata) -> Option<Self> {
        let video = raw.video?;
        let color = video.color.as_ref().map(ColorClassifier::classify);

        Some(Self {
            width: video.width,
            height: video.height,
            bitrate: raw.bitrate.or(video.bitrate),
            duration: raw.duration_ms,
            rotation: video.rotation.unwrap_or(0),
            frame_rate: video.frame_rate,
            color_standard: color.map(|c| c.standard),
            color_transfer: color.map(|c| c.transfer),
            color_range: color.map(|c| c.range),
        })
    }

    /// True when the transfer function is PQ or HLG.
    pub fn is_hdr(&self) -> bool {
        self.color_transfer.is_some_and(|t| t.is_hdr())
    }
}

/// Drives resolution and inspection for one source at a time.
///
/// Holds no per-request state, so one extractor can serve concurrent calls.
#[derive(Clone)]
pub struct MetadataExtractor {
    resolver: SourceResolver,
    inspector: Arc<dyn MediaInspector>,
}

impl MetadataExtractor {
    pub fn new(resolver: SourceResolver, inspector: Arc<dyn MediaInspector>) -> Self {
        Self {
            resolver,
            inspector,
        }
    }

    /// Extract metadata for `source`.
    ///
    /// Streaming manifests are rejected before anything is resolved. Any
    /// temporary file made during resolution is deleted before this returns,
    /// including on failure, and when the future is dropped mid-flight.
    pub async fn extract(&self, source: &SourceReference) -> Result<VideoMetadata> {
        guard::check(source)?;

        if !self.inspector.is_available() {
            return Err(Error::unavailable(format!(
                "media inspector '{}'",
                self.inspector.name()
            )));
        }

        let handle = self.resolver.resolve(source).await?;

        let inspected = self.inspector.inspect(handle.source()).await;
        drop(handle);

        let raw = inspected.map_err(|e| {
            tracing::debug!(source = %source, error = %e, "inspection failed");
            if source.is_network() {
                Error::network_metadata(e)
            } else {
                Error::metadata(e)
            }
        })?;

        let metadata = VideoMetadata::from_raw(raw).ok_or(Error::NoVideoTrack)?;
        tracing::debug!(
            source = %source,
            width = ?metadata.width,
            height = ?metadata.height,
            hdr = metadata.is_hdr(),
            "extracted video metadata"
        );
        Ok(metadata)
    }
}
