//! Error type shared by capability detection and metadata extraction.
//!
//! Every failure that reaches a caller is an [`Error`]; [`Error::code`] gives
//! the stable string the dispatcher reports alongside the message.

use std::fmt;

/// Boxed cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for hdrscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Appended to metadata failures of network sources.
const STREAMING_HINT: &str =
    " (the source may be an adaptive streaming format that was not recognized by its extension)";

/// Adaptive streaming manifest formats rejected by the streaming guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingFormat {
    /// HTTP Live Streaming (`.m3u8`)
    Hls,
    /// MPEG-DASH (`.mpd`)
    Dash,
}

impl fmt::Display for StreamingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamingFormat::Hls => write!(f, "HLS"),
            StreamingFormat::Dash => write!(f, "DASH"),
        }
    }
}

/// Display capability that a failed query was answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Hdr,
    HdrFormats,
    WideColorGamut,
}

impl Capability {
    /// Stable error code for a failed query of this capability.
    pub fn error_code(&self) -> &'static str {
        match self {
            Capability::Hdr => "HDR_CHECK_FAILED",
            Capability::HdrFormats => "HDR_FORMATS_FAILED",
            Capability::WideColorGamut => "WIDE_COLOR_GAMUT_FAILED",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Hdr => write!(f, "HDR support"),
            Capability::HdrFormats => write!(f, "HDR formats"),
            Capability::WideColorGamut => write!(f, "wide color gamut support"),
        }
    }
}

/// Failure modes of hdrscope operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The source is an adaptive streaming manifest.
    #[error("Metadata extraction is not supported for {format} streams")]
    StreamingUnsupported { format: StreamingFormat },

    /// The asset lookup had no entry for the logical name.
    #[error("Asset not found: {name}")]
    AssetNotFound { name: String },

    /// The source was inspected but contains no video track.
    #[error("No video track found in source")]
    NoVideoTrack,

    /// Resolution or inspection failed.
    #[error("Failed to extract video metadata: {source}{}", network_hint(.network))]
    Metadata {
        /// The underlying failure.
        source: BoxError,
        /// Whether the source was fetched over the network.
        network: bool,
    },

    /// A required platform facility is missing.
    #[error("{feature} is not available on this platform")]
    FeatureUnavailable { feature: String },

    /// The display provider failed while answering a capability query.
    #[error("Failed to query {capability}: {source}")]
    CapabilityQueryFailed {
        capability: Capability,
        source: BoxError,
    },
}

fn network_hint(network: &bool) -> &'static str {
    if *network {
        STREAMING_HINT
    } else {
        ""
    }
}

impl Error {
    /// Stable string code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::StreamingUnsupported { .. } => "STREAMING_METADATA_UNSUPPORTED",
            Error::AssetNotFound { .. } => "ASSET_NOT_FOUND",
            Error::NoVideoTrack => "NO_VIDEO_TRACK",
            Error::Metadata { .. } => "METADATA_ERROR",
            Error::FeatureUnavailable { .. } => "NOT_SUPPORTED",
            Error::CapabilityQueryFailed { capability, .. } => capability.error_code(),
        }
    }

    /// Convenience constructor for [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Convenience constructor for [`Error::Metadata`] of a local source.
    pub fn metadata(source: impl Into<BoxError>) -> Self {
        Error::Metadata {
            source: source.into(),
            network: false,
        }
    }

    /// Convenience constructor for [`Error::Metadata`] of a network source.
    pub fn network_metadata(source: impl Into<BoxError>) -> Self {
        Error::Metadata {
            source: source.into(),
            network: true,
        }
    }

    /// Convenience constructor for [`Error::FeatureUnavailable`].
    pub fn unavailable(feature: impl Into<String>) -> Self {
        Error::FeatureUnavailable {
            feature: feature.into(),
        }
    }

    /// Convenience constructor for [`Error::CapabilityQueryFailed`].
    pub fn capability(capability: Capability, source: impl Into<BoxError>) -> Self {
        Error::CapabilityQueryFailed {
            capability,
            source: source.into(),
        }
    }
}
