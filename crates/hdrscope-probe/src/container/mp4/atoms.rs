//! MP4 atom definitions.

use crate::types::{ColorDescription, TransformMatrix};

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const MOOV: Self = Self(*b"moov");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSZ: Self = Self(*b"stsz");
    pub const COLR: Self = Self(*b"colr");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed atom header.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Atom type code.
    pub atom_type: AtomType,
    /// Atom size including header.
    pub size: u64,
    /// File offset where atom data starts (after header).
    pub data_offset: u64,
    /// Size of the header (8 or 16 bytes).
    pub header_size: u8,
}

impl Atom {
    /// Get the data size (size - header).
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }

    /// Offset one past the last byte of this atom.
    pub fn end(&self) -> u64 {
        self.data_offset + self.data_size()
    }
}

/// Handler type for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Video,
    Audio,
    Hint,
    Meta,
    Text,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            b"hint" => Self::Hint,
            b"meta" => Self::Meta,
            b"text" | b"sbtl" | b"subt" => Self::Text,
            _ => Self::Unknown(bytes),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

/// First sample description of a visual track (`stsd`).
#[derive(Debug, Clone)]
pub struct VisualSampleEntry {
    /// Sample entry four-character code (`avc1`, `hvc1`, ...).
    pub format: AtomType,
    /// Coded width in pixels.
    pub width: u16,
    /// Coded height in pixels.
    pub height: u16,
    /// Color description from a `colr` child box.
    pub color: Option<ColorDescription>,
}

impl VisualSampleEntry {
    /// Human-readable codec name for the sample entry format.
    pub fn codec_name(&self) -> String {
        match &self.format.0 {
            b"avc1" | b"avc3" => "AVC".to_string(),
            b"hvc1" | b"hev1" => "HEVC".to_string(),
            b"dvh1" | b"dvhe" => "HEVC (Dolby Vision)".to_string(),
            b"dva1" | b"dvav" => "AVC (Dolby Vision)".to_string(),
            b"av01" => "AV1".to_string(),
            b"vp08" => "VP8".to_string(),
            b"vp09" => "VP9".to_string(),
            b"mp4v" => "MPEG-4".to_string(),
            b"apch" | b"apcn" | b"apcs" | b"apco" | b"ap4h" | b"ap4x" => "ProRes".to_string(),
            _ => self.format.as_str().trim().to_string(),
        }
    }
}

/// Track information extracted from trak atom.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Track ID.
    pub track_id: u32,
    /// Handler type (video/audio/etc).
    pub handler_type: HandlerType,
    /// Track duration in media timescale.
    pub duration: u64,
    /// Media timescale (units per second for this track).
    pub timescale: u32,
    /// Presentation width from the track header.
    pub width: Option<u32>,
    /// Presentation height from the track header.
    pub height: Option<u32>,
    /// Track transform matrix from the track header.
    pub transform: Option<TransformMatrix>,
    /// First visual sample description, for video tracks.
    pub visual_entry: Option<VisualSampleEntry>,
    /// Total number of samples (from stts).
    pub sample_count: u64,
    /// Sum of all sample durations in media timescale (from stts).
    pub sample_delta_total: u64,
    /// Sum of all sample sizes in bytes (from stsz).
    pub sample_bytes: u64,
}

impl TrackInfo {
    /// Create empty track info.
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            handler_type: HandlerType::Unknown([0; 4]),
            duration: 0,
            timescale: 1,
            width: None,
            height: None,
            transform: None,
            visual_entry: None,
            sample_count: 0,
            sample_delta_total: 0,
            sample_bytes: 0,
        }
    }

    /// Get duration in milliseconds, if known.
    pub fn duration_ms(&self) -> Option<u64> {
        if self.timescale == 0 || self.duration == 0 || self.duration == u32::MAX as u64 {
            None
        } else {
            Some(self.duration.saturating_mul(1000) / self.timescale as u64)
        }
    }

    /// Average frame rate derived from the decoding time table.
    pub fn frame_rate(&self) -> Option<f64> {
        if self.sample_count == 0 || self.sample_delta_total == 0 || self.timescale == 0 {
            return None;
        }
        Some(self.sample_count as f64 * self.timescale as f64 / self.sample_delta_total as f64)
    }

    /// Average bitrate of this track in bits per second.
    pub fn bitrate(&self) -> Option<u64> {
        let duration_ms = self.duration_ms()?;
        if self.sample_bytes == 0 || duration_ms == 0 {
            return None;
        }
        Some(self.sample_bytes.saturating_mul(8000) / duration_ms)
    }
}
