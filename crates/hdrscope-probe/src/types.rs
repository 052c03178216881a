//! Core types for container metadata representation

use std::fmt;

use crate::container::Container;

/// Container-level information about a media file
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Detected container format
    pub container: Container,
    /// Size of the inspected file in bytes
    pub file_size: u64,
    /// Presentation duration in milliseconds
    pub duration_ms: Option<u64>,
    /// Overall bitrate in bits per second
    pub bitrate: Option<u64>,
    /// Video tracks in the file, in container order
    pub video_tracks: Vec<VideoTrack>,
    /// Number of non-video tracks (audio, text, metadata)
    pub other_tracks: u32,
}

impl ContainerInfo {
    /// Get the first video track, if any.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }
}

/// Video track information
#[derive(Debug, Clone, Default)]
pub struct VideoTrack {
    /// Track index (0-based, container order)
    pub index: u32,
    /// Codec identifier (e.g., "HEVC", "AVC", "AV1")
    pub codec: String,
    /// Coded width in pixels
    pub width: u32,
    /// Coded height in pixels
    pub height: u32,
    /// Nominal frame rate (frames per second)
    pub frame_rate: Option<f64>,
    /// Track bitrate in bits per second, when sample sizes are known
    pub bitrate: Option<u64>,
    /// Explicit rotation tag in degrees, when the container carries one
    pub rotation_tag: Option<i32>,
    /// Track transform matrix (MP4 `tkhd`)
    pub transform: Option<TransformMatrix>,
    /// Color description, when the container exposes one
    pub color: Option<ColorDescription>,
}

impl VideoTrack {
    /// Display rotation in degrees clockwise (0, 90, 180 or 270).
    ///
    /// Prefers an explicit rotation tag and falls back to the transform
    /// matrix. Returns `None` when neither is present.
    pub fn rotation(&self) -> Option<u16> {
        if let Some(tag) = self.rotation_tag {
            return Some(snap_to_quarter_turn(tag as f64));
        }
        self.transform.map(|m| m.rotation_degrees())
    }
}

/// 2D affine part of an ISO-BMFF track transform.
///
/// Layout follows the `tkhd` matrix `{a, b, u, c, d, v, x, y, w}`; the
/// projective column (`u`, `v`, `w`) is not needed for rotation and is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TransformMatrix {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Build from 16.16 fixed-point matrix entries.
    pub fn from_fixed(a: i32, b: i32, c: i32, d: i32, tx: i32, ty: i32) -> Self {
        let f = |v: i32| v as f64 / 65536.0;
        Self {
            a: f(a),
            b: f(b),
            c: f(c),
            d: f(d),
            tx: f(tx),
            ty: f(ty),
        }
    }

    /// Rotation angle in degrees clockwise, snapped to a quarter turn.
    ///
    /// `atan2(b, a)` gives the angle of the transformed x axis; with the
    /// y axis pointing down this is a clockwise angle, so the matrix
    /// `a=0, b=1, c=-1, d=0` reads as 90.
    pub fn rotation_degrees(&self) -> u16 {
        snap_to_quarter_turn(self.b.atan2(self.a).to_degrees())
    }
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalize an angle into [0, 360) and round it to the nearest multiple of 90.
pub fn snap_to_quarter_turn(degrees: f64) -> u16 {
    let normalized = degrees.rem_euclid(360.0);
    let quarters = (normalized / 90.0).round() as u16 % 4;
    quarters * 90
}

/// Raw color description as stored in the container.
///
/// Codes are ITU-T H.273 values (`colour_primaries`,
/// `transfer_characteristics`, `matrix_coefficients`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    /// Which box/element the values came from
    pub source: ColorSource,
    pub primaries: u16,
    pub transfer: u16,
    pub matrix: u16,
    /// `video_full_range_flag`, absent for QuickTime `nclc`
    pub full_range: Option<bool>,
}

impl ColorDescription {
    /// Returns true if the transfer characteristic is PQ or HLG
    pub fn has_hdr_transfer(&self) -> bool {
        matches!(self.transfer, 16 | 18)
    }
}

/// Origin of a [`ColorDescription`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    /// ISO `colr` box with `nclx` payload
    Nclx,
    /// QuickTime `colr` box with `nclc` payload
    Nclc,
}

impl fmt::Display for ColorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSource::Nclx => write!(f, "nclx"),
            ColorSource::Nclc => write!(f, "nclc"),
        }
    }
}
