//! # hdrscope-probe
//!
//! Pure Rust container inspection for video metadata and color parameters.
//!
//! This crate reads container-level fields of a media file without decoding
//! any frames: dimensions, duration, bitrate, frame rate, the track transform
//! (for rotation), and the raw color description codes.
//!
//! ## Features
//!
//! - Container detection from magic bytes, with extension fallback
//! - MP4/MOV: hand-rolled atom walker (`moov`, `tkhd` matrix, `stsd`/`colr`,
//!   `stts`, `stsz`)
//! - MKV/WebM: via the `matroska` crate
//! - No external tool dependencies
//!
//! ## Example
//!
//! ```no_run
//! let info = hdrscope_probe::probe_file("movie.mp4").unwrap();
//!
//! println!("Container: {}", info.container);
//! println!("Duration: {:?}ms", info.duration_ms);
//!
//! if let Some(video) = info.primary_video() {
//!     println!("Video: {} {}x{}", video.codec, video.width, video.height);
//!     println!("Rotation: {:?}", video.rotation());
//!     if let Some(color) = video.color {
//!         println!("Transfer code: {}", color.transfer);
//!     }
//! }
//! ```

pub mod container;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use container::Container;
pub use error::ProbeError;
pub use types::*;

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Probe a media file and extract container metadata
///
/// Detects the container from magic bytes (falling back to the file
/// extension) and dispatches to the matching parser.
///
/// # Example
///
/// ```no_run
/// let info = hdrscope_probe::probe_file("/path/to/video.mkv").unwrap();
/// println!("Found {} video tracks", info.video_tracks.len());
/// ```
pub fn probe_file<P: AsRef<Path>>(path: P) -> Result<ContainerInfo, ProbeError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ProbeError::FileNotFound(path.to_path_buf()));
    }

    let container_type = container::detect_container(path).or_else(|e| {
        container::container_from_extension(path).ok_or(e)
    })?;

    tracing::debug!(path = %path.display(), container = %container_type, "probing file");

    match container_type {
        Container::Matroska => container::mkv::probe(path),
        Container::Mp4 => container::mp4::probe(path),
    }
}

/// Probe media data from an already opened, seekable source
///
/// Useful when the caller holds a file handle rather than a path.
///
/// # Arguments
///
/// * `reader` - Seekable reader positioned anywhere; it is rewound first
/// * `container_hint` - Skip magic-byte detection when the format is known
pub fn probe_reader<R: Read + Seek>(
    mut reader: R,
    container_hint: Option<Container>,
) -> Result<ContainerInfo, ProbeError> {
    reader.seek(SeekFrom::Start(0))?;

    let container_type = match container_hint {
        Some(hint) => hint,
        None => container::detect_container_from_reader(&mut reader)?,
    };

    match container_type {
        Container::Matroska => {
            let file_size = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(0))?;
            container::mkv::probe_reader(reader, file_size)
        }
        Container::Mp4 => container::mp4::probe_reader(reader),
    }
}

/// Check if a file appears to be a supported container
///
/// This performs a quick check of the file's magic bytes without
/// parsing the container.
pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
    container::detect_container(path.as_ref()).is_ok()
}

/// Get the detected container format for a file
pub fn detect_container<P: AsRef<Path>>(path: P) -> Result<Container, ProbeError> {
    container::detect_container(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format() {
        let result = probe_file("/nonexistent/file.xyz");
        assert!(result.is_err());
    }

    #[test]
    fn test_probe_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(
            &path,
            fixture::Mp4Builder::new(1920, 1080).duration_ms(4_000).build(),
        )
        .unwrap();

        let info = probe_file(&path).unwrap();
        assert_eq!(info.container, Container::Mp4);
        assert_eq!(info.duration_ms, Some(4_000));
        assert!(is_supported_format(&path));
    }

    #[test]
    fn test_probe_moov_after_mdat() {
        let bytes = fixture::Mp4Builder::new(1280, 720)
            .duration_ms(2_000)
            .frames(60, 30, 1)
            .mdat_bytes(64 * 1024)
            .moov_last()
            .build();

        let info = probe_reader(std::io::Cursor::new(bytes), None).unwrap();
        assert_eq!(info.duration_ms, Some(2_000));
        let video = info.primary_video().unwrap();
        assert_eq!((video.width, video.height), (1280, 720));
        assert!((video.frame_rate.unwrap() - 30.0).abs() < 1e-9);
    }
}
