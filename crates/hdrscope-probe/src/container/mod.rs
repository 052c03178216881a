//! Container format detection and parsing

pub mod mkv;
pub mod mp4;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::error::ProbeError;

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Matroska (.mkv, .webm)
    Matroska,
    /// MPEG-4 Part 14 / QuickTime (.mp4, .m4v, .mov)
    Mp4,
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Matroska => write!(f, "Matroska"),
            Container::Mp4 => write!(f, "MP4"),
        }
    }
}

/// Detect container format from file magic bytes
pub fn detect_container(path: &Path) -> Result<Container, ProbeError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProbeError::FileNotFound(path.to_path_buf())
        } else {
            ProbeError::Io(e)
        }
    })?;

    let mut reader = BufReader::new(file);
    detect_container_from_reader(&mut reader)
}

/// Detect container format from a reader
///
/// The reader is rewound to the start afterwards.
pub fn detect_container_from_reader<R: Read + Seek>(
    reader: &mut R,
) -> Result<Container, ProbeError> {
    let mut magic = [0u8; 12];
    let read = read_up_to(reader, &mut magic)?;
    reader.rewind()?;

    if read < 8 {
        return Err(ProbeError::UnsupportedContainer(
            "File too short to identify".to_string(),
        ));
    }

    // EBML header (Matroska/WebM)
    if magic[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return Ok(Container::Matroska);
    }

    // ISO-BMFF: ftyp first, or a bare QuickTime file starting with moov/mdat
    if matches!(
        &magic[4..8],
        b"ftyp" | b"moov" | b"mdat" | b"free" | b"wide" | b"skip"
    ) {
        return Ok(Container::Mp4);
    }

    Err(ProbeError::UnsupportedContainer(
        "Unable to detect container format from magic bytes".to_string(),
    ))
}

/// Get container type from file extension (fallback)
pub fn container_from_extension(path: &Path) -> Option<Container> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "mkv" | "webm" | "mk3d" => Some(Container::Matroska),
        "mp4" | "m4v" | "mov" | "3gp" | "3g2" => Some(Container::Mp4),
        _ => None,
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
