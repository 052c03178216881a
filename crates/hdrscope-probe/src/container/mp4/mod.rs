//! MP4/MOV container parsing.
//!
//! Walks the `moov` atom for the movie header, track headers (including the
//! transform matrix), media headers, and the sample tables needed for
//! duration, frame rate and bitrate. Color codes come from the `colr` box of
//! the first visual sample entry.

mod atoms;
mod reader;

pub use atoms::{Atom, AtomType, HandlerType, TrackInfo, VisualSampleEntry};
pub use reader::Mp4Reader;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use super::Container;
use crate::error::ProbeError;
use crate::types::{ContainerInfo, VideoTrack};

/// Parsed MP4 movie structure.
#[derive(Debug)]
pub struct Mp4File {
    /// Size of the underlying file in bytes.
    pub file_size: u64,
    /// Duration in movie timescale units (0 when unknown).
    pub duration: u64,
    /// Movie timescale (time units per second).
    pub timescale: u32,
    /// All tracks, in file order.
    pub tracks: Vec<TrackInfo>,
}

impl Mp4File {
    /// Parse an MP4 file from the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProbeError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse an MP4 file from a reader.
    pub fn parse<R: Read + Seek>(reader: R) -> Result<Self, ProbeError> {
        Mp4Reader::new(reader)?.parse()
    }

    /// Movie duration in milliseconds, falling back to the longest track.
    pub fn duration_ms(&self) -> Option<u64> {
        if self.timescale > 0 && self.duration > 0 {
            return Some(self.duration.saturating_mul(1000) / self.timescale as u64);
        }
        self.tracks.iter().filter_map(TrackInfo::duration_ms).max()
    }

    /// Overall bitrate in bits per second.
    ///
    /// Uses the summed sample payload of every track; falls back to the file
    /// size when sample tables are empty (fragmented files).
    pub fn bitrate(&self) -> Option<u64> {
        let duration_ms = self.duration_ms().filter(|d| *d > 0)?;
        let payload: u64 = self.tracks.iter().map(|t| t.sample_bytes).sum();
        let bytes = if payload > 0 { payload } else { self.file_size };
        Some(bytes.saturating_mul(8000) / duration_ms)
    }

    /// Iterate over video tracks.
    pub fn video_tracks(&self) -> impl Iterator<Item = &TrackInfo> {
        self.tracks.iter().filter(|t| t.handler_type.is_video())
    }
}

impl From<Mp4File> for ContainerInfo {
    fn from(mp4: Mp4File) -> Self {
        let video_tracks: Vec<VideoTrack> = mp4
            .video_tracks()
            .enumerate()
            .map(|(index, track)| video_track(index as u32, track))
            .collect();
        let other_tracks = (mp4.tracks.len() - video_tracks.len()) as u32;

        ContainerInfo {
            container: Container::Mp4,
            file_size: mp4.file_size,
            duration_ms: mp4.duration_ms(),
            bitrate: mp4.bitrate(),
            video_tracks,
            other_tracks,
        }
    }
}

fn video_track(index: u32, track: &TrackInfo) -> VideoTrack {
    let entry = track.visual_entry.as_ref();

    // Prefer coded size from the sample entry; tkhd carries display size
    let width = entry
        .map(|e| e.width as u32)
        .filter(|w| *w > 0)
        .or(track.width)
        .unwrap_or(0);
    let height = entry
        .map(|e| e.height as u32)
        .filter(|h| *h > 0)
        .or(track.height)
        .unwrap_or(0);

    VideoTrack {
        index,
        codec: entry
            .map(VisualSampleEntry::codec_name)
            .unwrap_or_else(|| "Unknown".to_string()),
        width,
        height,
        frame_rate: track.frame_rate(),
        bitrate: track.bitrate(),
        rotation_tag: None,
        transform: track.transform,
        color: entry.and_then(|e| e.color),
    }
}

/// Probe an MP4 file
pub fn probe(path: &Path) -> Result<ContainerInfo, ProbeError> {
    let mp4 = Mp4File::open(path)?;
    tracing::debug!(
        path = %path.display(),
        tracks = mp4.tracks.len(),
        "parsed mp4 movie"
    );
    Ok(mp4.into())
}

/// Probe MP4 data from any seekable reader
pub fn probe_reader<R: Read + Seek>(reader: R) -> Result<ContainerInfo, ProbeError> {
    Ok(Mp4File::parse(reader)?.into())
}
