//! Matroska (MKV/WebM) container parsing

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use matroska::Matroska;

use super::Container;
use crate::error::ProbeError;
use crate::types::{ContainerInfo, VideoTrack};

/// Probe a Matroska file
pub fn probe(path: &Path) -> Result<ContainerInfo, ProbeError> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    probe_reader(BufReader::new(file), file_size)
}

/// Probe Matroska data from any seekable reader
pub fn probe_reader<R: Read + Seek>(reader: R, file_size: u64) -> Result<ContainerInfo, ProbeError> {
    let mkv = Matroska::open(reader)
        .map_err(|e| ProbeError::ContainerParse(format!("MKV parse error: {}", e)))?;

    let duration_ms = mkv
        .info
        .duration
        .map(|d| d.as_millis() as u64)
        .filter(|d| *d > 0);

    let mut video_tracks = Vec::new();
    let mut other_tracks = 0u32;

    for track in &mkv.tracks {
        match &track.settings {
            matroska::Settings::Video(video) => {
                video_tracks.push(VideoTrack {
                    index: video_tracks.len() as u32,
                    codec: codec_id_to_name(&track.codec_id),
                    width: video.pixel_width as u32,
                    height: video.pixel_height as u32,
                    frame_rate: track
                        .default_duration
                        .map(|d| d.as_secs_f64())
                        .filter(|secs| *secs > 0.0)
                        .map(|secs| 1.0 / secs),
                    bitrate: None,
                    rotation_tag: None,
                    transform: None,
                    // The Colour element is not exposed by the parser
                    color: None,
                });
            }
            _ => other_tracks += 1,
        }
    }

    // Matroska has no per-track sample tables; use the whole file
    let bitrate = duration_ms.map(|ms| file_size.saturating_mul(8000) / ms);

    Ok(ContainerInfo {
        container: Container::Matroska,
        file_size,
        duration_ms,
        bitrate,
        video_tracks,
        other_tracks,
    })
}

/// Convert MKV video codec ID to human-readable name
fn codec_id_to_name(codec_id: &str) -> String {
    match codec_id {
        "V_MPEG4/ISO/AVC" => "AVC".to_string(),
        "V_MPEGH/ISO/HEVC" => "HEVC".to_string(),
        "V_AV1" => "AV1".to_string(),
        "V_VP8" => "VP8".to_string(),
        "V_VP9" => "VP9".to_string(),
        "V_MPEG1" => "MPEG-1".to_string(),
        "V_MPEG2" => "MPEG-2".to_string(),
        "V_MPEG4/ISO/SP" | "V_MPEG4/ISO/ASP" | "V_MPEG4/ISO/AP" => "MPEG-4".to_string(),
        "V_THEORA" => "Theora".to_string(),
        other => other.strip_prefix("V_").unwrap_or(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MkvBuilder;
    use std::io::Cursor;

    fn probe_bytes(bytes: Vec<u8>) -> ContainerInfo {
        let len = bytes.len() as u64;
        probe_reader(Cursor::new(bytes), len).unwrap()
    }

    #[test]
    fn test_probe_matroska_video() {
        let bytes = MkvBuilder::new(3840, 2160)
            .duration_ms(Some(10_000.0))
            .default_duration_ns(40_000_000)
            .audio_tracks(2)
            .payload_bytes(100_000)
            .build();
        let file_size = bytes.len() as u64;

        let info = probe_bytes(bytes);
        assert_eq!(info.container, Container::Matroska);
        assert_eq!(info.file_size, file_size);
        assert_eq!(info.duration_ms, Some(10_000));
        assert_eq!(info.bitrate, Some(file_size * 8000 / 10_000));
        assert_eq!(info.other_tracks, 2);
        assert_eq!(info.video_tracks.len(), 1);

        let video = info.primary_video().unwrap();
        assert_eq!(video.codec, "HEVC");
        assert_eq!((video.width, video.height), (3840, 2160));
        assert!((video.frame_rate.unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(video.bitrate, None);
        assert_eq!(video.rotation(), None);
        assert!(video.color.is_none());
    }

    #[test]
    fn test_probe_webm_without_timing() {
        let bytes = MkvBuilder::webm(1280, 720)
            .duration_ms(Some(0.0))
            .default_duration_ns(0)
            .build();

        let info = probe_bytes(bytes);
        assert_eq!(info.duration_ms, None);
        assert_eq!(info.bitrate, None);

        let video = info.primary_video().unwrap();
        assert_eq!(video.codec, "VP9");
        assert_eq!(video.frame_rate, None);
    }

    #[test]
    fn test_probe_matroska_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, MkvBuilder::webm(640, 360).duration_ms(None).build()).unwrap();

        let info = crate::probe_file(&path).unwrap();
        assert_eq!(info.container, Container::Matroska);
        assert_eq!(info.duration_ms, None);
        assert_eq!(info.primary_video().unwrap().width, 640);
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(codec_id_to_name("V_MPEGH/ISO/HEVC"), "HEVC");
        assert_eq!(codec_id_to_name("V_AV1"), "AV1");
        assert_eq!(codec_id_to_name("V_FFV1"), "FFV1");
    }
}
