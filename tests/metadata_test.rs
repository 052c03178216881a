//! End-to-end metadata extraction from local sources.

mod common;

use assert_matches::assert_matches;
use common::{hdr10_movie, sdr_movie, write_movie, TestHarness};
use hdrscope::color::{ColorRange, ColorStandard, ColorTransfer};
use hdrscope::dispatch::{MethodCall, MethodResponse};
use hdrscope::source::SourceReference;
use hdrscope::Error;
use hdrscope_probe::fixture::{MkvBuilder, Mp4Builder};
use serde_json::json;

#[tokio::test]
async fn extracts_hdr10_file() {
    let h = TestHarness::new();
    let path = write_movie(h.scratch.path(), "hdr10.mp4", &hdr10_movie());
    let source = SourceReference::parse(path.to_string_lossy()).unwrap();

    let metadata = h.dispatcher.extractor().extract(&source).await.unwrap();

    assert_eq!(metadata.width, Some(3840));
    assert_eq!(metadata.height, Some(2160));
    assert_eq!(metadata.duration, Some(10_000));
    // 240 samples * 50_000 bytes * 8 bits / 10 s
    assert_eq!(metadata.bitrate, Some(9_600_000));
    assert_eq!(metadata.rotation, 90);
    assert!((metadata.frame_rate.unwrap() - 23.976).abs() < 0.001);
    assert_eq!(metadata.color_standard, Some(ColorStandard::Bt2020));
    assert_eq!(metadata.color_transfer, Some(ColorTransfer::St2084));
    assert_eq!(metadata.color_range, Some(ColorRange::Limited));
    assert!(metadata.is_hdr());
}

#[tokio::test]
async fn file_url_and_plain_path_agree() {
    let h = TestHarness::new();
    let path = write_movie(h.scratch.path(), "sdr.mp4", &sdr_movie());

    let plain = SourceReference::parse(path.to_string_lossy()).unwrap();
    let url = SourceReference::parse(format!("file://{}", path.display())).unwrap();

    let a = h.dispatcher.extractor().extract(&plain).await.unwrap();
    let b = h.dispatcher.extractor().extract(&url).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.color_standard, None);
    assert_eq!(a.bitrate, Some(2_000_000));
}

#[tokio::test]
async fn nclc_range_is_unknown() {
    let h = TestHarness::new();
    let movie = Mp4Builder::new(1280, 720).nclc(1, 1, 1);
    let path = write_movie(h.scratch.path(), "qt.mov", &movie);
    let source = SourceReference::parse(path.to_string_lossy()).unwrap();

    let metadata = h.dispatcher.extractor().extract(&source).await.unwrap();
    assert_eq!(metadata.color_standard, Some(ColorStandard::Bt709));
    assert_eq!(metadata.color_transfer, Some(ColorTransfer::SdrVideo));
    assert_eq!(metadata.color_range, Some(ColorRange::Unknown));
}

#[tokio::test]
async fn out_of_table_codes_are_unknown() {
    let h = TestHarness::new();
    // Primaries 12 (SMPTE EG 432), transfer 13 (sRGB) are not in the tables
    let movie = Mp4Builder::new(1280, 720).nclx(12, 13, 0, true);
    let path = write_movie(h.scratch.path(), "p3.mp4", &movie);
    let source = SourceReference::parse(path.to_string_lossy()).unwrap();

    let metadata = h.dispatcher.extractor().extract(&source).await.unwrap();
    assert_eq!(metadata.color_standard, Some(ColorStandard::Unknown));
    assert_eq!(metadata.color_transfer, Some(ColorTransfer::Unknown));
    assert_eq!(metadata.color_range, Some(ColorRange::Full));
}

#[tokio::test]
async fn matroska_record_omits_color() {
    let h = TestHarness::new();
    let bytes = MkvBuilder::new(1920, 1080)
        .duration_ms(Some(4_000.0))
        .default_duration_ns(40_000_000)
        .audio_tracks(1)
        .payload_bytes(50_000)
        .build();
    let file_size = bytes.len() as u64;
    let path = h.scratch.path().join("clip.mkv");
    std::fs::write(&path, bytes).unwrap();

    let response = h
        .dispatcher
        .handle(MethodCall::new(
            "getVideoMetadata",
            json!({ "filePath": path.to_string_lossy() }),
        ))
        .await;
    let result = match response {
        MethodResponse::Success { result } => result,
        other => panic!("unexpected response: {:?}", other),
    };

    assert_eq!(result["width"], 1920);
    assert_eq!(result["height"], 1080);
    assert_eq!(result["duration"], 4_000);
    assert_eq!(result["bitrate"], file_size * 8000 / 4_000);
    assert_eq!(result["rotation"], 0);
    assert!((result["frameRate"].as_f64().unwrap() - 25.0).abs() < 1e-9);
    for key in ["colorStandard", "colorTransfer", "colorRange"] {
        assert!(result.get(key).is_none(), "{} present in {}", key, result);
    }
}

#[tokio::test]
async fn audio_only_file_has_no_video_track() {
    let h = TestHarness::new();
    let path = write_movie(h.scratch.path(), "song.m4a", &Mp4Builder::audio_only());
    let source = SourceReference::parse(path.to_string_lossy()).unwrap();

    let result = h.dispatcher.extractor().extract(&source).await;
    assert_matches!(result, Err(Error::NoVideoTrack));
}

#[tokio::test]
async fn missing_file_is_metadata_error() {
    let h = TestHarness::new();
    let source = SourceReference::parse("/nonexistent/clip.mp4").unwrap();

    let err = h.dispatcher.extractor().extract(&source).await.unwrap_err();
    assert_eq!(err.code(), "METADATA_ERROR");
    assert!(!err.to_string().contains("adaptive streaming"));
}

#[tokio::test]
async fn asset_copy_is_removed_after_success() {
    let h = TestHarness::new();
    h.add_asset("videos/intro.mp4", &hdr10_movie());

    let source = SourceReference::parse("asset://videos/intro.mp4").unwrap();
    let metadata = h.dispatcher.extractor().extract(&source).await.unwrap();

    assert_eq!(metadata.rotation, 90);
    assert!(h.scratch_entries().is_empty());
}

#[tokio::test]
async fn asset_copy_is_removed_after_failure() {
    let h = TestHarness::new();
    std::fs::write(h.assets.path().join("corrupt.mp4"), b"not a movie at all").unwrap();

    let source = SourceReference::parse("asset://corrupt.mp4").unwrap();
    let err = h.dispatcher.extractor().extract(&source).await.unwrap_err();

    assert_eq!(err.code(), "METADATA_ERROR");
    assert!(h.scratch_entries().is_empty());
}

#[tokio::test]
async fn unknown_asset() {
    let h = TestHarness::new();
    let response = h
        .dispatcher
        .handle(MethodCall::new(
            "getVideoMetadata",
            json!({ "filePath": "asset://missing.mp4" }),
        ))
        .await;
    assert_matches!(response, MethodResponse::Error { code, .. } if code == "ASSET_NOT_FOUND");
}

#[tokio::test]
async fn dispatcher_returns_camel_case_record() {
    let h = TestHarness::new();
    let path = write_movie(h.scratch.path(), "hdr10.mp4", &hdr10_movie());

    let response = h
        .dispatcher
        .handle(MethodCall::new(
            "getVideoMetadata",
            json!({ "filePath": path.to_string_lossy() }),
        ))
        .await;

    let result = match response {
        MethodResponse::Success { result } => result,
        other => panic!("unexpected response: {:?}", other),
    };
    assert_eq!(result["width"], 3840);
    assert_eq!(result["rotation"], 90);
    assert_eq!(result["colorTransfer"], "ST2084");
    assert_eq!(result["colorRange"], "LIMITED");
    assert!(result.get("frameRate").is_some());
}

#[tokio::test]
async fn capability_methods_through_dispatcher() {
    let h = TestHarness::new();
    let response = h
        .dispatcher
        .handle(MethodCall::new("getSupportedHdrFormats", serde_json::Value::Null))
        .await;

    let result = match response {
        MethodResponse::Success { result } => result,
        other => panic!("unexpected response: {:?}", other),
    };
    let vocabulary = ["dolby_vision", "hdr10", "hdr10_plus", "hlg"];
    for tag in result.as_array().unwrap() {
        assert!(vocabulary.contains(&tag.as_str().unwrap()));
    }
}
