//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns scratch asset and temp directories
//! and builds a [`Dispatcher`] wired with the native inspector and a static
//! display.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hdrscope::capability::{CapabilityDetector, HdrFormat, StaticDisplayProvider};
use hdrscope::config::RemoteConfig;
use hdrscope::dispatch::Dispatcher;
use hdrscope::extract::MetadataExtractor;
use hdrscope::inspect::NativeInspector;
use hdrscope::resolve::{DirectoryAssets, SourceResolver};
use hdrscope_probe::fixture::Mp4Builder;
use tempfile::TempDir;
use wiremock::{Request, Respond, ResponseTemplate};

/// Scratch directories plus the dispatcher that uses them.
pub struct TestHarness {
    pub assets: TempDir,
    pub scratch: TempDir,
    pub dispatcher: Dispatcher,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_remote(RemoteConfig::default())
    }

    pub fn with_remote(remote: RemoteConfig) -> Self {
        let assets = tempfile::tempdir().expect("failed to create asset dir");
        let scratch = tempfile::tempdir().expect("failed to create scratch dir");

        let resolver = SourceResolver::new(Arc::new(DirectoryAssets::new(assets.path())))
            .with_temp_dir(scratch.path());
        let inspector = NativeInspector::new(&remote).with_temp_dir(scratch.path());
        let extractor = MetadataExtractor::new(resolver, Arc::new(inspector));

        let display = StaticDisplayProvider::new(true, true, vec![HdrFormat::Hdr10, HdrFormat::Hlg]);
        let detector = CapabilityDetector::new(Arc::new(display));

        Self {
            assets,
            scratch,
            dispatcher: Dispatcher::new(detector, extractor),
        }
    }

    /// Write an MP4 into the asset directory under `name`.
    pub fn add_asset(&self, name: &str, movie: &Mp4Builder) -> PathBuf {
        write_movie(self.assets.path(), name, movie)
    }

    /// Entries currently in the scratch directory.
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .expect("failed to list scratch dir")
            .map(|e| e.expect("bad dir entry").path())
            .collect()
    }
}

pub fn write_movie(dir: &Path, name: &str, movie: &Mp4Builder) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    std::fs::write(&path, movie.build()).expect("failed to write movie");
    path
}

/// 10 second rotated 4K PQ clip.
pub fn hdr10_movie() -> Mp4Builder {
    Mp4Builder::new(3840, 2160)
        .duration_ms(10_000)
        .frames(240, 24000, 1001)
        .sample_size(50_000)
        .rotation_90()
        .nclx(9, 16, 9, false)
}

/// 1080p clip without a color box.
pub fn sdr_movie() -> Mp4Builder {
    Mp4Builder::new(1920, 1080)
        .duration_ms(2_000)
        .frames(50, 25, 1)
        .sample_size(10_000)
}

/// Serves a fixed body, honoring single `bytes=a-b` ranges with `206`.
///
/// Requests without a usable range get the whole body with `200`. Counts
/// requests and body bytes so tests can check how much was transferred.
#[derive(Clone)]
pub struct RangeResponder {
    body: Arc<Vec<u8>>,
    delay: Option<Duration>,
    requests: Arc<AtomicUsize>,
    served: Arc<AtomicU64>,
}

impl RangeResponder {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Arc::new(body),
            delay: None,
            requests: Arc::new(AtomicUsize::new(0)),
            served: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hold back every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn served_bytes(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    fn requested_range(&self, request: &Request) -> Option<(usize, usize)> {
        let value = request.headers.get("range")?.to_str().ok()?;
        let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
        let start: usize = start.parse().ok()?;
        let end: usize = end.parse().ok()?;
        let last = end.min(self.body.len().checked_sub(1)?);
        (start <= last).then_some((start, last))
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let template = match self.requested_range(request) {
            Some((start, last)) => {
                let slice = self.body[start..=last].to_vec();
                self.served.fetch_add(slice.len() as u64, Ordering::SeqCst);
                ResponseTemplate::new(206)
                    .insert_header(
                        "content-range",
                        format!("bytes {}-{}/{}", start, last, self.body.len()).as_str(),
                    )
                    .set_body_bytes(slice)
            }
            None => {
                self.served
                    .fetch_add(self.body.len() as u64, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_bytes(self.body.as_slice())
            }
        };

        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}
