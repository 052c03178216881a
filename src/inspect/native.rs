//! In-process inspector built on `hdrscope-probe`.
//!
//! Local files are probed on the blocking pool. Network sources are read in
//! place with ranged requests when the server allows it; otherwise the body
//! is streamed into a scoped temporary file, with the caller's headers
//! forwarded, and probed like any local file.

use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, Url};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;

use hdrscope_probe::{ColorDescription, ContainerInfo};

use super::remote::{content_range_total, RangeReader, RemoteFetch};
use super::{InspectError, MediaInspector, RawMetadata, RawVideoTrack};
use crate::color::{CodeSpace, RawColorParams};
use crate::config::RemoteConfig;
use crate::resolve::MediaSource;

/// Prefix of temporary files holding downloaded sources.
pub const DOWNLOAD_TEMP_PREFIX: &str = "remote_video";

/// Built-in [`MediaInspector`].
#[derive(Clone)]
pub struct NativeInspector {
    client: Client,
    idle_timeout: Duration,
    range_block_bytes: u64,
    max_download_bytes: u64,
    temp_dir: Option<PathBuf>,
}

impl NativeInspector {
    pub fn new(remote: &RemoteConfig) -> Self {
        let idle_timeout = Duration::from_secs(remote.timeout_secs);
        let client = Client::builder()
            .connect_timeout(idle_timeout)
            .user_agent(remote.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            idle_timeout,
            range_block_bytes: remote.range_block_bytes,
            max_download_bytes: remote.max_download_bytes,
            temp_dir: None,
        }
    }

    /// Directory for downloaded sources (system temp dir when unset).
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    async fn probe_path(path: PathBuf) -> Result<ContainerInfo, InspectError> {
        let info = tokio::task::spawn_blocking(move || hdrscope_probe::probe_file(&path)).await??;
        Ok(info)
    }

    async fn probe_remote(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<ContainerInfo, InspectError> {
        let fetch = RemoteFetch {
            client: self.client.clone(),
            url: url.to_string(),
            headers: headers.clone(),
            idle_timeout: self.idle_timeout,
        };

        let first_len = self.range_block_bytes.min(self.max_download_bytes);
        let mut response = fetch.range(0, first_len).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch.status_error(status));
        }

        if status == StatusCode::PARTIAL_CONTENT {
            if let Some(len) = content_range_total(&response) {
                let first = fetch.collect(&mut response, first_len).await?;
                return self.probe_ranged(fetch, len, first).await;
            }

            // Without a total length nothing past the first block can be sought
            tracing::debug!(url, "partial response without a length, fetching whole body");
            response = fetch.send(fetch.get()).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(fetch.status_error(status));
            }
        }

        // Kept alive until probing finishes, removed on drop
        let temp = self.download(&fetch, response).await?;
        Self::probe_path(temp.path().to_path_buf()).await
    }

    async fn probe_ranged(
        &self,
        fetch: RemoteFetch,
        len: u64,
        first: Bytes,
    ) -> Result<ContainerInfo, InspectError> {
        tracing::debug!(url = %fetch.url, len, "server honors ranges, probing in place");

        let mut reader = RangeReader::new(
            fetch,
            Handle::current(),
            len,
            self.range_block_bytes,
            self.max_download_bytes,
            first,
        );
        let info = tokio::task::spawn_blocking(move || {
            let info = hdrscope_probe::probe_reader(&mut reader, None);
            tracing::debug!(bytes = reader.transferred(), len, "ranged probe finished");
            info
        })
        .await??;
        Ok(info)
    }

    async fn download(
        &self,
        fetch: &RemoteFetch,
        mut response: Response,
    ) -> Result<NamedTempFile, InspectError> {
        let limit = self.max_download_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(InspectError::DownloadTooLarge { limit });
        }

        let temp = self.temp_file(&url_extension(&fetch.url))?;
        let mut out = tokio::fs::File::from_std(temp.reopen()?);
        let mut written = 0u64;

        while let Some(chunk) = fetch.next_chunk(&mut response).await? {
            written += chunk.len() as u64;
            if written > limit {
                return Err(InspectError::DownloadTooLarge { limit });
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        tracing::debug!(url = %fetch.url, bytes = written, temp = %temp.path().display(), "downloaded remote source");
        Ok(temp)
    }

    fn temp_file(&self, suffix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DOWNLOAD_TEMP_PREFIX).suffix(suffix);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

/// `.ext` of the URL path, or empty.
fn url_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
        })
        .unwrap_or_default()
}

#[async_trait]
impl MediaInspector for NativeInspector {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn inspect(&self, source: &MediaSource) -> Result<RawMetadata, InspectError> {
        let info = match source {
            MediaSource::Path(path) => Self::probe_path(path.clone()).await?,
            MediaSource::Open(file) => {
                let file = file.try_clone()?;
                tokio::task::spawn_blocking(move || {
                    hdrscope_probe::probe_reader(BufReader::new(file), None)
                })
                .await??
            }
            MediaSource::Remote { url, headers } => self.probe_remote(url, headers).await?,
        };

        tracing::debug!(
            inspector = self.name(),
            container = %info.container,
            video_tracks = info.video_tracks.len(),
            "inspected source"
        );
        Ok(info.into())
    }
}

impl From<ContainerInfo> for RawMetadata {
    fn from(info: ContainerInfo) -> Self {
        let video = info.primary_video().map(|track| RawVideoTrack {
            width: Some(track.width).filter(|w| *w > 0),
            height: Some(track.height).filter(|h| *h > 0),
            rotation: track.rotation(),
            frame_rate: track.frame_rate,
            bitrate: track.bitrate,
            color: track.color.as_ref().map(raw_color),
        });

        RawMetadata {
            duration_ms: info.duration_ms,
            bitrate: info.bitrate,
            video,
        }
    }
}

fn raw_color(color: &ColorDescription) -> RawColorParams {
    RawColorParams {
        space: CodeSpace::H273,
        standard: Some(color.primaries.to_string()),
        transfer: Some(color.transfer.to_string()),
        range: color
            .full_range
            .map(|full| if full { "1" } else { "0" }.to_string()),
    }
}
