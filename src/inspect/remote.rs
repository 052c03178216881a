//! Ranged HTTP access to remote sources.
//!
//! Servers that answer a `Range` request with `206 Partial Content` are read
//! in place through [`RangeReader`], so the probe only pulls the blocks it
//! actually seeks to. Every wait on the network is bounded by an idle
//! timeout rather than a whole-transfer deadline.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::runtime::Handle;

use super::InspectError;

/// Request settings shared by every fetch against one remote source.
#[derive(Clone)]
pub(crate) struct RemoteFetch {
    pub client: Client,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub idle_timeout: Duration,
}

impl RemoteFetch {
    /// GET with the caller's headers attached.
    pub fn get(&self) -> RequestBuilder {
        let mut request = self.client.get(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    /// Send, waiting at most the idle timeout for the response head.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, InspectError> {
        tokio::time::timeout(self.idle_timeout, request.send())
            .await
            .map_err(|_| self.stalled())?
            .map_err(InspectError::from)
    }

    /// Ask for `len` bytes starting at `start`.
    pub async fn range(&self, start: u64, len: u64) -> Result<Response, InspectError> {
        let last = start + len.max(1) - 1;
        self.send(self.get().header(RANGE, format!("bytes={}-{}", start, last)))
            .await
    }

    /// Next body chunk, failing when the server goes quiet for too long.
    pub async fn next_chunk(&self, response: &mut Response) -> Result<Option<Bytes>, InspectError> {
        tokio::time::timeout(self.idle_timeout, response.chunk())
            .await
            .map_err(|_| self.stalled())?
            .map_err(InspectError::from)
    }

    /// Read at most `max` bytes of a response body.
    pub async fn collect(&self, response: &mut Response, max: u64) -> Result<Bytes, InspectError> {
        let max = max as usize;
        let mut body = Vec::new();
        while let Some(chunk) = self.next_chunk(response).await? {
            let take = chunk.len().min(max - body.len());
            body.extend_from_slice(&chunk[..take]);
            if body.len() >= max {
                break;
            }
        }
        Ok(Bytes::from(body))
    }

    /// Fetch one block; anything but `206` means the server stopped cooperating.
    pub async fn read_range(&self, start: u64, len: u64) -> Result<Bytes, InspectError> {
        let mut response = self.range(start, len).await?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(self.status_error(response.status()));
        }
        self.collect(&mut response, len).await
    }

    pub fn status_error(&self, status: StatusCode) -> InspectError {
        InspectError::HttpStatus {
            status: status.as_u16(),
            url: self.url.clone(),
        }
    }

    fn stalled(&self) -> InspectError {
        InspectError::Stalled {
            url: self.url.clone(),
            secs: self.idle_timeout.as_secs(),
        }
    }
}

/// Total resource length from a `Content-Range` response header.
///
/// `None` when the header is absent or the length is `*`.
pub(crate) fn content_range_total(response: &Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    parse_content_range_total(value)
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    total.trim().parse().ok()
}

/// Seekable view of a remote resource, fetched one block at a time.
///
/// Used from a blocking thread: each missing block is fetched by driving the
/// async client on `runtime`. Only the most recent block is kept.
pub(crate) struct RangeReader {
    fetch: RemoteFetch,
    runtime: Handle,
    len: u64,
    pos: u64,
    block_size: u64,
    block_start: u64,
    block: Bytes,
    transferred: u64,
    limit: u64,
}

impl RangeReader {
    /// `first` is the already fetched block at offset 0.
    pub fn new(
        fetch: RemoteFetch,
        runtime: Handle,
        len: u64,
        block_size: u64,
        limit: u64,
        first: Bytes,
    ) -> Self {
        Self {
            fetch,
            runtime,
            len,
            pos: 0,
            block_size: block_size.max(1),
            block_start: 0,
            transferred: first.len() as u64,
            block: first,
            limit,
        }
    }

    /// Body bytes pulled from the server so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn load(&mut self, start: u64) -> io::Result<()> {
        let len = self.block_size.min(self.len - start);
        if self.transferred.saturating_add(len) > self.limit {
            return Err(io::Error::other(InspectError::DownloadTooLarge { limit: self.limit }));
        }

        let block = self
            .runtime
            .block_on(self.fetch.read_range(start, len))
            .map_err(io::Error::other)?;
        if block.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server returned an empty range",
            ));
        }

        tracing::trace!(url = %self.fetch.url, start, bytes = block.len(), "fetched range");
        self.transferred += block.len() as u64;
        self.block_start = start;
        self.block = block;
        Ok(())
    }
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.len {
            return Ok(0);
        }

        let block_end = self.block_start + self.block.len() as u64;
        if self.pos < self.block_start || self.pos >= block_end {
            self.load(self.pos)?;
        }

        let available = &self.block[(self.pos - self.block_start) as usize..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let pos = match target {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        self.pos = pos.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of remote source")
        })?;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-1023/4096"), Some(4096));
        assert_eq!(parse_content_range_total(" bytes 100-199/200 "), Some(200));
        assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
        assert_eq!(parse_content_range_total("items 0-1/2"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reader_serves_first_block_without_requests() {
        let fetch = RemoteFetch {
            client: Client::new(),
            // Nothing listens here; any fetch would fail
            url: "http://127.0.0.1:9/clip.mp4".to_string(),
            headers: HashMap::new(),
            idle_timeout: Duration::from_secs(1),
        };
        let first = Bytes::from_static(b"0123456789");
        let mut reader = RangeReader::new(fetch, Handle::current(), 10, 4, 100, first);

        let mut buf = [0u8; 4];
        reader.seek(SeekFrom::Start(6)).unwrap();
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"6789");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.seek(SeekFrom::End(-10)).unwrap(), 0);
        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(reader.transferred(), 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reader_enforces_limit() {
        let fetch = RemoteFetch {
            client: Client::new(),
            url: "http://127.0.0.1:9/clip.mp4".to_string(),
            headers: HashMap::new(),
            idle_timeout: Duration::from_secs(1),
        };
        let mut reader =
            RangeReader::new(fetch, Handle::current(), 1_000, 100, 150, Bytes::from(vec![0u8; 100]));

        reader.seek(SeekFrom::Start(500)).unwrap();
        let err = reader.read(&mut [0u8; 8]).unwrap_err();
        assert!(err.to_string().contains("150 byte limit"), "{}", err);
    }
}
