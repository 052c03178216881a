//! Streaming guard: rejects adaptive streaming manifests before any I/O.
//!
//! The check is purely syntactic. Redirects and manifests served without a
//! telling extension get through and fail later during inspection, where
//! the network error hint covers them.

use reqwest::Url;

use crate::error::{Error, Result, StreamingFormat};
use crate::source::{Scheme, SourceReference};

/// Reject HLS and DASH network sources.
///
/// Only [`Scheme::Http`] sources are examined. The URL path is compared
/// case-insensitively with the query string and fragment removed.
pub fn check(source: &SourceReference) -> Result<()> {
    if source.scheme() != Scheme::Http {
        return Ok(());
    }

    let url = Url::parse(source.path_or_uri())
        .map_err(|e| Error::invalid_argument(format!("malformed URL {}: {}", source, e)))?;

    match streaming_format(url.path()) {
        Some(format) => {
            tracing::debug!(url = %source, %format, "rejecting streaming manifest");
            Err(Error::StreamingUnsupported { format })
        }
        None => Ok(()),
    }
}

fn streaming_format(path: &str) -> Option<StreamingFormat> {
    let path = path.to_ascii_lowercase();
    if path.ends_with(".m3u8") {
        Some(StreamingFormat::Hls)
    } else if path.ends_with(".mpd") {
        Some(StreamingFormat::Dash)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn guard(raw: &str) -> Result<()> {
        check(&SourceReference::parse(raw).unwrap())
    }

    #[test]
    fn test_hls_rejected() {
        assert_matches!(
            guard("https://example.com/video.m3u8"),
            Err(Error::StreamingUnsupported {
                format: StreamingFormat::Hls
            })
        );
    }

    #[test]
    fn test_dash_rejected() {
        assert_matches!(
            guard("http://example.com/live/manifest.mpd"),
            Err(Error::StreamingUnsupported {
                format: StreamingFormat::Dash
            })
        );
    }

    #[test]
    fn test_query_and_case_ignored() {
        assert_matches!(
            guard("https://example.com/Master.M3U8?token=abc#t=10"),
            Err(Error::StreamingUnsupported {
                format: StreamingFormat::Hls
            })
        );
        // Extension only in the query string does not count
        assert!(guard("https://example.com/play?src=a.m3u8").is_ok());
    }

    #[test]
    fn test_progressive_download_allowed() {
        assert!(guard("https://example.com/video.mp4").is_ok());
    }

    #[test]
    fn test_local_sources_never_rejected() {
        assert!(guard("/sdcard/playlist.m3u8").is_ok());
        assert!(guard("file:///data/manifest.mpd").is_ok());
        assert!(guard("asset://streams/index.m3u8").is_ok());
    }

    #[test]
    fn test_malformed_url() {
        assert_matches!(guard("http://"), Err(Error::InvalidArgument(_)));
    }
}
