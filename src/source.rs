//! Source references: a raw source string classified by scheme.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// How a source string is to be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Bundled application asset (`asset://`)
    Asset,
    /// Local file URL (`file://`)
    File,
    /// Network URL (`http://` or `https://`)
    Http,
    /// Platform content URI (`content://`)
    Content,
    /// No recognized prefix; treated as a literal filesystem path
    Unspecified,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Asset => "asset",
            Scheme::File => "file",
            Scheme::Http => "http",
            Scheme::Content => "content",
            Scheme::Unspecified => "path",
        };
        write!(f, "{}", name)
    }
}

/// Prefix table in match order. First match wins.
const PREFIXES: &[(&str, Scheme)] = &[
    ("asset://", Scheme::Asset),
    ("file://", Scheme::File),
    ("http://", Scheme::Http),
    ("https://", Scheme::Http),
    ("content://", Scheme::Content),
];

/// Immutable description of where a video lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    scheme: Scheme,
    path_or_uri: String,
    headers: HashMap<String, String>,
}

impl SourceReference {
    /// Classify `raw` by its scheme prefix.
    ///
    /// An empty string is rejected; anything else classifies (possibly as
    /// [`Scheme::Unspecified`]).
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let path_or_uri = raw.into();
        if path_or_uri.is_empty() {
            return Err(Error::invalid_argument("source path is empty"));
        }

        let scheme = PREFIXES
            .iter()
            .find(|(prefix, _)| path_or_uri.starts_with(prefix))
            .map(|(_, scheme)| *scheme)
            .unwrap_or(Scheme::Unspecified);

        Ok(Self {
            scheme,
            path_or_uri,
            headers: HashMap::new(),
        })
    }

    /// Attach request headers. Only consulted for [`Scheme::Http`] sources.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The original string, scheme prefix included.
    pub fn path_or_uri(&self) -> &str {
        &self.path_or_uri
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The string with the `asset://` or `file://` prefix removed.
    ///
    /// Network, content and unspecified sources are returned unchanged.
    pub fn stripped(&self) -> &str {
        let prefix = match self.scheme {
            Scheme::Asset => "asset://",
            Scheme::File => "file://",
            _ => return &self.path_or_uri,
        };
        self.path_or_uri
            .strip_prefix(prefix)
            .unwrap_or(&self.path_or_uri)
    }

    pub fn is_network(&self) -> bool {
        self.scheme == Scheme::Http
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_or_uri)
    }
}
