//! Source resolution: turn a [`SourceReference`] into something an inspector
//! can open.
//!
//! Exactly one strategy runs per scheme. Bundled assets are copied into a
//! scoped temporary file owned by the returned [`ResolvedHandle`], so the
//! copy disappears when the handle is dropped, whatever path the caller
//! took to get there.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::source::{Scheme, SourceReference};

/// Prefix of temporary copies of bundled assets.
pub const ASSET_TEMP_PREFIX: &str = "asset_video";

/// Maps a logical asset name to a readable file.
pub trait AssetLookup: Send + Sync {
    /// Returns `None` when no asset with that name exists.
    fn lookup(&self, name: &str) -> Option<PathBuf>;
}

/// Opens platform content URIs.
pub trait ContentResolver: Send + Sync {
    fn open(&self, uri: &str) -> io::Result<File>;
}

/// Assets stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLookup for DirectoryAssets {
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            tracing::debug!(name, "asset name escapes the asset root");
            return None;
        }

        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }
}

/// What an inspector is handed.
#[derive(Debug)]
pub enum MediaSource {
    /// A readable local file
    Path(PathBuf),
    /// An already opened file (content URIs)
    Open(File),
    /// A network resource, fetched by the inspector
    Remote {
        url: String,
        headers: HashMap<String, String>,
    },
}

/// A resolved source plus any temporary file backing it.
///
/// Dropping the handle deletes the temporary file.
#[derive(Debug)]
pub struct ResolvedHandle {
    source: MediaSource,
    temp: Option<NamedTempFile>,
}

impl ResolvedHandle {
    fn new(source: MediaSource) -> Self {
        Self { source, temp: None }
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Path of the scoped temporary copy, if one was made.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(NamedTempFile::path)
    }
}

/// Selects and runs the resolution strategy for a source's scheme.
#[derive(Clone)]
pub struct SourceResolver {
    assets: Arc<dyn AssetLookup>,
    content: Option<Arc<dyn ContentResolver>>,
    temp_dir: Option<PathBuf>,
}

impl SourceResolver {
    pub fn new(assets: Arc<dyn AssetLookup>) -> Self {
        Self {
            assets,
            content: None,
            temp_dir: None,
        }
    }

    /// Install a resolver for `content://` URIs.
    pub fn with_content_resolver(mut self, content: Arc<dyn ContentResolver>) -> Self {
        self.content = Some(content);
        self
    }

    /// Directory for temporary asset copies (system temp dir when unset).
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub async fn resolve(&self, source: &SourceReference) -> Result<ResolvedHandle> {
        tracing::debug!(source = %source, scheme = %source.scheme(), "resolving source");

        match source.scheme() {
            Scheme::Asset => self.resolve_asset(source.stripped()).await,
            Scheme::File => Ok(ResolvedHandle::new(MediaSource::Path(PathBuf::from(
                source.stripped(),
            )))),
            Scheme::Http => Ok(ResolvedHandle::new(MediaSource::Remote {
                url: source.path_or_uri().to_string(),
                headers: source.headers().clone(),
            })),
            Scheme::Content => self.resolve_content(source.path_or_uri()).await,
            Scheme::Unspecified => Ok(ResolvedHandle::new(MediaSource::Path(PathBuf::from(
                source.path_or_uri(),
            )))),
        }
    }

    async fn resolve_asset(&self, name: &str) -> Result<ResolvedHandle> {
        let asset = self.assets.lookup(name).ok_or_else(|| Error::AssetNotFound {
            name: name.to_string(),
        })?;

        let suffix = asset
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix(ASSET_TEMP_PREFIX).suffix(&suffix);
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(Error::metadata)?;

        // On failure `temp` is dropped here, which removes the partial copy
        let copied = tokio::fs::copy(&asset, temp.path())
            .await
            .map_err(Error::metadata)?;

        tracing::debug!(
            asset = %asset.display(),
            temp = %temp.path().display(),
            bytes = copied,
            "copied asset to temporary file"
        );

        Ok(ResolvedHandle {
            source: MediaSource::Path(temp.path().to_path_buf()),
            temp: Some(temp),
        })
    }

    async fn resolve_content(&self, uri: &str) -> Result<ResolvedHandle> {
        let content = self
            .content
            .clone()
            .ok_or_else(|| Error::unavailable("content URI resolution"))?;

        let uri = uri.to_string();
        let file = tokio::task::spawn_blocking(move || content.open(&uri))
            .await
            .map_err(Error::metadata)?
            .map_err(Error::metadata)?;

        Ok(ResolvedHandle::new(MediaSource::Open(file)))
    }
}
