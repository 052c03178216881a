//! hdrscope - HDR display capability detection and video metadata extraction
//!
//! Two halves share one error type:
//!
//! - [`capability`] answers whether the primary display supports HDR, which
//!   HDR formats it takes and whether it covers a wide color gamut.
//! - [`extract`] derives dimensions, duration, bitrate, rotation, frame rate
//!   and classified color parameters from a source reference, without
//!   decoding frames.
//!
//! [`dispatch`] exposes both to a host application by method name.

pub mod capability;
pub mod color;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod guard;
pub mod inspect;
pub mod resolve;
pub mod source;

pub use error::{Error, Result};

use std::sync::Arc;

use capability::{CapabilityDetector, DisplayProvider, DrmDisplayProvider, StaticDisplayProvider};
use config::{Config, DisplayFallback};
use dispatch::Dispatcher;
use extract::MetadataExtractor;
use inspect::NativeInspector;
use resolve::{DirectoryAssets, SourceResolver};

/// Wire the built-in collaborators together as configured.
pub fn dispatcher_from_config(config: &Config) -> anyhow::Result<Dispatcher> {
    let mut resolver = SourceResolver::new(Arc::new(DirectoryAssets::new(&config.assets.root)));
    let mut inspector = NativeInspector::new(&config.remote);
    if let Some(dir) = &config.assets.temp_dir {
        resolver = resolver.with_temp_dir(dir);
        inspector = inspector.with_temp_dir(dir);
    }
    let extractor = MetadataExtractor::new(resolver, Arc::new(inspector));

    let mut detector = CapabilityDetector::new(display_provider(config));
    if let Some(minimums) = &config.display.minimums {
        detector = detector.with_minimums(minimums.to_minimums()?);
    }

    Ok(Dispatcher::new(detector, extractor))
}

fn display_provider(config: &Config) -> Arc<dyn DisplayProvider> {
    let drm = DrmDisplayProvider::new(&config.display.drm_root);
    if drm.is_present() {
        return Arc::new(drm);
    }

    match &config.display.fallback {
        DisplayFallback::Static {
            hdr,
            wide_color_gamut,
            hdr_types,
        } => {
            tracing::debug!("DRM tree missing, using static display answers");
            Arc::new(StaticDisplayProvider::new(
                *hdr,
                *wide_color_gamut,
                hdr_types.clone(),
            ))
        }
        DisplayFallback::None => {
            tracing::debug!(root = %config.display.drm_root.display(), "DRM tree missing, no display");
            Arc::new(drm)
        }
    }
}
