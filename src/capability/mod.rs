//! Display capability detection.
//!
//! [`CapabilityDetector`] answers three questions about the primary display
//! (HDR support, the HDR formats it decodes, wide color gamut) by querying a
//! [`DisplayProvider`]. Platform versions below a feature's introduction
//! answer `false`/empty rather than failing, and so does a missing display.

pub mod drm;
mod fixed;

pub use drm::DrmDisplayProvider;
pub use fixed::StaticDisplayProvider;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, Capability, Error, Result};

/// `major.minor` version reported by a display provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
}

impl PlatformVersion {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Leading `major.minor` of a kernel release string such as
    /// `6.8.0-45-generic`.
    pub fn from_release(release: &str) -> Option<Self> {
        let mut parts = release.trim().split(|c: char| !c.is_ascii_digit());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Self::new(major, minor))
    }
}

impl FromStr for PlatformVersion {
    type Err = String;

    /// Strict `major` or `major.minor`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("invalid platform version '{}'", s);
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Minimum platform version per capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureMinimums {
    pub hdr: PlatformVersion,
    pub hdr_formats: PlatformVersion,
    pub wide_color_gamut: PlatformVersion,
    pub hdr10_plus: PlatformVersion,
}

impl FeatureMinimums {
    /// Android API levels at which each display query became available.
    pub const fn android() -> Self {
        Self {
            hdr: PlatformVersion::new(26, 0),
            hdr_formats: PlatformVersion::new(24, 0),
            wide_color_gamut: PlatformVersion::new(26, 0),
            hdr10_plus: PlatformVersion::new(29, 0),
        }
    }
}

/// HDR format tags reported by [`CapabilityDetector::supported_hdr_formats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HdrFormat {
    DolbyVision,
    Hdr10,
    Hdr10Plus,
    Hlg,
}

impl HdrFormat {
    /// Platform HDR type codes and their tags.
    const CODES: [(i32, HdrFormat); 4] = [
        (1, HdrFormat::DolbyVision),
        (2, HdrFormat::Hdr10),
        (3, HdrFormat::Hlg),
        (4, HdrFormat::Hdr10Plus),
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, format)| *format)
    }

    pub fn code(&self) -> i32 {
        match self {
            HdrFormat::DolbyVision => 1,
            HdrFormat::Hdr10 => 2,
            HdrFormat::Hlg => 3,
            HdrFormat::Hdr10Plus => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HdrFormat::DolbyVision => "dolby_vision",
            HdrFormat::Hdr10 => "hdr10",
            HdrFormat::Hdr10Plus => "hdr10_plus",
            HdrFormat::Hlg => "hlg",
        }
    }
}

impl fmt::Display for HdrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of display facts for the current device.
///
/// Query methods return `Ok(None)` when there is no display to ask.
pub trait DisplayProvider: Send + Sync {
    /// Short identifier for logs (e.g. `"drm"`).
    fn name(&self) -> &str;

    fn platform_version(&self) -> PlatformVersion;

    /// Versions at which each query became available on this platform.
    fn feature_minimums(&self) -> FeatureMinimums {
        FeatureMinimums::default()
    }

    fn is_hdr(&self) -> std::result::Result<Option<bool>, BoxError>;

    /// Raw HDR type codes, see [`HdrFormat::from_code`].
    fn hdr_types(&self) -> std::result::Result<Option<Vec<i32>>, BoxError>;

    fn is_wide_color_gamut(&self) -> std::result::Result<Option<bool>, BoxError>;
}

/// Version-gated capability queries over a [`DisplayProvider`].
///
/// Answers are never cached; each call asks the provider again.
#[derive(Clone)]
pub struct CapabilityDetector {
    provider: Arc<dyn DisplayProvider>,
    minimums: Option<FeatureMinimums>,
}

impl CapabilityDetector {
    pub fn new(provider: Arc<dyn DisplayProvider>) -> Self {
        Self {
            provider,
            minimums: None,
        }
    }

    /// Replace the provider's own feature minimums.
    pub fn with_minimums(mut self, minimums: FeatureMinimums) -> Self {
        self.minimums = Some(minimums);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn minimums(&self) -> FeatureMinimums {
        self.minimums
            .unwrap_or_else(|| self.provider.feature_minimums())
    }

    fn below(&self, minimum: PlatformVersion, capability: Capability) -> bool {
        let version = self.provider.platform_version();
        let below = version < minimum;
        if below {
            tracing::warn!(
                %capability,
                %version,
                %minimum,
                "platform below feature minimum"
            );
        }
        below
    }

    pub fn is_hdr_supported(&self) -> Result<bool> {
        if self.below(self.minimums().hdr, Capability::Hdr) {
            return Ok(false);
        }

        let answer = self
            .provider
            .is_hdr()
            .map_err(|e| Error::capability(Capability::Hdr, e))?;
        Ok(answer.unwrap_or_else(|| {
            tracing::warn!(provider = self.provider.name(), "no display, reporting no HDR");
            false
        }))
    }

    /// Supported formats in provider order, deduplicated, unknown codes dropped.
    pub fn supported_hdr_formats(&self) -> Result<Vec<HdrFormat>> {
        let minimums = self.minimums();
        if self.below(minimums.hdr_formats, Capability::HdrFormats) {
            return Ok(Vec::new());
        }

        let codes = match self
            .provider
            .hdr_types()
            .map_err(|e| Error::capability(Capability::HdrFormats, e))?
        {
            Some(codes) => codes,
            None => {
                tracing::warn!(provider = self.provider.name(), "no display, reporting no HDR formats");
                return Ok(Vec::new());
            }
        };

        let hdr10_plus_allowed = self.provider.platform_version() >= minimums.hdr10_plus;
        let mut formats = Vec::with_capacity(codes.len());
        for code in codes {
            let Some(format) = HdrFormat::from_code(code) else {
                tracing::debug!(code, "dropping unrecognized HDR type code");
                continue;
            };
            if format == HdrFormat::Hdr10Plus && !hdr10_plus_allowed {
                continue;
            }
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    pub fn is_wide_color_gamut_supported(&self) -> Result<bool> {
        if self.below(self.minimums().wide_color_gamut, Capability::WideColorGamut) {
            return Ok(false);
        }

        let answer = self
            .provider
            .is_wide_color_gamut()
            .map_err(|e| Error::capability(Capability::WideColorGamut, e))?;
        Ok(answer.unwrap_or_else(|| {
            tracing::warn!(provider = self.provider.name(), "no display, reporting no wide color gamut");
            false
        }))
    }
}
