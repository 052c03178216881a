use super::{DisplayProvider, FeatureMinimums, HdrFormat, PlatformVersion};
use crate::error::BoxError;

/// A display with fixed, preconfigured answers.
///
/// Used when no display can be queried, for example a headless host with a
/// known panel attached elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplayProvider {
    pub version: PlatformVersion,
    pub minimums: FeatureMinimums,
    pub hdr: bool,
    pub wide_color_gamut: bool,
    pub hdr_formats: Vec<HdrFormat>,
}

impl StaticDisplayProvider {
    pub fn new(hdr: bool, wide_color_gamut: bool, hdr_formats: Vec<HdrFormat>) -> Self {
        Self {
            hdr,
            wide_color_gamut,
            hdr_formats,
            ..Default::default()
        }
    }
}

impl DisplayProvider for StaticDisplayProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn platform_version(&self) -> PlatformVersion {
        self.version
    }

    fn feature_minimums(&self) -> FeatureMinimums {
        self.minimums
    }

    fn is_hdr(&self) -> Result<Option<bool>, BoxError> {
        Ok(Some(self.hdr))
    }

    fn hdr_types(&self) -> Result<Option<Vec<i32>>, BoxError> {
        Ok(Some(self.hdr_formats.iter().map(HdrFormat::code).collect()))
    }

    fn is_wide_color_gamut(&self) -> Result<Option<bool>, BoxError> {
        Ok(Some(self.wide_color_gamut))
    }
}
