//! Color classification: raw platform color codes to canonical tags.
//!
//! Each code space (Android `MediaFormat` constants, CoreVideo attachment
//! strings, ITU-T H.273 code points) has its own table per axis. Lookup is
//! total: a code missing from the table, or missing altogether inside an
//! exposed parameter set, classifies as `unknown`.

use serde::{Deserialize, Serialize};

/// Vocabulary a raw color code is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSpace {
    /// `MediaFormat.COLOR_*` integer constants, as decimal strings
    MediaFormat,
    /// `kCVImageBufferColorPrimaries_*` style constants, without the prefix
    CoreVideo,
    /// ITU-T H.273 code points, as carried by MP4 `colr` boxes
    H273,
}

/// Color primaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorStandard {
    #[serde(rename = "BT2020")]
    Bt2020,
    #[serde(rename = "BT601_NTSC")]
    Bt601Ntsc,
    #[serde(rename = "BT601_PAL")]
    Bt601Pal,
    #[serde(rename = "BT709")]
    Bt709,
    #[serde(rename = "unknown")]
    Unknown,
}

/// Transfer characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorTransfer {
    #[serde(rename = "HLG")]
    Hlg,
    #[serde(rename = "ST2084")]
    St2084,
    #[serde(rename = "SDR_VIDEO")]
    SdrVideo,
    #[serde(rename = "LINEAR")]
    Linear,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ColorTransfer {
    /// True for the PQ and HLG transfer functions.
    pub fn is_hdr(&self) -> bool {
        matches!(self, ColorTransfer::St2084 | ColorTransfer::Hlg)
    }
}

/// Quantization range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRange {
    #[serde(rename = "LIMITED")]
    Limited,
    #[serde(rename = "FULL")]
    Full,
    #[serde(rename = "unknown")]
    Unknown,
}

/// Raw color parameters as exposed by a media inspector.
///
/// A `None` code means the facility exposed a parameter set but left this
/// axis out (QuickTime `nclc` has no range flag, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColorParams {
    pub space: CodeSpace,
    pub standard: Option<String>,
    pub transfer: Option<String>,
    pub range: Option<String>,
}

/// Canonical tags for all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedColor {
    pub standard: ColorStandard,
    pub transfer: ColorTransfer,
    pub range: ColorRange,
}

type Table<T> = &'static [(&'static str, T)];

const MEDIA_FORMAT_STANDARD: Table<ColorStandard> = &[
    ("6", ColorStandard::Bt2020),
    ("4", ColorStandard::Bt601Ntsc),
    ("2", ColorStandard::Bt601Pal),
    ("1", ColorStandard::Bt709),
];

const MEDIA_FORMAT_TRANSFER: Table<ColorTransfer> = &[
    ("7", ColorTransfer::Hlg),
    ("6", ColorTransfer::St2084),
    ("3", ColorTransfer::SdrVideo),
    ("1", ColorTransfer::Linear),
];

const MEDIA_FORMAT_RANGE: Table<ColorRange> =
    &[("2", ColorRange::Limited), ("1", ColorRange::Full)];

const CORE_VIDEO_STANDARD: Table<ColorStandard> = &[
    ("ITU_R_2020", ColorStandard::Bt2020),
    ("SMPTE_C", ColorStandard::Bt601Ntsc),
    ("EBU_3213", ColorStandard::Bt601Pal),
    ("ITU_R_709_2", ColorStandard::Bt709),
];

const CORE_VIDEO_TRANSFER: Table<ColorTransfer> = &[
    ("ITU_R_2100_HLG", ColorTransfer::Hlg),
    ("SMPTE_ST_2084_PQ", ColorTransfer::St2084),
    ("ITU_R_709_2", ColorTransfer::SdrVideo),
    ("ITU_R_2020", ColorTransfer::SdrVideo),
    ("Linear", ColorTransfer::Linear),
];

// Full-range-video flag rendered as a boolean string
const CORE_VIDEO_RANGE: Table<ColorRange> =
    &[("false", ColorRange::Limited), ("true", ColorRange::Full)];

const H273_STANDARD: Table<ColorStandard> = &[
    ("9", ColorStandard::Bt2020),
    ("6", ColorStandard::Bt601Ntsc),
    ("5", ColorStandard::Bt601Pal),
    ("1", ColorStandard::Bt709),
];

const H273_TRANSFER: Table<ColorTransfer> = &[
    ("18", ColorTransfer::Hlg),
    ("16", ColorTransfer::St2084),
    ("1", ColorTransfer::SdrVideo),
    ("6", ColorTransfer::SdrVideo),
    ("14", ColorTransfer::SdrVideo),
    ("15", ColorTransfer::SdrVideo),
    ("8", ColorTransfer::Linear),
];

const H273_RANGE: Table<ColorRange> = &[("0", ColorRange::Limited), ("1", ColorRange::Full)];

fn lookup<T: Copy>(table: Table<T>, code: Option<&str>) -> Option<T> {
    let code = code?;
    table
        .iter()
        .find(|(raw, _)| *raw == code)
        .map(|(_, tag)| *tag)
}

/// Lookup tables for one code space.
#[derive(Debug, Clone, Copy)]
pub struct ColorClassifier {
    standard: Table<ColorStandard>,
    transfer: Table<ColorTransfer>,
    range: Table<ColorRange>,
}

impl ColorClassifier {
    pub const fn for_space(space: CodeSpace) -> Self {
        match space {
            CodeSpace::MediaFormat => Self {
                standard: MEDIA_FORMAT_STANDARD,
                transfer: MEDIA_FORMAT_TRANSFER,
                range: MEDIA_FORMAT_RANGE,
            },
            CodeSpace::CoreVideo => Self {
                standard: CORE_VIDEO_STANDARD,
                transfer: CORE_VIDEO_TRANSFER,
                range: CORE_VIDEO_RANGE,
            },
            CodeSpace::H273 => Self {
                standard: H273_STANDARD,
                transfer: H273_TRANSFER,
                range: H273_RANGE,
            },
        }
    }

    pub fn standard(&self, code: Option<&str>) -> ColorStandard {
        lookup(self.standard, code).unwrap_or(ColorStandard::Unknown)
    }

    pub fn transfer(&self, code: Option<&str>) -> ColorTransfer {
        lookup(self.transfer, code).unwrap_or(ColorTransfer::Unknown)
    }

    pub fn range(&self, code: Option<&str>) -> ColorRange {
        lookup(self.range, code).unwrap_or(ColorRange::Unknown)
    }

    /// Classify every axis of an exposed parameter set.
    pub fn classify(raw: &RawColorParams) -> ClassifiedColor {
        let tables = Self::for_space(raw.space);
        ClassifiedColor {
            standard: tables.standard(raw.standard.as_deref()),
            transfer: tables.transfer(raw.transfer.as_deref()),
            range: tables.range(raw.range.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SPACES: [CodeSpace; 3] = [CodeSpace::MediaFormat, CodeSpace::CoreVideo, CodeSpace::H273];

    #[test]
    fn test_every_table_row_maps_to_its_tag() {
        for space in ALL_SPACES {
            let c = ColorClassifier::for_space(space);
            for (code, tag) in c.standard {
                assert_eq!(c.standard(Some(*code)), *tag, "{:?} standard {}", space, code);
            }
            for (code, tag) in c.transfer {
                assert_eq!(c.transfer(Some(*code)), *tag, "{:?} transfer {}", space, code);
            }
            for (code, tag) in c.range {
                assert_eq!(c.range(Some(*code)), *tag, "{:?} range {}", space, code);
            }
        }
    }

    #[test]
    fn test_out_of_table_codes_are_unknown() {
        for space in ALL_SPACES {
            let c = ColorClassifier::for_space(space);
            for code in [Some("999"), Some(""), Some("bt2020"), None] {
                assert_eq!(c.standard(code), ColorStandard::Unknown);
                assert_eq!(c.transfer(code), ColorTransfer::Unknown);
                assert_eq!(c.range(code), ColorRange::Unknown);
            }
        }
    }

    #[test]
    fn test_code_spaces_are_independent() {
        // "6" is BT2020 for MediaFormat but BT601 NTSC in H.273
        assert_eq!(
            ColorClassifier::for_space(CodeSpace::MediaFormat).standard(Some("6")),
            ColorStandard::Bt2020
        );
        assert_eq!(
            ColorClassifier::for_space(CodeSpace::H273).standard(Some("6")),
            ColorStandard::Bt601Ntsc
        );
        assert_eq!(
            ColorClassifier::for_space(CodeSpace::CoreVideo).transfer(Some("6")),
            ColorTransfer::Unknown
        );
    }

    #[test]
    fn test_classify_hdr10_params() {
        let raw = RawColorParams {
            space: CodeSpace::H273,
            standard: Some("9".into()),
            transfer: Some("16".into()),
            range: None,
        };
        let classified = ColorClassifier::classify(&raw);
        assert_eq!(classified.standard, ColorStandard::Bt2020);
        assert_eq!(classified.transfer, ColorTransfer::St2084);
        assert_eq!(classified.range, ColorRange::Unknown);
        assert!(classified.transfer.is_hdr());
    }

    #[test]
    fn test_is_hdr() {
        assert!(ColorTransfer::Hlg.is_hdr());
        assert!(ColorTransfer::St2084.is_hdr());
        assert!(!ColorTransfer::SdrVideo.is_hdr());
        assert!(!ColorTransfer::Linear.is_hdr());
        assert!(!ColorTransfer::Unknown.is_hdr());
    }

    #[test]
    fn test_serialized_tags() {
        assert_eq!(serde_json::to_string(&ColorStandard::Bt601Pal).unwrap(), "\"BT601_PAL\"");
        assert_eq!(serde_json::to_string(&ColorTransfer::SdrVideo).unwrap(), "\"SDR_VIDEO\"");
        assert_eq!(serde_json::to_string(&ColorRange::Unknown).unwrap(), "\"unknown\"");
    }
}
