//! Linux display provider backed by the DRM sysfs tree.
//!
//! Each connector under `/sys/class/drm` (`card0-eDP-1`, `card1-HDMI-A-1`,
//! ...) exposes a `status` and the sink's raw `edid`. HDR and gamut support
//! come from the CTA-861 extension blocks of that EDID.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{DisplayProvider, HdrFormat, PlatformVersion};
use crate::error::BoxError;

const DEFAULT_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

const EDID_BLOCK: usize = 128;
const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
const CTA_EXTENSION_TAG: u8 = 0x02;

// CTA-861 data block tags
const TAG_EXTENDED: u8 = 7;
const EXT_VENDOR_SPECIFIC_VIDEO: u8 = 1;
const EXT_COLORIMETRY: u8 = 5;
const EXT_HDR_STATIC_METADATA: u8 = 6;

// IEEE OUIs, little-endian as stored in the block
const OUI_DOLBY: [u8; 3] = [0x46, 0xD0, 0x00];
const OUI_HDR10_PLUS: [u8; 3] = [0x8B, 0x84, 0x90];

/// Errors decoding an EDID blob.
#[derive(Debug, thiserror::Error)]
pub enum EdidError {
    #[error("EDID too short: {0} bytes")]
    TooShort(usize),

    #[error("EDID header mismatch")]
    BadHeader,
}

/// Display features advertised in an EDID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdidCapabilities {
    /// SMPTE ST 2084 EOTF
    pub hdr10: bool,
    /// Hybrid log-gamma EOTF
    pub hlg: bool,
    pub dolby_vision: bool,
    pub hdr10_plus: bool,
    /// Any BT.2020 colorimetry bit
    pub bt2020: bool,
    pub dci_p3: bool,
}

impl EdidCapabilities {
    pub fn is_hdr(&self) -> bool {
        self.hdr10 || self.hlg
    }

    pub fn is_wide_color_gamut(&self) -> bool {
        self.bt2020 || self.dci_p3
    }

    /// HDR type codes in code order.
    pub fn hdr_types(&self) -> Vec<i32> {
        [
            (self.dolby_vision, HdrFormat::DolbyVision),
            (self.hdr10, HdrFormat::Hdr10),
            (self.hlg, HdrFormat::Hlg),
            (self.hdr10_plus, HdrFormat::Hdr10Plus),
        ]
        .into_iter()
        .filter(|(present, _)| *present)
        .map(|(_, format)| format.code())
        .collect()
    }
}

/// Parse the capability bits out of a raw EDID.
pub fn parse_edid(edid: &[u8]) -> Result<EdidCapabilities, EdidError> {
    if edid.len() < EDID_BLOCK {
        return Err(EdidError::TooShort(edid.len()));
    }
    if edid[..8] != EDID_HEADER {
        return Err(EdidError::BadHeader);
    }

    let mut caps = EdidCapabilities::default();
    let extensions = edid[126] as usize;

    for block in edid.chunks_exact(EDID_BLOCK).skip(1).take(extensions) {
        if block[0] == CTA_EXTENSION_TAG {
            parse_cta_block(block, &mut caps);
        }
    }

    Ok(caps)
}

fn parse_cta_block(block: &[u8], caps: &mut EdidCapabilities) {
    // Byte 2 is the offset of the first detailed timing descriptor; the
    // data block collection sits between byte 4 and that offset.
    let end = (block[2] as usize).min(block.len());
    let mut offset = 4;

    while offset < end {
        let header = block[offset];
        let tag = header >> 5;
        let len = (header & 0x1F) as usize;
        if offset + 1 + len > end {
            break;
        }
        if tag == TAG_EXTENDED && len > 0 {
            parse_extended_block(&block[offset..offset + 1 + len], caps);
        }
        offset += 1 + len;
    }
}

/// `data[0]` is the block header, `data[1]` the extended tag.
fn parse_extended_block(data: &[u8], caps: &mut EdidCapabilities) {
    match data[1] {
        EXT_HDR_STATIC_METADATA => {
            if let Some(eotf) = data.get(2) {
                caps.hdr10 |= eotf & 0x04 != 0;
                caps.hlg |= eotf & 0x08 != 0;
            }
        }
        EXT_COLORIMETRY => {
            if let Some(first) = data.get(2) {
                caps.bt2020 |= first & 0xE0 != 0;
            }
            if let Some(second) = data.get(3) {
                caps.dci_p3 |= second & 0x80 != 0;
            }
        }
        EXT_VENDOR_SPECIFIC_VIDEO => match data.get(2..5) {
            Some(oui) if oui == OUI_DOLBY => caps.dolby_vision = true,
            Some(oui) if oui == OUI_HDR10_PLUS => caps.hdr10_plus = true,
            _ => {}
        },
        _ => {}
    }
}

/// [`DisplayProvider`] reading the first connected DRM connector.
#[derive(Debug, Clone)]
pub struct DrmDisplayProvider {
    drm_root: PathBuf,
    release_path: PathBuf,
}

impl DrmDisplayProvider {
    pub fn new(drm_root: impl Into<PathBuf>) -> Self {
        Self {
            drm_root: drm_root.into(),
            release_path: PathBuf::from(DEFAULT_RELEASE_PATH),
        }
    }

    /// Read the kernel release from somewhere other than procfs.
    pub fn with_release_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.release_path = path.into();
        self
    }

    /// Whether the DRM tree exists at all.
    pub fn is_present(&self) -> bool {
        self.drm_root.is_dir()
    }

    /// The connector to report on: internal panels first, then by name.
    fn connected_connector(&self) -> io::Result<Option<PathBuf>> {
        if !self.is_present() {
            return Ok(None);
        }

        let mut connectors = Vec::new();
        for entry in fs::read_dir(&self.drm_root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !(name.starts_with("card") && name.contains('-')) {
                continue;
            }
            if is_connected(&entry.path()) {
                connectors.push((name, entry.path()));
            }
        }

        connectors.sort_by(|(a, _), (b, _)| {
            (!a.contains("-eDP-"), a.as_str()).cmp(&(!b.contains("-eDP-"), b.as_str()))
        });

        Ok(connectors.into_iter().next().map(|(name, path)| {
            tracing::debug!(connector = %name, "using DRM connector");
            path
        }))
    }

    fn capabilities(&self) -> Result<Option<EdidCapabilities>, BoxError> {
        let Some(connector) = self.connected_connector()? else {
            return Ok(None);
        };

        let edid = fs::read(connector.join("edid"))?;
        if edid.is_empty() {
            tracing::debug!(connector = %connector.display(), "connector has no EDID");
            return Ok(None);
        }

        Ok(Some(parse_edid(&edid)?))
    }
}

fn is_connected(connector: &Path) -> bool {
    fs::read_to_string(connector.join("status"))
        .map(|status| status.trim() == "connected")
        .unwrap_or(false)
}

impl DisplayProvider for DrmDisplayProvider {
    fn name(&self) -> &str {
        "drm"
    }

    fn platform_version(&self) -> PlatformVersion {
        match fs::read_to_string(&self.release_path) {
            Ok(release) => PlatformVersion::from_release(&release).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(path = %self.release_path.display(), error = %e, "cannot read kernel release");
                PlatformVersion::ZERO
            }
        }
    }

    fn is_hdr(&self) -> Result<Option<bool>, BoxError> {
        Ok(self.capabilities()?.map(|c| c.is_hdr()))
    }

    fn hdr_types(&self) -> Result<Option<Vec<i32>>, BoxError> {
        Ok(self.capabilities()?.map(|c| c.hdr_types()))
    }

    fn is_wide_color_gamut(&self) -> Result<Option<bool>, BoxError> {
        Ok(self.capabilities()?.map(|c| c.is_wide_color_gamut()))
    }
}
