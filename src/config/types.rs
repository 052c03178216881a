use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capability::HdrFormat;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
    /// Directory that `asset://` names are resolved under
    #[serde(default = "default_assets_root")]
    pub root: PathBuf,

    /// Where temporary asset copies and downloads go (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("./assets")
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: default_assets_root(),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Connect timeout, and the longest wait for the next body chunk
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Size of each ranged read against servers that honor `Range`
    #[serde(default = "default_range_block_bytes")]
    pub range_block_bytes: u64,

    /// Transfers larger than this are aborted
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_range_block_bytes() -> u64 {
    1024 * 1024
}
fn default_user_agent() -> String {
    format!("hdrscope/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_download_bytes() -> u64 {
    4 * 1024 * 1024 * 1024
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            range_block_bytes: default_range_block_bytes(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_drm_root")]
    pub drm_root: PathBuf,

    /// Answer used when the DRM tree is missing
    #[serde(default)]
    pub fallback: DisplayFallback,

    /// Per-feature minimum platform versions, replacing the provider's own
    #[serde(default)]
    pub minimums: Option<MinimumsConfig>,
}

fn default_drm_root() -> PathBuf {
    PathBuf::from("/sys/class/drm")
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            drm_root: default_drm_root(),
            fallback: DisplayFallback::default(),
            minimums: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayFallback {
    /// Report no display
    #[default]
    None,
    /// Report fixed capabilities
    Static {
        #[serde(default)]
        hdr: bool,
        #[serde(default)]
        wide_color_gamut: bool,
        #[serde(default)]
        hdr_types: Vec<HdrFormat>,
    },
}

/// Version strings in `major` or `major.minor` form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MinimumsConfig {
    #[serde(default = "default_version")]
    pub hdr: String,

    #[serde(default = "default_version")]
    pub hdr_formats: String,

    #[serde(default = "default_version")]
    pub wide_color_gamut: String,

    #[serde(default = "default_version")]
    pub hdr10_plus: String,
}

fn default_version() -> String {
    "0".to_string()
}
