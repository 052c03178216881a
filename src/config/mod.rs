mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::capability::{FeatureMinimums, PlatformVersion};

/// Default config locations, in search order
pub const DEFAULT_PATHS: [&str; 3] = [
    "./hdrscope.toml",
    "~/.config/hdrscope/config.toml",
    "/etc/hdrscope/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

impl MinimumsConfig {
    /// Parse every version string.
    pub fn to_minimums(&self) -> Result<FeatureMinimums> {
        let parse = |field: &str, value: &str| -> Result<PlatformVersion> {
            value
                .parse::<PlatformVersion>()
                .map_err(|e| anyhow::anyhow!("display.minimums.{}: {}", field, e))
        };

        Ok(FeatureMinimums {
            hdr: parse("hdr", &self.hdr)?,
            hdr_formats: parse("hdr_formats", &self.hdr_formats)?,
            wide_color_gamut: parse("wide_color_gamut", &self.wide_color_gamut)?,
            hdr10_plus: parse("hdr10_plus", &self.hdr10_plus)?,
        })
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs cannot be 0");
    }

    if config.remote.range_block_bytes == 0 {
        anyhow::bail!("remote.range_block_bytes cannot be 0");
    }

    if config.remote.max_download_bytes == 0 {
        anyhow::bail!("remote.max_download_bytes cannot be 0");
    }

    if let Some(minimums) = &config.display.minimums {
        minimums.to_minimums()?;
    }

    if !config.assets.root.exists() {
        tracing::warn!("Asset root does not exist: {:?}", config.assets.root);
    }

    if let Some(dir) = &config.assets.temp_dir {
        if !dir.is_dir() {
            anyhow::bail!("assets.temp_dir is not a directory: {:?}", dir);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::HdrFormat;
    use serial_test::serial;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.max_download_bytes, 4 * 1024 * 1024 * 1024);
        assert_eq!(config.remote.range_block_bytes, 1024 * 1024);
        assert!(config.remote.user_agent.starts_with("hdrscope/"));
        assert_eq!(config.assets.root, Path::new("./assets"));
        assert_eq!(config.display.drm_root, Path::new("/sys/class/drm"));
        assert_eq!(config.display.fallback, DisplayFallback::None);
        assert!(config.display.minimums.is_none());
    }

    #[test]
    fn test_full_config() {
        let temp = tempfile::tempdir().unwrap();
        let file = write_config(&format!(
            r#"
[assets]
root = "/srv/app/assets"
temp_dir = "{}"

[remote]
timeout_secs = 5
user_agent = "player/2.0"
max_download_bytes = 1048576

[display]
drm_root = "/tmp/drm"

[display.fallback]
kind = "static"
hdr = true
hdr_types = ["hdr10", "hlg"]

[display.minimums]
hdr = "26"
hdr10_plus = "29.1"
"#,
            temp.path().display()
        ));

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.remote.timeout_secs, 5);
        assert_eq!(config.remote.user_agent, "player/2.0");
        assert_eq!(config.assets.temp_dir.as_deref(), Some(temp.path()));
        assert_eq!(
            config.display.fallback,
            DisplayFallback::Static {
                hdr: true,
                wide_color_gamut: false,
                hdr_types: vec![HdrFormat::Hdr10, HdrFormat::Hlg],
            }
        );

        let minimums = config.display.minimums.unwrap().to_minimums().unwrap();
        assert_eq!(minimums.hdr, PlatformVersion::new(26, 0));
        assert_eq!(minimums.hdr_formats, PlatformVersion::ZERO);
        assert_eq!(minimums.hdr10_plus, PlatformVersion::new(29, 1));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config("[remote]\ntimeout_secs = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_zero_download_limit_rejected() {
        let file = write_config("[remote]\nmax_download_bytes = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_zero_range_block_rejected() {
        let file = write_config("[remote]\nrange_block_bytes = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("range_block_bytes"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let file = write_config("[display.minimums]\nhdr = \"oreo\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("display.minimums.hdr"));
    }

    #[test]
    fn test_unknown_hdr_type_rejected() {
        let file = write_config("[display.fallback]\nkind = \"static\"\nhdr_types = [\"hdr12\"]\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/hdrscope.toml")).is_err());
    }

    #[test]
    #[serial]
    fn test_default_search_finds_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hdrscope.toml"), "[remote]\ntimeout_secs = 7\n").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = load_config_or_default(None);
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(config.unwrap().remote.timeout_secs, 7);
    }
}
