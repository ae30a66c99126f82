//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::recording::WEBM_MIME_TYPE;

/// File name offered by the download control
pub const DEFAULT_DOWNLOAD_NAME: &str = "recorded-video.webm";

/// Widget configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the download control saves into
    pub download_dir: PathBuf,

    /// File name for saved recordings
    pub download_file_name: String,

    /// MIME type of finished recordings
    pub mime_type: String,

    /// Interval between chunks from the synthetic recorder
    pub timeslice: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let download_dir = PathBuf::from(&home).join("Downloads");

        Ok(Self::with_download_dir(&download_dir))
    }

    /// Defaults, saving downloads into `download_dir`
    pub fn with_download_dir(download_dir: &Path) -> Self {
        Self {
            download_dir: download_dir.to_owned(),
            download_file_name: DEFAULT_DOWNLOAD_NAME.to_string(),
            mime_type: WEBM_MIME_TYPE.to_string(),
            timeslice: Duration::from_secs(1),
        }
    }

    /// Ensure download directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.download_dir).with_context(|| {
            format!(
                "failed to create download directory {}",
                self.download_dir.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.download_dir.ends_with("Downloads"));
        assert_eq!(config.download_file_name, "recorded-video.webm");
        assert_eq!(config.mime_type, "video/webm");
    }

    #[test]
    fn test_ensure_dirs_creates_download_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_download_dir(&tmp.path().join("nested").join("clips"));

        config.ensure_dirs().unwrap();
        assert!(config.download_dir.is_dir());
    }
}
