use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::plan::DEFAULT_MAX_NAME_LENGTH;
use crate::quality::{DEFAULT_MP3_BITRATE, MP3_BITRATES};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External programs
    pub tools: ToolsConfig,

    /// Download behaviour
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable
    pub yt_dlp: String,

    /// ffmpeg executable
    pub ffmpeg: String,

    /// Hold a wake lock while downloading
    pub wake_lock: bool,

    pub wake_lock_command: String,
    pub wake_unlock_command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Download root; discovered automatically when unset
    pub directory: Option<PathBuf>,

    /// yt-dlp `--retries`
    pub retries: u32,

    /// yt-dlp `--fragment-retries`
    pub fragment_retries: u32,

    /// MP3 bitrate used when none is given on the command line
    pub mp3_bitrate: u32,

    /// Re-encode around cut points for frame-accurate cuts (slow on phones)
    pub precise_cuts: bool,

    /// Maximum length of generated file names, in characters
    pub max_name_length: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            wake_lock: true,
            wake_lock_command: "termux-wake-lock".to_string(),
            wake_unlock_command: "termux-wake-unlock".to_string(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: None,
            retries: 10,
            fragment_retries: 20,
            mp3_bitrate: DEFAULT_MP3_BITRATE,
            precise_cuts: false,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        match Self::read_existing()? {
            Some(config) => Ok(config),
            None => {
                let config = Self::default();
                if let Err(e) = config.save().await {
                    tracing::warn!("Could not write default config: {:#}", e);
                }
                Ok(config)
            }
        }
    }

    /// Like [`Config::load`] but never writes a default file
    pub fn read() -> Result<Self> {
        Ok(Self::read_existing()?.unwrap_or_default())
    }

    fn read_existing() -> Result<Option<Self>> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs_err::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::from_yaml(&content)?;
        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(Some(config))
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubesplit").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.tools.yt_dlp.trim().is_empty() {
            anyhow::bail!("tools.yt_dlp must not be empty");
        }
        if self.tools.ffmpeg.trim().is_empty() {
            anyhow::bail!("tools.ffmpeg must not be empty");
        }
        if !MP3_BITRATES.contains(&self.download.mp3_bitrate) {
            anyhow::bail!(
                "download.mp3_bitrate must be one of {:?}, got {}",
                MP3_BITRATES,
                self.download.mp3_bitrate
            );
        }
        if self.download.max_name_length < 16 {
            anyhow::bail!("download.max_name_length must be at least 16");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp);
        println!("  ffmpeg: {}", self.tools.ffmpeg);
        println!(
            "  Wake lock: {}",
            if self.tools.wake_lock {
                self.tools.wake_lock_command.as_str()
            } else {
                "disabled"
            }
        );
        match &self.download.directory {
            Some(dir) => println!("  Download directory: {}", dir.display()),
            None => println!("  Download directory: auto-detect"),
        }
        println!("  Retries: {} (fragments: {})", self.download.retries, self.download.fragment_retries);
        println!("  MP3 bitrate: {} kbps", self.download.mp3_bitrate);
        println!("  Precise cuts: {}", self.download.precise_cuts);
    }
}
