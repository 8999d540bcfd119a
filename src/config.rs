use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the `<integer>.<extension>` files to store.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Extension (without the dot) a file must carry to be ingested.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Report progress every this many files. 0 disables periodic reports.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Rows per transaction. 1 commits every insert, 0 commits once at the end.
    #[serde(default = "default_commit_every")]
    pub commit_every: usize,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("Images")
}

fn default_extension() -> String {
    "jpg".to_string()
}

fn default_progress_interval() -> usize {
    100
}

fn default_commit_every() -> usize {
    1
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            extension: default_extension(),
            progress_interval: default_progress_interval(),
            commit_every: default_commit_every(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    /// Query the terminal for sixel/kitty/iTerm2 support, falling back to halfblocks
    #[default]
    Auto,
    Halfblocks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub protocol: ImageProtocol,

    /// Longest edge, in pixels, an image is downscaled to before rendering
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}

fn default_max_size() -> u32 {
    2048
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            protocol: ImageProtocol::default(),
            max_size: default_max_size(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imgblob")
        .join("images.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            ingest: IngestConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `IMGBLOB_CONFIG` or the default location, writing a default
    /// file there if none exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imgblob")
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("IMGBLOB_CONFIG") {
            return PathBuf::from(path);
        }

        Self::config_dir().join("config.toml")
    }
}
