use std::path::{Path, PathBuf};
use std::time::Duration;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::StrokeStyle;

/// Env var naming a JSON config file
pub const CONFIG_ENV: &str = "STORYPAINT_CONFIG";
/// Env var overriding the generation endpoint
pub const SERVER_URL_ENV: &str = "STORYPAINT_SERVER_URL";

pub const DEFAULT_SERVER_URL: &str = "https://storypaint-server.onrender.com/generar_imagen";

/// Remote generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old files
pub struct GenerationConfig {
    pub server_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Deadline for the whole call, enforced by the pipeline
    pub call_timeout_secs: u64,
    /// Side of the square the snapshot is scaled to before upload
    pub upload_size: u32,
    /// Base64 length a returned image must exceed to be kept
    pub min_image_len: usize,
    /// Send `X-Upload-Consent: true` with every request
    pub upload_consent: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            connect_timeout_secs: 30,
            read_timeout_secs: 120,
            call_timeout_secs: 120,
            upload_size: 512,
            min_image_len: 200,
            upload_consent: true,
        }
    }
}

impl GenerationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Drawing surface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub stroke: StrokeStyle,
    pub background: Color32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            stroke: StrokeStyle::default(),
            background: Color32::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub canvas: CanvasConfig,
    /// Where the session file, stories and saved images live
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            canvas: CanvasConfig::default(),
            data_dir: PathBuf::from("storypaint_data"),
        }
    }
}

impl AppConfig {
    /// Parse a config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Defaults, then the file named by [`CONFIG_ENV`], then [`SERVER_URL_ENV`]
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.generation.server_url = url.trim().to_owned();
            }
        }

        Ok(config)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn stories_dir(&self) -> PathBuf {
        self.data_dir.join("stories")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}
