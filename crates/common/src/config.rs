//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AutomixError, AutomixResult};

/// Environment variable overriding the ffmpeg binary.
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

/// Environment variable overriding the ffprobe binary.
pub const FFPROBE_PATH_ENV: &str = "FFPROBE_PATH";

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External audio engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Mix generation defaults.
    #[serde(default)]
    pub mix: MixDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find the external audio engine and how to encode with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// ffmpeg binary (name on PATH or absolute path).
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary. Derived from `ffmpeg_path` when unset.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// MP3 bitrate of the rendered mix.
    pub audio_bitrate_kbps: u32,
}

/// Mix generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixDefaults {
    /// Crossfade length used when the request does not specify one.
    pub crossfade_secs: u32,

    /// Fraction of the shortest track a crossfade may occupy.
    pub headroom_ratio: f64,

    /// Parent directory for request workspaces. System temp dir when unset.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,

    /// Prefix of every workspace directory name.
    pub workspace_prefix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "automix=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: None,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for MixDefaults {
    fn default() -> Self {
        Self {
            crossfade_secs: 5,
            headroom_ratio: 0.9,
            workspace_root: None,
            workspace_prefix: "automix-".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Resolved ffprobe binary.
    ///
    /// An explicit setting wins; otherwise ffprobe is expected next to
    /// ffmpeg (same directory, same extension), or on PATH when ffmpeg is
    /// a bare command name.
    pub fn resolved_ffprobe_path(&self) -> PathBuf {
        if let Some(path) = &self.ffprobe_path {
            return path.clone();
        }

        let mut name = std::ffi::OsString::from("ffprobe");
        if let Some(ext) = self.ffmpeg_path.extension() {
            name.push(".");
            name.push(ext);
        }

        match self.ffmpeg_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
            _ => PathBuf::from(name),
        }
    }
}

impl MixDefaults {
    /// Directory under which workspaces are created.
    pub fn resolved_workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&config_file_path());
        config.apply_env();
        config
    }

    /// Load config from a specific file, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Apply `FFMPEG_PATH` / `FFPROBE_PATH` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply engine overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(FFMPEG_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.engine.ffmpeg_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(FFPROBE_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.engine.ffprobe_path = Some(PathBuf::from(path));
        }
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> AutomixResult<()> {
        let ratio = self.mix.headroom_ratio;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(AutomixError::config(format!(
                "mix.headroom_ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.engine.audio_bitrate_kbps == 0 {
            return Err(AutomixError::config("engine.audio_bitrate_kbps must be > 0"));
        }
        if self.mix.workspace_prefix.contains(['/', '\\']) {
            return Err(AutomixError::config(
                "mix.workspace_prefix must not contain path separators",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("automix").join("config.json")
}
