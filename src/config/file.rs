//! Configuration file support

use crate::color::ColorMode;
use crate::config::{
    RenderArgs, RenderConfig, Resolution, DEFAULT_FRAME_RATE, DEFAULT_HEIGHT, DEFAULT_SAMPLE_RATE,
    DEFAULT_STRIP_WIDTH, DEFAULT_WIDTH,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Sample rate in Hz (offline: replaced by the file's own rate)
    pub sample_rate: u32,

    /// Frames per second
    pub frame_rate: u32,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Width of each color block in pixels
    pub strip_width: u32,

    /// Color mapping (hue, packed)
    pub color_mode: ColorMode,

    /// Capture queue capacity in blocks
    pub queue_blocks: usize,

    /// Frames per capture block requested from the device
    pub block_frames: u32,

    /// Video codec for the ffmpeg encoder
    pub video_codec: String,

    /// Audio codec for the ffmpeg encoder
    pub audio_codec: String,

    /// ffmpeg executable (empty = search PATH)
    #[serde(default)]
    pub ffmpeg_path: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = stderr)
    #[serde(default)]
    pub log_file: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_rate: DEFAULT_FRAME_RATE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            strip_width: DEFAULT_STRIP_WIDTH,
            color_mode: ColorMode::Hue,
            queue_blocks: 64,
            block_frames: 1024,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            ffmpeg_path: String::new(),
            log_level: "info".to_string(),
            log_file: String::new(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. Current directory: chromastrip.toml
    /// 2. User config dir: chromastrip/config.toml
    pub fn load_default() -> std::result::Result<Self, ConfigError> {
        for path in Self::default_locations() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("chromastrip.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("chromastrip").join("config.toml"));
        }
        paths
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                    path: parent.to_string_lossy().to_string(),
                    source: e,
                })?;
            }
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Overlay command-line options onto the file values
    pub fn apply_args(&mut self, args: &RenderArgs) {
        if let Some(v) = args.sample_rate {
            self.sample_rate = v;
        }
        if let Some(v) = args.fps {
            self.frame_rate = v;
        }
        if let Some(v) = args.width {
            self.width = v;
        }
        if let Some(v) = args.height {
            self.height = v;
        }
        if let Some(v) = args.strip_width {
            self.strip_width = v;
        }
        if let Some(v) = args.mode {
            self.color_mode = v;
        }
    }

    /// Convert to a validated RenderConfig
    pub fn to_render_config(&self) -> Result<RenderConfig> {
        RenderConfig::new(
            self.sample_rate,
            self.frame_rate,
            Resolution::new(self.width, self.height),
            self.strip_width,
            self.color_mode,
        )
    }

    /// ffmpeg executable, falling back to the one on PATH
    pub fn ffmpeg_program(&self) -> PathBuf {
        if self.ffmpeg_path.is_empty() {
            PathBuf::from("ffmpeg")
        } else {
            PathBuf::from(&self.ffmpeg_path)
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# chromastrip configuration

# Sample rate in Hz (default: 44100)
# Live: requested capture rate. Render: replaced by the audio file's rate.
sample_rate = 44100

# Frames per second (default: 60)
frame_rate = 60

# Output resolution in pixels (default: 1920x1080)
width = 1920
height = 1080

# Width of each color block in pixels (default: 2)
strip_width = 2

# Color mapping: "hue" (amplitude drives hue) or "packed" (24-bit sample bytes as RGB)
color_mode = "hue"

# Live capture queue capacity in blocks; the oldest block is dropped when full
queue_blocks = 64

# Frames per capture block requested from the input device
block_frames = 1024

# Codecs used by the ffmpeg encoder
video_codec = "libx264"
audio_codec = "aac"

# ffmpeg executable (empty = search PATH)
ffmpeg_path = ""

# Log level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Log file path (empty = stderr)
log_file = ""
"#
        .to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading/writing config file
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Error parsing TOML
    Parse {
        path: String,
        source: toml::de::Error,
    },
    /// Error serializing config
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to access config file '{}': {}", path, source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path, source)
            }
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Serialize(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses_to_defaults() {
        let parsed: FileConfig = toml::from_str(&FileConfig::sample_config()).unwrap();
        assert_eq!(parsed, FileConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: FileConfig = toml::from_str("strip_width = 4\ncolor_mode = \"packed\"").unwrap();
        assert_eq!(parsed.strip_width, 4);
        assert_eq!(parsed.color_mode, ColorMode::Packed);
        assert_eq!(parsed.frame_rate, 60);
        assert_eq!(parsed.width, 1920);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = FileConfig::default();
        config.frame_rate = 24;
        config.ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg".to_string();
        config.save(&path).unwrap();

        let loaded = FileConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.ffmpeg_program(), PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn test_args_override_file() {
        let mut config = FileConfig::default();
        config.width = 640;
        config.apply_args(&RenderArgs {
            fps: Some(25),
            strip_width: Some(5),
            ..Default::default()
        });

        let render = config.to_render_config().unwrap();
        assert_eq!(render.frame_rate(), 25);
        assert_eq!(render.resolution().width, 640);
        assert_eq!(render.max_blocks(), 128);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "frame_rate = \"fast\"").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
