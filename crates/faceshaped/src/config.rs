use faceshape_core::detector::DEFAULT_CONFIDENCE_THRESHOLD;
use faceshape_core::mesh::{MeshOptions, DEFAULT_PRESENCE_THRESHOLD};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Service configuration.
///
/// Built from defaults, then an optional TOML file named by `FACESHAPE_CONFIG`,
/// then `FACESHAPE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:10000).
    pub bind: SocketAddr,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Minimum SCRFD confidence for a face box.
    pub detection_threshold: f32,
    /// Minimum face-presence probability reported by the mesh model.
    pub presence_threshold: f32,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 10000)),
            model_dir: PathBuf::from("models"),
            max_upload_bytes: 16 * 1024 * 1024,
            detection_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            intra_threads: 2,
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_sources<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("FACESHAPE_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&text)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "FACESHAPE_BIND", &mut self.bind);
        if let Some(dir) = lookup("FACESHAPE_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        override_parsed(&lookup, "FACESHAPE_MAX_UPLOAD_BYTES", &mut self.max_upload_bytes);
        override_parsed(&lookup, "FACESHAPE_DETECTION_THRESHOLD", &mut self.detection_threshold);
        override_parsed(&lookup, "FACESHAPE_PRESENCE_THRESHOLD", &mut self.presence_threshold);
        override_parsed(&lookup, "FACESHAPE_INTRA_THREADS", &mut self.intra_threads);
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(faceshape_core::DETECTOR_MODEL_FILE)
    }

    /// Path to the face-landmark model.
    pub fn mesh_model_path(&self) -> PathBuf {
        self.model_dir.join(faceshape_core::MESH_MODEL_FILE)
    }

    pub fn mesh_options(&self) -> MeshOptions {
        MeshOptions {
            detection_threshold: self.detection_threshold,
            presence_threshold: self.presence_threshold,
            intra_threads: self.intra_threads,
        }
    }
}

/// Replace `slot` with the parsed value of `key`; unparsable values are logged and ignored.
fn override_parsed<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable environment value"),
    }
}
