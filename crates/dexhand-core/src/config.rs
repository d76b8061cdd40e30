//! Configuration loading and typed config structures for the simulator.
//!
//! The canonical configuration lives in `dexhand.yaml` at the project
//! root. This module defines strongly-typed structs mirroring the YAML
//! structure and a loader that reads and validates the file. Every
//! field has a default, so a missing file yields a fully usable
//! configuration; an unparseable file is fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::model::{ModelPaths, ModelSourceKind};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Model source selection and file locations.
    #[serde(default)]
    pub model: ModelSection,

    /// Simulation timing parameters.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Configuration file locations.
    #[serde(default)]
    pub paths: PathsSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl SimConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `DEXHAND_PORT` environment variable overrides
    /// `server.port`, so deployments can remap the port without
    /// touching the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.server.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.server.apply_env_overrides();
        Ok(config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSection {
    /// Override server fields with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("DEXHAND_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            self.port = port;
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Model source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelSection {
    /// Which source the simulation loads at startup.
    #[serde(default)]
    pub source: ModelSourceKind,

    /// Path to the build-from-source template.
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,

    /// Path to the prebuilt full document.
    #[serde(default = "default_precompiled_path")]
    pub precompiled_path: PathBuf,

    /// Path to the bundled sample document.
    #[serde(default = "default_sample_path")]
    pub sample_path: PathBuf,
}

impl ModelSection {
    /// The three source locations as a [`ModelPaths`] bundle.
    pub fn paths(&self) -> ModelPaths {
        ModelPaths {
            template: self.template_path.clone(),
            precompiled: self.precompiled_path.clone(),
            sample: self.sample_path.clone(),
        }
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            source: ModelSourceKind::default(),
            template_path: default_template_path(),
            precompiled_path: default_precompiled_path(),
            sample_path: default_sample_path(),
        }
    }
}

/// Simulation timing configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSection {
    /// Physics timestep in seconds.
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// State broadcast period in milliseconds.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Motor force used when a command omits one.
    #[serde(default = "default_max_force")]
    pub default_max_force: f64,
}

impl SimulationSection {
    /// The broadcast period as a [`Duration`], floored at 1ms.
    pub const fn broadcast_interval(&self) -> Duration {
        let ms = if self.broadcast_interval_ms == 0 {
            1
        } else {
            self.broadcast_interval_ms
        };
        Duration::from_millis(ms)
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            default_max_force: default_max_force(),
        }
    }
}

/// Configuration file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsSection {
    /// The joint-limits YAML file.
    #[serde(default = "default_limits_file")]
    pub limits_file: PathBuf,

    /// The directory of motion definition YAML files.
    #[serde(default = "default_motions_dir")]
    pub motions_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            limits_file: default_limits_file(),
            motions_dir: default_motions_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

fn default_template_path() -> PathBuf {
    PathBuf::from("models/hand.urdf.j2")
}

fn default_precompiled_path() -> PathBuf {
    PathBuf::from("models/hand_precompiled.urdf")
}

fn default_sample_path() -> PathBuf {
    PathBuf::from("models/hand_sample.urdf")
}

const fn default_timestep() -> f64 {
    1.0 / 240.0
}

const fn default_broadcast_interval_ms() -> u64 {
    50
}

const fn default_max_force() -> f64 {
    5.0
}

fn default_limits_file() -> PathBuf {
    PathBuf::from("config/joint_limits.yaml")
}

fn default_motions_dir() -> PathBuf {
    PathBuf::from("config/motions")
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.simulation.broadcast_interval_ms, 50);
        assert_eq!(config.simulation.timestep, 1.0 / 240.0);
        assert_eq!(config.model.source, ModelSourceKind::Sample);
        assert_eq!(
            config.paths.limits_file,
            PathBuf::from("config/joint_limits.yaml")
        );
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000

model:
  source: auto
  template_path: "custom/hand.urdf.j2"
  precompiled_path: "custom/hand.urdf"
  sample_path: "custom/sample.urdf"

simulation:
  timestep: 0.01
  broadcast_interval_ms: 100
  default_max_force: 2.5

paths:
  limits_file: "custom/limits.yaml"
  motions_dir: "custom/motions"

logging:
  level: "debug"
"#;
        let config = SimConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.model.source, ModelSourceKind::Auto);
        assert_eq!(config.simulation.broadcast_interval_ms, 100);
        assert_eq!(config.simulation.default_max_force, 2.5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimConfig::parse("server:\n  port: 7777\n").unwrap();
        assert_eq!(config.server.port, 7777);
        // Everything else uses defaults.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.simulation.broadcast_interval_ms, 50);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn broadcast_interval_floors_at_one_ms() {
        let section = SimulationSection {
            timestep: default_timestep(),
            broadcast_interval_ms: 0,
            default_max_force: default_max_force(),
        };
        assert_eq!(section.broadcast_interval(), Duration::from_millis(1));
    }

    #[test]
    fn model_paths_bundle_matches_section() {
        let section = ModelSection::default();
        let paths = section.paths();
        assert_eq!(paths.template, section.template_path);
        assert_eq!(paths.precompiled, section.precompiled_path);
        assert_eq!(paths.sample, section.sample_path);
    }
}
