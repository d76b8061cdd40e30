//! Motion sequence definitions and the on-disk motion library.
//!
//! A motion is a named, ordered list of keyframes -- `(time, joint
//! targets)` pairs -- with a tick frequency at which the player
//! advances. Definitions live as YAML files in the motions directory
//! and are loaded fresh for every play request; each playback run owns
//! an independent copy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while listing, loading, or validating motions.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    /// No motion with the requested name exists in the library.
    #[error("motion not found: {0}")]
    NotFound(String),

    /// The motions directory or a motion file could not be read.
    #[error("failed to read motion source: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A motion file is not valid YAML.
    #[error("failed to parse motion YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A motion definition or play request violates an invariant.
    #[error("invalid motion: {reason}")]
    Invalid {
        /// What is wrong with the definition or request.
        reason: String,
    },
}

impl From<serde_yml::Error> for MotionError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// One keyframe: when to fire and which targets to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Offset from sequence start in seconds (scaled at play time).
    pub time: f64,

    /// Target angle in radians per joint name.
    pub joints: BTreeMap<String, f64>,
}

/// A named, immutable keyframe sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSequence {
    /// Display name of the motion.
    pub name: String,

    /// Player tick frequency in Hz. Must be positive.
    pub frequency: f64,

    /// Keyframes ordered by non-decreasing time offset.
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl MotionSequence {
    /// Parse and validate a motion definition from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::Yaml`] on malformed YAML and
    /// [`MotionError::Invalid`] when the definition violates an
    /// invariant (non-positive frequency, negative or decreasing
    /// keyframe times).
    pub fn parse(yaml: &str) -> Result<Self, MotionError> {
        let sequence: Self = serde_yml::from_str(yaml)?;
        sequence.validate()?;
        Ok(sequence)
    }

    /// Load and validate a motion definition from a file.
    pub fn from_file(path: &Path) -> Result<Self, MotionError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Total play duration in seconds at the given scale.
    ///
    /// Zero for an empty sequence.
    pub fn total_time(&self, scale: f64) -> f64 {
        self.keyframes.last().map_or(0.0, |frame| frame.time * scale)
    }

    /// The player's sleep period between ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.frequency).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), MotionError> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(MotionError::Invalid {
                reason: format!("frequency must be positive, got {}", self.frequency),
            });
        }

        let mut previous = 0.0_f64;
        for frame in &self.keyframes {
            if !frame.time.is_finite() || frame.time < 0.0 {
                return Err(MotionError::Invalid {
                    reason: format!("keyframe time must be non-negative, got {}", frame.time),
                });
            }
            if frame.time < previous {
                return Err(MotionError::Invalid {
                    reason: format!(
                        "keyframe times must be non-decreasing ({} after {previous})",
                        frame.time
                    ),
                });
            }
            previous = frame.time;
        }
        Ok(())
    }
}

/// The directory of named motion definitions.
#[derive(Debug, Clone)]
pub struct MotionLibrary {
    dir: PathBuf,
}

impl MotionLibrary {
    /// Point the library at a motions directory.
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// List the available motion names (file stems), sorted.
    pub fn names(&self) -> Result<Vec<String>, MotionError> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(ToOwned::to_owned)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load one motion by name.
    ///
    /// The lookup is checked before anything is scheduled: an unknown
    /// name fails here with [`MotionError::NotFound`] and has no
    /// simulation side effect.
    pub fn load(&self, name: &str) -> Result<MotionSequence, MotionError> {
        if !is_valid_name(name) {
            return Err(MotionError::NotFound(name.to_owned()));
        }
        let path = self.dir.join(format!("{name}.yaml"));
        if !path.is_file() {
            return Err(MotionError::NotFound(name.to_owned()));
        }
        MotionSequence::from_file(&path)
    }
}

/// Motion names map directly onto file stems; anything that could
/// escape the motions directory is treated as absent.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
