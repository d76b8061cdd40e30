//! Joint-limit configuration.
//!
//! Limits live in a YAML file mapping each joint name to its lower and
//! upper bound plus a default (rest) angle. The table is served to
//! clients verbatim and feeds the build-from-source model template.
//! A missing or unparseable limits file is fatal at startup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Motion range and rest angle for one joint, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    /// Lower bound of the joint's travel.
    pub lower: f64,

    /// Upper bound of the joint's travel.
    pub upper: f64,

    /// Rest angle the joint starts at.
    #[serde(default)]
    pub default: f64,
}

/// Joint-limit table keyed by joint name.
pub type JointLimits = BTreeMap<String, JointLimit>;

/// Wrapper mirroring the YAML file's top-level `limits:` key.
#[derive(Debug, Deserialize)]
struct LimitsFile {
    #[serde(default)]
    limits: JointLimits,
}

/// Load the joint-limit table from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Yaml`] if the content is not valid YAML. Both are
/// fatal at startup.
pub fn load_limits(path: &Path) -> Result<JointLimits, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_limits(&contents)
}

/// Parse a joint-limit table from YAML text.
pub fn parse_limits(yaml: &str) -> Result<JointLimits, ConfigError> {
    let file: LimitsFile = serde_yml::from_str(yaml)?;
    Ok(file.limits)
}
