//! Model document rendering with source selection and fallback.
//!
//! The hand model can come from three sources:
//!
//! - **sample** -- a small bundled document, always usable for demos;
//! - **precompiled** -- the full prebuilt document checked in next to
//!   the template;
//! - **auto** -- render the build-from-source template (a minijinja
//!   template parameterized by the joint-limit table), falling back to
//!   the precompiled document on *any* failure.
//!
//! If `auto` can satisfy neither path, the result is a configuration
//! error and the process refuses to start.

use std::path::{Path, PathBuf};

use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::limits::JointLimits;

/// Which model source a render request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSourceKind {
    /// Build from the template, fall back to the precompiled file.
    Auto,
    /// The bundled sample document.
    #[default]
    Sample,
    /// The prebuilt full document.
    Precompiled,
}

/// Filesystem locations of the three model sources.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// The build-from-source template.
    pub template: PathBuf,
    /// The prebuilt full document.
    pub precompiled: PathBuf,
    /// The bundled sample document.
    pub sample: PathBuf,
}

/// Errors raised while rendering the model document.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Neither the template nor the precompiled fallback could be
    /// used. Fatal at startup.
    #[error("no model source available")]
    SourceUnavailable,

    /// A directly requested source file could not be read.
    #[error("model source {path} unreadable: {source}")]
    Unreadable {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The template failed to parse or render.
    #[error("model template error: {source}")]
    Template {
        /// The underlying template error.
        #[from]
        source: minijinja::Error,
    },
}

/// Render the model document for the requested source kind.
///
/// # Errors
///
/// `Sample` and `Precompiled` fail with [`ModelError::Unreadable`] if
/// their file is missing. `Auto` only fails with
/// [`ModelError::SourceUnavailable`], after both the template build
/// and the precompiled fallback have failed.
pub fn render_model(
    kind: ModelSourceKind,
    paths: &ModelPaths,
    limits: &JointLimits,
) -> Result<String, ModelError> {
    match kind {
        ModelSourceKind::Sample => read_source(&paths.sample),
        ModelSourceKind::Precompiled => read_source(&paths.precompiled),
        ModelSourceKind::Auto => match render_template(&paths.template, limits) {
            Ok(document) => Ok(document),
            Err(error) => {
                warn!(error = %error, "template build failed, falling back to precompiled model");
                read_source(&paths.precompiled).map_err(|_unreadable| ModelError::SourceUnavailable)
            }
        },
    }
}

/// Expand the build-from-source template against the limit table.
fn render_template(path: &Path, limits: &JointLimits) -> Result<String, ModelError> {
    let source = read_source(path)?;
    let mut env = Environment::new();
    env.add_template("model", &source)?;
    let template = env.get_template("model")?;
    let document = template.render(context! { limits => limits })?;
    Ok(document)
}

fn read_source(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| ModelError::Unreadable {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use crate::limits::JointLimit;

    use super::*;

    const TEMPLATE: &str = r#"<robot name="hand">
{%- for name, limit in limits|items %}
  <joint name="{{ name }}" type="revolute">
    <limit lower="{{ limit.lower }}" upper="{{ limit.upper }}"/>
  </joint>
{%- endfor %}
</robot>
"#;

    fn sample_limits() -> JointLimits {
        let mut limits = BTreeMap::new();
        limits.insert(
            "index_mcp".to_owned(),
            JointLimit {
                lower: 0.0,
                upper: 1.57,
                default: 0.0,
            },
        );
        limits
    }

    fn temp_paths(
        template: Option<&str>,
        precompiled: Option<&str>,
        sample: Option<&str>,
    ) -> ModelPaths {
        let dir = std::env::temp_dir().join(format!("dexhand-model-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = ModelPaths {
            template: dir.join("hand.urdf.j2"),
            precompiled: dir.join("hand_precompiled.urdf"),
            sample: dir.join("hand_sample.urdf"),
        };
        if let Some(text) = template {
            std::fs::write(&paths.template, text).unwrap();
        }
        if let Some(text) = precompiled {
            std::fs::write(&paths.precompiled, text).unwrap();
        }
        if let Some(text) = sample {
            std::fs::write(&paths.sample, text).unwrap();
        }
        paths
    }

    #[test]
    fn sample_reads_the_sample_file() {
        let paths = temp_paths(None, None, Some("<robot name=\"sample\"/>"));
        let document = render_model(ModelSourceKind::Sample, &paths, &sample_limits()).unwrap();
        assert!(document.contains("sample"));
    }

    #[test]
    fn missing_sample_is_unreadable() {
        let paths = temp_paths(None, None, None);
        let result = render_model(ModelSourceKind::Sample, &paths, &sample_limits());
        assert!(matches!(result, Err(ModelError::Unreadable { .. })));
    }

    #[test]
    fn auto_builds_from_template() {
        let paths = temp_paths(Some(TEMPLATE), Some("<robot name=\"prebuilt\"/>"), None);
        let document = render_model(ModelSourceKind::Auto, &paths, &sample_limits()).unwrap();
        assert!(document.contains("index_mcp"));
        assert!(document.contains("upper=\"1.57\""));
    }

    #[test]
    fn auto_falls_back_to_precompiled_on_broken_template() {
        let paths = temp_paths(
            Some("{% broken template"),
            Some("<robot name=\"prebuilt\"/>"),
            None,
        );
        let document = render_model(ModelSourceKind::Auto, &paths, &sample_limits()).unwrap();
        assert!(document.contains("prebuilt"));
    }

    #[test]
    fn auto_falls_back_when_template_is_missing() {
        let paths = temp_paths(None, Some("<robot name=\"prebuilt\"/>"), None);
        let document = render_model(ModelSourceKind::Auto, &paths, &sample_limits()).unwrap();
        assert!(document.contains("prebuilt"));
    }

    #[test]
    fn auto_with_no_source_at_all_is_a_configuration_error() {
        let paths = temp_paths(None, None, None);
        let result = render_model(ModelSourceKind::Auto, &paths, &sample_limits());
        assert!(matches!(result, Err(ModelError::SourceUnavailable)));
    }

    #[test]
    fn source_kind_parses_lowercase() {
        let kind: ModelSourceKind = serde_yml::from_str("auto").unwrap();
        assert_eq!(kind, ModelSourceKind::Auto);
        let kind: ModelSourceKind = serde_yml::from_str("precompiled").unwrap();
        assert_eq!(kind, ModelSourceKind::Precompiled);
    }
}
