//! Configuration loading and assessor factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use oralexam_core::config::ScoringConfig;
use oralexam_core::traits::{NullAssessor, QualitativeAssessor};

use crate::mock::MockAssessor;
use crate::openai::OpenAiAssessor;

/// Environment variable that supplies or overrides the OpenAI API key.
pub const OPENAI_KEY_ENV: &str = "ORALEXAM_OPENAI_KEY";

/// Which qualitative assessor to call.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssessorConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    /// Rates every dimension with the same score.
    Mock {
        #[serde(default = "default_mock_score")]
        score: f64,
    },
}

impl std::fmt::Debug for AssessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssessorConfig::OpenAI {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            AssessorConfig::Mock { score } => {
                f.debug_struct("Mock").field("score", score).finish()
            }
        }
    }
}

fn default_mock_score() -> f64 {
    oralexam_core::model::DEFAULT_QUALITATIVE_SCORE
}

/// Top-level oralexam configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OralExamConfig {
    /// Qualitative assessor. Without one, attempts are scored with neutral
    /// qualitative scores.
    #[serde(default)]
    pub assessor: Option<AssessorConfig>,
    /// Scorer and mapper calibration.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Max attempts scored concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./oralexam-results")
}

impl Default for OralExamConfig {
    fn default() -> Self {
        Self {
            assessor: None,
            scoring: ScoringConfig::default(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        // Substituted values are never rescanned.
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_assessor_config(config: &AssessorConfig) -> AssessorConfig {
    match config {
        AssessorConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => AssessorConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.as_ref().map(|m| resolve_env_vars(m)),
        },
        AssessorConfig::Mock { score } => AssessorConfig::Mock { score: *score },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `oralexam.toml` in the current directory
/// 2. `~/.config/oralexam/config.toml`
///
/// `ORALEXAM_OPENAI_KEY` sets the OpenAI key, adding an OpenAI assessor if
/// none is configured.
pub fn load_config() -> Result<OralExamConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<OralExamConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("oralexam.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => OralExamConfig::default(),
    };

    Ok(apply_env_overrides(config, std::env::var(OPENAI_KEY_ENV).ok()))
}

/// Parse and validate a TOML config string.
pub fn parse_config_str(content: &str) -> Result<OralExamConfig> {
    let config: OralExamConfig = toml::from_str(content)?;
    config
        .scoring
        .validate()
        .context("invalid scoring configuration")?;
    Ok(config)
}

fn apply_env_overrides(mut config: OralExamConfig, openai_key: Option<String>) -> OralExamConfig {
    if let Some(key) = openai_key {
        match config.assessor {
            Some(AssessorConfig::OpenAI {
                ref mut api_key, ..
            }) => *api_key = key,
            Some(AssessorConfig::Mock { .. }) => {
                tracing::debug!("{OPENAI_KEY_ENV} ignored: config selects the mock assessor");
            }
            None => {
                config.assessor = Some(AssessorConfig::OpenAI {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
        }
    }

    config.assessor = config.assessor.as_ref().map(resolve_assessor_config);
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("oralexam"))
}

/// Create the configured assessor. `None` yields an assessor that never
/// supplies scores.
pub fn create_assessor(config: Option<&AssessorConfig>) -> Result<Arc<dyn QualitativeAssessor>> {
    match config {
        None => Ok(Arc::new(NullAssessor)),
        Some(AssessorConfig::OpenAI {
            api_key,
            base_url,
            model,
        }) => {
            if api_key.is_empty() {
                anyhow::bail!("OpenAI assessor configured without an API key (set {OPENAI_KEY_ENV})");
            }
            Ok(Arc::new(OpenAiAssessor::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )?))
        }
        Some(AssessorConfig::Mock { score }) => Ok(Arc::new(MockAssessor::uniform(*score))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ORALEXAM_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ORALEXAM_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ORALEXAM_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars here"), "no vars here");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_ORALEXAM_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_expand_substituted_values() {
        std::env::set_var("_ORALEXAM_TEST_SELF", "${_ORALEXAM_TEST_SELF}");
        assert_eq!(
            resolve_env_vars("a-${_ORALEXAM_TEST_SELF}-b"),
            "a-${_ORALEXAM_TEST_SELF}-b"
        );
        std::env::remove_var("_ORALEXAM_TEST_SELF");
    }

    #[test]
    fn default_config() {
        let config = OralExamConfig::default();
        assert!(config.assessor.is_none());
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.scoring.mapping.level_thresholds.len(), 8);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
parallelism = 2
output_dir = "reports"

[assessor]
type = "openai"
api_key = "sk-test"
model = "gpt-4o-mini"

[scoring.scorer]
silence_gap_seconds = 4.0

[scoring.mapping.feedback]
max_points = 2
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.scoring.scorer.silence_gap_seconds, 4.0);
        assert_eq!(config.scoring.mapping.feedback.max_points, 2);
        assert!(matches!(
            config.assessor,
            Some(AssessorConfig::OpenAI { ref model, .. }) if model.as_deref() == Some("gpt-4o-mini")
        ));
    }

    #[test]
    fn invalid_scoring_config_is_rejected() {
        let toml_str = r#"
[scoring.mapping]
level_thresholds = [1.0, 2.0]
"#;
        let err = parse_config_str(toml_str).unwrap_err();
        assert!(format!("{err:#}").contains("level thresholds"));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = AssessorConfig::OpenAI {
            api_key: "sk-secret".into(),
            base_url: None,
            model: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn env_key_adds_openai_assessor() {
        let config = apply_env_overrides(OralExamConfig::default(), Some("sk-env".into()));
        assert!(matches!(
            config.assessor,
            Some(AssessorConfig::OpenAI { ref api_key, .. }) if api_key == "sk-env"
        ));
    }

    #[test]
    fn env_key_leaves_mock_alone() {
        let config = OralExamConfig {
            assessor: Some(AssessorConfig::Mock { score: 6.0 }),
            ..Default::default()
        };
        let config = apply_env_overrides(config, Some("sk-env".into()));
        assert!(matches!(config.assessor, Some(AssessorConfig::Mock { .. })));
    }

    #[test]
    fn api_key_placeholders_are_expanded() {
        std::env::set_var("_ORALEXAM_TEST_KEY", "sk-from-env");
        let config = OralExamConfig {
            assessor: Some(AssessorConfig::OpenAI {
                api_key: "${_ORALEXAM_TEST_KEY}".into(),
                base_url: None,
                model: None,
            }),
            ..Default::default()
        };
        let config = apply_env_overrides(config, None);
        assert!(matches!(
            config.assessor,
            Some(AssessorConfig::OpenAI { ref api_key, .. }) if api_key == "sk-from-env"
        ));
        std::env::remove_var("_ORALEXAM_TEST_KEY");
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oralexam.toml");
        std::fs::write(&path, "[assessor]\ntype = \"mock\"\nscore = 8.0\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert!(matches!(config.assessor, Some(AssessorConfig::Mock { .. })));
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/oralexam.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn create_assessors() {
        assert_eq!(create_assessor(None).unwrap().name(), "none");
        assert_eq!(
            create_assessor(Some(&AssessorConfig::Mock { score: 5.0 }))
                .unwrap()
                .name(),
            "mock"
        );
        let openai = AssessorConfig::OpenAI {
            api_key: "sk-test".into(),
            base_url: Some("http://localhost:1".into()),
            model: None,
        };
        assert_eq!(create_assessor(Some(&openai)).unwrap().name(), "openai");
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let openai = AssessorConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            model: None,
        };
        assert!(create_assessor(Some(&openai)).is_err());
    }
}
