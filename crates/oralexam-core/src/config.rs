//! Scoring configuration.
//!
//! Every weight, cap, and threshold used by the scorer and the mapper is a
//! named field here so deployments can override them from the `[scoring]`
//! table of `oralexam.toml`. Defaults reproduce the reference calibration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of CLB level steps above the lowest level.
pub const LEVEL_STEPS: usize = 8;

/// Lowest CLB level the mapper emits.
pub const MIN_CLB_LEVEL: u8 = 4;

/// Configuration for both scoring stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scorer.validate()?;
        self.mapping.validate()
    }
}

/// Settings for the deterministic scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Gap between consecutive user turns, in seconds, above which the gap
    /// counts as a long silence.
    pub silence_gap_seconds: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            silence_gap_seconds: 3.0,
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gap = self.silence_gap_seconds;
        if !gap.is_finite() || gap < 0.0 {
            return Err(ConfigError::InvalidSilenceGap(gap));
        }
        Ok(())
    }
}

/// Weights and thresholds for the composite mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Speaking percentage is divided by this to land on the 0–10 scale.
    pub speaking_divisor: f64,
    /// Points per user turn.
    pub interaction_turn_weight: f64,
    /// Penalty per long silence.
    pub silence_penalty: f64,
    /// Section A: points per question.
    pub question_weight: f64,
    /// Section A: penalty multiplier on the repetition score.
    pub repetition_penalty_weight: f64,
    /// Section B: points per argument.
    pub argument_weight: f64,
    /// Each section's deterministic sum is divided by this.
    pub deterministic_divisor: f64,
    /// Share of the deterministic component in the composite.
    pub deterministic_weight: f64,
    /// Share of the qualitative component in the composite.
    pub qualitative_weight: f64,
    /// Exclusive upper bounds of CLB levels 4 through 11; anything at or
    /// above the last bound is level 12.
    pub level_thresholds: Vec<f64>,
    pub feedback: FeedbackConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            speaking_divisor: 10.0,
            interaction_turn_weight: 2.0,
            silence_penalty: 0.5,
            question_weight: 1.5,
            repetition_penalty_weight: 3.0,
            argument_weight: 1.2,
            deterministic_divisor: 3.0,
            deterministic_weight: 0.4,
            qualitative_weight: 0.6,
            level_thresholds: vec![2.0, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5],
            feedback: FeedbackConfig::default(),
        }
    }
}

impl MappingConfig {
    /// Check that the level table is usable and the weights are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_thresholds.len() != LEVEL_STEPS {
            return Err(ConfigError::ThresholdCount {
                expected: LEVEL_STEPS,
                found: self.level_thresholds.len(),
            });
        }
        if let Some((index, &value)) = self
            .level_thresholds
            .iter()
            .enumerate()
            .find(|(_, t)| !t.is_finite())
        {
            return Err(ConfigError::NonFiniteThreshold { index, value });
        }
        if let Some(index) = self
            .level_thresholds
            .windows(2)
            .position(|pair| pair[0] >= pair[1])
        {
            return Err(ConfigError::ThresholdOrder { index: index + 1 });
        }

        for (name, value) in [
            ("speaking_divisor", self.speaking_divisor),
            ("deterministic_divisor", self.deterministic_divisor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        for (name, value) in [
            ("deterministic_weight", self.deterministic_weight),
            ("qualitative_weight", self.qualitative_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        Ok(())
    }
}

/// Triggers for improvement points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Speaking percentage below this triggers the speaking-time point.
    pub min_speaking_percentage: f64,
    /// More long silences than this triggers the fluency point.
    pub max_long_silences: u32,
    /// Section A: fewer questions than this triggers the question point.
    pub min_questions: u32,
    /// Section A: repetition above this triggers the repetition point.
    pub max_repetition: f64,
    /// Section B: fewer arguments than this triggers the argument point.
    pub min_arguments: u32,
    /// Maximum number of points returned.
    pub max_points: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_speaking_percentage: 30.0,
            max_long_silences: 3,
            min_questions: 5,
            max_repetition: 0.5,
            min_arguments: 3,
            max_points: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scorer.silence_gap_seconds, 3.0);
        assert_eq!(config.mapping.feedback.max_points, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ScoringConfig = toml::from_str(
            r#"
[scorer]
silence_gap_seconds = 4.5

[mapping.feedback]
max_repetition = 0.7
"#,
        )
        .unwrap();
        assert_eq!(config.scorer.silence_gap_seconds, 4.5);
        assert_eq!(config.mapping.feedback.max_repetition, 0.7);
        assert_eq!(config.mapping.feedback.min_questions, 5);
        assert_eq!(config.mapping.qualitative_weight, 0.6);
    }

    #[test]
    fn rejects_unsorted_thresholds() {
        let config = MappingConfig {
            level_thresholds: vec![2.0, 3.5, 3.0, 5.5, 6.5, 7.5, 8.5, 9.5],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { index: 2 })
        );
    }

    #[test]
    fn rejects_nan_threshold() {
        let config = MappingConfig {
            level_thresholds: vec![2.0, 3.5, 4.5, f64::NAN, 6.5, 7.5, 8.5, 9.5],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteThreshold { index: 3, .. })
        ));
    }

    #[test]
    fn rejects_bad_silence_gap() {
        for gap in [-1.0, f64::NAN, f64::INFINITY] {
            let config = ScoringConfig {
                scorer: ScorerConfig {
                    silence_gap_seconds: gap,
                },
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSilenceGap(_))
            ));
        }
        assert!(ScorerConfig {
            silence_gap_seconds: 0.0
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn rejects_wrong_threshold_count() {
        let config = MappingConfig {
            level_thresholds: vec![2.0, 5.0],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdCount { found: 2, .. })
        ));
    }

    #[test]
    fn rejects_zero_divisor() {
        let config = MappingConfig {
            deterministic_divisor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight {
                name: "deterministic_divisor",
                ..
            })
        ));
    }
}
