//! Composite scoring and CLB level mapping.
//!
//! Blends the deterministic metrics with the qualitative assessment into one
//! 0–10 composite score, maps it onto the CLB scale through fixed step
//! thresholds, and derives readiness, improvement points, and an examiner
//! explanation. The mapper never fails: missing metrics count as zero and
//! missing qualitative fields were already defaulted upstream.

use crate::config::{MappingConfig, LEVEL_STEPS, MIN_CLB_LEVEL};
use crate::error::ConfigError;
use crate::model::{
    CompositeResult, DeterministicMetrics, QualitativeAssessment, QualitativeScores, Readiness,
    ScoreBreakdown, Section, SCORE_SCALE_MAX,
};

/// Lowest level considered almost ready.
pub const ALMOST_READY_LEVEL: u8 = 7;
/// Lowest level considered ready.
pub const READY_LEVEL: u8 = 9;

const POINT_SPEAKING_TIME: &str =
    "Augmentez votre temps de parole. Parlez plus et développez vos réponses.";
const POINT_LONG_SILENCES: &str =
    "Réduisez les pauses longues. Pratiquez la fluidité de la parole.";
const POINT_FEW_QUESTIONS: &str =
    "Posez plus de questions variées pour obtenir toutes les informations nécessaires.";
const POINT_REPETITION: &str = "Évitez de répéter les mêmes questions. Variez vos formulations.";
const POINT_FEW_ARGUMENTS: &str =
    "Développez davantage d'arguments distincts pour convaincre votre interlocuteur.";

/// Maps scored attempts onto the CLB scale.
#[derive(Debug, Clone, Default)]
pub struct CompositeMapper {
    config: MappingConfig,
}

impl CompositeMapper {
    /// Build a mapper over a validated configuration.
    pub fn new(config: MappingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Produce the full result for one attempt.
    ///
    /// `qualitative` should be for the same `section`; if it is not, the
    /// neutral record for `section` is used instead.
    pub fn map_to_level(
        &self,
        metrics: &DeterministicMetrics,
        qualitative: &QualitativeAssessment,
        section: Section,
    ) -> CompositeResult {
        let deterministic_component = self.deterministic_component(metrics, section);
        let qualitative_component = if qualitative.scores.section() == section {
            qualitative.scores.mean()
        } else {
            tracing::warn!(
                expected = %section,
                found = %qualitative.scores.section(),
                "qualitative scores are for another section, using neutral scores"
            );
            QualitativeScores::neutral(section).mean()
        };

        let composite_score = self.blend(deterministic_component, qualitative_component);
        let clb_level = self.score_to_level(composite_score);
        let readiness = readiness_for_level(clb_level);
        let improvement_points = self.improvement_points(metrics, section);
        let explanation = examiner_explanation(clb_level, readiness, metrics, section);

        CompositeResult {
            composite_score,
            clb_level,
            readiness,
            improvement_points,
            explanation,
            breakdown: ScoreBreakdown {
                deterministic_component,
                qualitative_component,
            },
        }
    }

    /// Section-specific average of the normalized deterministic sub-scores.
    pub fn deterministic_component(&self, metrics: &DeterministicMetrics, section: Section) -> f64 {
        let c = &self.config;
        let speaking_score = (metrics.speaking_percentage / c.speaking_divisor).min(SCORE_SCALE_MAX);
        let interaction_score =
            (metrics.interaction_turn_count as f64 * c.interaction_turn_weight).min(SCORE_SCALE_MAX);
        let silence_penalty = metrics.long_silence_count as f64 * c.silence_penalty;

        match section {
            Section::A => {
                let question_score =
                    (metrics.question_count() as f64 * c.question_weight).min(SCORE_SCALE_MAX);
                let repetition_penalty = metrics.repetition_score() * c.repetition_penalty_weight;
                (speaking_score + interaction_score + question_score
                    - repetition_penalty
                    - silence_penalty)
                    / c.deterministic_divisor
            }
            Section::B => {
                let argument_score =
                    (metrics.argument_count() as f64 * c.argument_weight).min(SCORE_SCALE_MAX);
                (speaking_score + interaction_score + argument_score - silence_penalty)
                    / c.deterministic_divisor
            }
        }
    }

    /// Weighted blend clamped to `[0, 10]`.
    pub fn blend(&self, deterministic_component: f64, qualitative_component: f64) -> f64 {
        let composite = deterministic_component * self.config.deterministic_weight
            + qualitative_component * self.config.qualitative_weight;
        if composite.is_finite() {
            composite.clamp(0.0, SCORE_SCALE_MAX)
        } else {
            0.0
        }
    }

    /// Step function from composite score to CLB level. Each threshold is
    /// the exclusive upper bound of its level.
    pub fn score_to_level(&self, composite_score: f64) -> u8 {
        let step = self
            .config
            .level_thresholds
            .iter()
            .position(|&bound| composite_score < bound)
            .unwrap_or(LEVEL_STEPS);
        MIN_CLB_LEVEL + step as u8
    }

    /// Up to `max_points` feedback messages. Checks run in a fixed order and
    /// the first ones to trigger win.
    pub fn improvement_points(&self, metrics: &DeterministicMetrics, section: Section) -> Vec<String> {
        let f = &self.config.feedback;
        let mut triggered = vec![
            (
                metrics.speaking_percentage < f.min_speaking_percentage,
                POINT_SPEAKING_TIME,
            ),
            (
                metrics.long_silence_count > f.max_long_silences,
                POINT_LONG_SILENCES,
            ),
        ];
        match section {
            Section::A => {
                triggered.push((metrics.question_count() < f.min_questions, POINT_FEW_QUESTIONS));
                triggered.push((metrics.repetition_score() > f.max_repetition, POINT_REPETITION));
            }
            Section::B => {
                triggered.push((metrics.argument_count() < f.min_arguments, POINT_FEW_ARGUMENTS));
            }
        }

        triggered
            .into_iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, message)| message.to_string())
            .take(f.max_points)
            .collect()
    }
}

/// Readiness bucket for a CLB level.
pub fn readiness_for_level(level: u8) -> Readiness {
    if level < ALMOST_READY_LEVEL {
        Readiness::NotReady
    } else if level < READY_LEVEL {
        Readiness::Almost
    } else {
        Readiness::Ready
    }
}

/// Examiner-style summary. Fully determined by its arguments.
pub fn examiner_explanation(
    level: u8,
    readiness: Readiness,
    metrics: &DeterministicMetrics,
    section: Section,
) -> String {
    let verdict = match readiness {
        Readiness::NotReady => {
            "Le candidat nécessite une préparation supplémentaire avant de passer l'examen officiel."
        }
        Readiness::Almost => {
            "Le candidat est proche du niveau requis mais devrait continuer à pratiquer."
        }
        Readiness::Ready => "Le candidat démontre une maîtrise suffisante pour l'examen.",
    };

    let headline = match section {
        Section::A => format!(
            "Le candidat a posé {} questions avec un taux de participation de {:.1}%.",
            metrics.question_count(),
            metrics.speaking_percentage
        ),
        Section::B => format!(
            "Le candidat a présenté {} arguments distincts avec un taux de participation de {:.1}%.",
            metrics.argument_count(),
            metrics.speaking_percentage
        ),
    };

    format!(
        "Performance évaluée au niveau CLB {level}. {verdict} {headline} \
         Continuez à pratiquer pour améliorer votre fluidité et votre précision."
    )
}
