//! Core data model types for oralexam.
//!
//! Exam sections, transcript turns, the metrics produced by the deterministic
//! scorer, the qualitative score record supplied by an external assessor, and
//! the composite result that the mapper derives from both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Value used for every qualitative field the assessor did not supply.
pub const DEFAULT_QUALITATIVE_SCORE: f64 = 5.0;

/// Upper bound of every 0–10 scale in the system.
pub const SCORE_SCALE_MAX: f64 = 10.0;

/// Oral expression section of the exam.
///
/// Section A ("EO1") asks the candidate to obtain information by asking
/// questions; section B ("EO2") asks them to convince a friend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "EO1", alias = "A", alias = "eo1", alias = "a")]
    A,
    #[serde(rename = "EO2", alias = "B", alias = "eo2", alias = "b")]
    B,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::A => write!(f, "EO1"),
            Section::B => write!(f, "EO2"),
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" | "eo1" => Ok(Section::A),
            "b" | "eo2" => Ok(Section::B),
            other => Err(format!("section must be EO1 or EO2, got: {other}")),
        }
    }
}

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "system")]
    System,
}

/// One utterance in the exam conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    /// Recognized text; absent text is treated as empty.
    #[serde(default)]
    pub text: String,
    /// Seconds since the start of the exam, when known.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl TranscriptTurn {
    pub fn user(text: impl Into<String>, timestamp: Option<f64>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp,
        }
    }

    pub fn system(text: impl Into<String>, timestamp: Option<f64>) -> Self {
        Self {
            speaker: Speaker::System,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }
}

/// Objective measurements computed from a transcript and its timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeterministicMetrics {
    /// Raw speaking time supplied by the caller.
    #[serde(default)]
    pub speaking_time_seconds: f64,
    /// Share of the exam spent speaking, in percent. Not clamped.
    #[serde(default)]
    pub speaking_percentage: f64,
    /// Gaps between consecutive user turns longer than the silence threshold.
    #[serde(default)]
    pub long_silence_count: u32,
    /// Number of user turns.
    #[serde(default)]
    pub interaction_turn_count: u32,
    /// Section A: user turns that ask a question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
    /// Section A: mean pairwise word overlap between user turns, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_score: Option<f64>,
    /// Section B: declarative sentence fragments across user turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_count: Option<u32>,
}

impl DeterministicMetrics {
    pub fn question_count(&self) -> u32 {
        self.question_count.unwrap_or(0)
    }

    pub fn repetition_score(&self) -> f64 {
        self.repetition_score.unwrap_or(0.0)
    }

    pub fn argument_count(&self) -> u32 {
        self.argument_count.unwrap_or(0)
    }
}

/// Name of one qualitative dimension plus the alternative keys an assessor
/// may use for it.
#[derive(Debug, Clone, Copy)]
pub struct QualitativeField {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

const INTERACTION_FIELDS: [QualitativeField; 5] = [
    QualitativeField {
        name: "relevance",
        aliases: &["pertinence"],
    },
    QualitativeField {
        name: "variety",
        aliases: &["variete"],
    },
    QualitativeField {
        name: "politeness",
        aliases: &["politesse"],
    },
    QualitativeField {
        name: "reformulation",
        aliases: &[],
    },
    QualitativeField {
        name: "interaction_quality",
        aliases: &["qualite_interaction"],
    },
];

const ARGUMENTATION_FIELDS: [QualitativeField; 5] = [
    QualitativeField {
        name: "structure",
        aliases: &[],
    },
    QualitativeField {
        name: "argument_quality",
        aliases: &["qualite_arguments"],
    },
    QualitativeField {
        name: "objection_handling",
        aliases: &["reaction_objections"],
    },
    QualitativeField {
        name: "fluency",
        aliases: &["fluidite"],
    },
    QualitativeField {
        name: "language_control",
        aliases: &["maitrise_langue"],
    },
];

/// Five-dimension qualitative assessment, one shape per section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section")]
pub enum QualitativeScores {
    #[serde(rename = "EO1")]
    Interaction {
        relevance: f64,
        variety: f64,
        politeness: f64,
        reformulation: f64,
        interaction_quality: f64,
    },
    #[serde(rename = "EO2")]
    Argumentation {
        structure: f64,
        argument_quality: f64,
        objection_handling: f64,
        fluency: f64,
        language_control: f64,
    },
}

impl QualitativeScores {
    /// Field names, in the order of [`QualitativeScores::values`].
    pub fn fields(section: Section) -> &'static [QualitativeField; 5] {
        match section {
            Section::A => &INTERACTION_FIELDS,
            Section::B => &ARGUMENTATION_FIELDS,
        }
    }

    /// Every field at [`DEFAULT_QUALITATIVE_SCORE`].
    pub fn neutral(section: Section) -> Self {
        Self::from_values(section, [DEFAULT_QUALITATIVE_SCORE; 5])
    }

    pub fn from_values(section: Section, v: [f64; 5]) -> Self {
        match section {
            Section::A => QualitativeScores::Interaction {
                relevance: v[0],
                variety: v[1],
                politeness: v[2],
                reformulation: v[3],
                interaction_quality: v[4],
            },
            Section::B => QualitativeScores::Argumentation {
                structure: v[0],
                argument_quality: v[1],
                objection_handling: v[2],
                fluency: v[3],
                language_control: v[4],
            },
        }
    }

    pub fn section(&self) -> Section {
        match self {
            QualitativeScores::Interaction { .. } => Section::A,
            QualitativeScores::Argumentation { .. } => Section::B,
        }
    }

    pub fn values(&self) -> [f64; 5] {
        match *self {
            QualitativeScores::Interaction {
                relevance,
                variety,
                politeness,
                reformulation,
                interaction_quality,
            } => [
                relevance,
                variety,
                politeness,
                reformulation,
                interaction_quality,
            ],
            QualitativeScores::Argumentation {
                structure,
                argument_quality,
                objection_handling,
                fluency,
                language_control,
            } => [
                structure,
                argument_quality,
                objection_handling,
                fluency,
                language_control,
            ],
        }
    }

    /// Arithmetic mean of the five dimensions.
    pub fn mean(&self) -> f64 {
        self.values().iter().sum::<f64>() / 5.0
    }
}

/// How much of a qualitative record came from the assessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreSource {
    /// Every field was present and numeric.
    Supplied,
    /// Some fields were missing or not numeric and were defaulted.
    PartiallyDefaulted { missing: Vec<String> },
    /// Nothing usable was supplied; every field is defaulted.
    Defaulted { reason: String },
}

/// Qualitative scores after the default-filling step, tagged with where
/// they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeAssessment {
    pub scores: QualitativeScores,
    pub source: ScoreSource,
}

impl QualitativeAssessment {
    pub fn supplied(scores: QualitativeScores) -> Self {
        Self {
            scores,
            source: ScoreSource::Supplied,
        }
    }

    pub fn defaulted(section: Section, reason: impl Into<String>) -> Self {
        Self {
            scores: QualitativeScores::neutral(section),
            source: ScoreSource::Defaulted {
                reason: reason.into(),
            },
        }
    }

    /// Normalize an untrusted assessor record for `section`.
    ///
    /// Absent or non-object input defaults every field. Within an object each
    /// field is looked up by name, then by alias; numeric strings are
    /// accepted, values are clamped to `[0, 10]`, and anything else falls back
    /// to [`DEFAULT_QUALITATIVE_SCORE`].
    pub fn from_value(section: Section, value: Option<&Value>) -> Self {
        let object = match value {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => {
                return Self::defaulted(section, "no qualitative scores supplied")
            }
            Some(other) => {
                return Self::defaulted(
                    section,
                    format!("expected a JSON object, got {}", json_kind(other)),
                )
            }
        };

        let mut values = [DEFAULT_QUALITATIVE_SCORE; 5];
        let mut missing = Vec::new();
        for (slot, field) in values
            .iter_mut()
            .zip(QualitativeScores::fields(section).iter())
        {
            let found = std::iter::once(field.name)
                .chain(field.aliases.iter().copied())
                .find_map(|key| object.get(key).and_then(numeric_score));
            match found {
                Some(score) => *slot = score,
                None => missing.push(field.name.to_string()),
            }
        }

        let scores = QualitativeScores::from_values(section, values);
        let source = if missing.is_empty() {
            ScoreSource::Supplied
        } else if missing.len() == values.len() {
            ScoreSource::Defaulted {
                reason: "no recognized qualitative fields".into(),
            }
        } else {
            ScoreSource::PartiallyDefaulted { missing }
        };

        Self { scores, source }
    }

    pub fn is_fully_supplied(&self) -> bool {
        self.source == ScoreSource::Supplied
    }
}

fn numeric_score(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        // Assessors sometimes nest a comment next to the score.
        Value::Object(map) => map
            .get("score")
            .or_else(|| map.get("note"))
            .and_then(numeric_score),
        _ => None,
    }?;
    raw.is_finite().then(|| raw.clamp(0.0, SCORE_SCALE_MAX))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Coarse exam readiness derived from the CLB level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    NotReady,
    Almost,
    Ready,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::NotReady => write!(f, "Not ready"),
            Readiness::Almost => write!(f, "Almost"),
            Readiness::Ready => write!(f, "Ready"),
        }
    }
}

/// The two halves of the composite score before blending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub deterministic_component: f64,
    pub qualitative_component: f64,
}

/// Final outcome of an exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Weighted blend on a 0–10 scale.
    pub composite_score: f64,
    /// CLB level, 4 through 12.
    pub clb_level: u8,
    pub readiness: Readiness,
    /// At most three feedback messages, in priority order.
    pub improvement_points: Vec<String>,
    pub explanation: String,
    pub breakdown: ScoreBreakdown,
}
