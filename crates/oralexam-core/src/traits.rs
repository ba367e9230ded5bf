//! Trait for the external qualitative assessor.
//!
//! Implementations live in `oralexam-providers`. The scoring pipeline treats
//! whatever they return as untrusted and normalizes it through
//! [`QualitativeAssessment::from_value`](crate::model::QualitativeAssessment::from_value).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Section, TranscriptTurn};

/// Opaque evaluator that rates an attempt on the five section dimensions.
#[async_trait]
pub trait QualitativeAssessor: Send + Sync {
    /// Human-readable assessor name (e.g. "openai").
    fn name(&self) -> &str;

    /// Rate an attempt. The returned record may be partial or malformed.
    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<serde_json::Value>;
}

/// What an assessor gets to see of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub section: Section,
    pub topic_id: u32,
    /// Text of every user turn joined by single spaces.
    pub user_text: String,
}

impl AssessmentRequest {
    pub fn from_transcript(section: Section, topic_id: u32, transcript: &[TranscriptTurn]) -> Self {
        let user_text = transcript
            .iter()
            .filter(|turn| turn.is_user())
            .map(|turn| turn.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            section,
            topic_id,
            user_text,
        }
    }
}

/// Assessor that never supplies scores, so every attempt is scored with the
/// neutral qualitative record.
pub struct NullAssessor;

#[async_trait]
impl QualitativeAssessor for NullAssessor {
    fn name(&self) -> &str {
        "none"
    }

    async fn assess(&self, _: &AssessmentRequest) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}
