//! Mock assessor for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use oralexam_core::model::{QualitativeScores, Section};
use oralexam_core::traits::{AssessmentRequest, QualitativeAssessor};

/// A mock assessor for exercising the scoring pipeline without API calls.
///
/// Returns a fixed record, the same score on every dimension of the
/// requested section, or an error.
pub struct MockAssessor {
    behavior: Behavior,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<AssessmentRequest>>,
}

enum Behavior {
    Fixed(Value),
    Uniform(f64),
    Fail(String),
}

impl MockAssessor {
    /// Always return `response` verbatim, whatever the section.
    pub fn with_fixed_response(response: Value) -> Self {
        Self::from_behavior(Behavior::Fixed(response))
    }

    /// Rate every dimension of the requested section with `score`.
    pub fn uniform(score: f64) -> Self {
        Self::from_behavior(Behavior::Uniform(score))
    }

    /// Fail every call with `message`.
    pub fn failing(message: &str) -> Self {
        Self::from_behavior(Behavior::Fail(message.to_string()))
    }

    fn from_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this assessor.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this assessor.
    pub fn last_request(&self) -> Option<AssessmentRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

fn uniform_record(section: Section, score: f64) -> Value {
    let record = QualitativeScores::fields(section)
        .iter()
        .map(|field| (field.name.to_string(), Value::from(score)))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(record)
}

#[async_trait]
impl QualitativeAssessor for MockAssessor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<Value> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        match &self.behavior {
            Behavior::Fixed(value) => Ok(value.clone()),
            Behavior::Uniform(score) => Ok(uniform_record(request.section, *score)),
            Behavior::Fail(message) => anyhow::bail!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oralexam_core::model::QualitativeAssessment;
    use serde_json::json;

    fn request(section: Section) -> AssessmentRequest {
        AssessmentRequest {
            section,
            topic_id: 1,
            user_text: "Quel est le prix ?".into(),
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let assessor = MockAssessor::with_fixed_response(json!({"pertinence": 8}));
        let value = assessor.assess(&request(Section::A)).await.unwrap();
        assert_eq!(value, json!({"pertinence": 8}));
        assert_eq!(assessor.call_count(), 1);
        assert_eq!(
            assessor.last_request().unwrap().user_text,
            "Quel est le prix ?"
        );
    }

    #[tokio::test]
    async fn uniform_follows_section() {
        let assessor = MockAssessor::uniform(7.0);
        let value = assessor.assess(&request(Section::B)).await.unwrap();
        let assessment = QualitativeAssessment::from_value(Section::B, Some(&value));
        assert!(assessment.is_fully_supplied());
        assert!((assessment.scores.mean() - 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_counts_calls() {
        let assessor = MockAssessor::failing("quota exceeded");
        let err = assessor.assess(&request(Section::A)).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(assessor.assess(&request(Section::A)).await.is_err());
        assert_eq!(assessor.call_count(), 2);
    }
}
