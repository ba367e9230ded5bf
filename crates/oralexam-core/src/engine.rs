//! Scoring pipeline orchestrator.
//!
//! Runs the three scoring layers for an attempt (deterministic metrics,
//! qualitative assessment, CLB mapping) and scores batches of independent
//! attempts concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::error::ConfigError;
use crate::mapper::CompositeMapper;
use crate::model::{QualitativeAssessment, Section, TranscriptTurn};
use crate::report::ScoringReport;
use crate::scoring::DeterministicScorer;
use crate::traits::{AssessmentRequest, NullAssessor, QualitativeAssessor};

/// One attempt to score, in the shape of the scoring API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub section: Section,
    #[serde(default)]
    pub topic_id: u32,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
    #[serde(default, alias = "speaking_time_seconds")]
    pub speaking_time_sec: f64,
    #[serde(default, alias = "total_time_seconds")]
    pub total_time_sec: f64,
    /// Pre-computed qualitative record. When present the assessor is not
    /// consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualitative_scores: Option<serde_json::Value>,
}

/// Progress reporting trait for batch scoring.
pub trait ProgressReporter: Send + Sync {
    fn on_attempt_complete(&self, index: usize, report: &ScoringReport);
    fn on_batch_complete(&self, total: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_attempt_complete(&self, _: usize, _: &ScoringReport) {}
    fn on_batch_complete(&self, _: usize, _: Duration) {}
}

/// Deterministic scorer + qualitative assessor + composite mapper.
pub struct ScoringPipeline {
    scorer: DeterministicScorer,
    mapper: CompositeMapper,
    assessor: Arc<dyn QualitativeAssessor>,
}

impl ScoringPipeline {
    pub fn new(
        config: ScoringConfig,
        assessor: Arc<dyn QualitativeAssessor>,
    ) -> Result<Self, ConfigError> {
        config.scorer.validate()?;
        Ok(Self {
            scorer: DeterministicScorer::new(config.scorer),
            mapper: CompositeMapper::new(config.mapping)?,
            assessor,
        })
    }

    /// Default calibration, no assessor.
    pub fn offline() -> Self {
        Self {
            scorer: DeterministicScorer::default(),
            mapper: CompositeMapper::default(),
            assessor: Arc::new(NullAssessor),
        }
    }

    pub fn assessor_name(&self) -> &str {
        self.assessor.name()
    }

    /// Score one attempt. Assessor failures never fail the pipeline; they
    /// produce a defaulted qualitative record instead.
    pub async fn evaluate(&self, request: &ScoringRequest) -> ScoringReport {
        let metrics = self.scorer.score(
            &request.transcript,
            request.section,
            request.speaking_time_sec,
            request.total_time_sec,
        );

        let qualitative = match &request.qualitative_scores {
            Some(value) => QualitativeAssessment::from_value(request.section, Some(value)),
            None => self.assess(request).await,
        };

        let result = self
            .mapper
            .map_to_level(&metrics, &qualitative, request.section);

        tracing::info!(
            session_id = request.session_id.as_deref().unwrap_or("-"),
            section = %request.section,
            clb_level = result.clb_level,
            composite = result.composite_score,
            "attempt scored"
        );

        ScoringReport {
            id: Uuid::new_v4(),
            session_id: request.session_id.clone(),
            created_at: Utc::now(),
            section: request.section,
            topic_id: request.topic_id,
            metrics,
            qualitative,
            result,
        }
    }

    async fn assess(&self, request: &ScoringRequest) -> QualitativeAssessment {
        let assessment_request = AssessmentRequest::from_transcript(
            request.section,
            request.topic_id,
            &request.transcript,
        );

        match self.assessor.assess(&assessment_request).await {
            Ok(value) => {
                let assessment = QualitativeAssessment::from_value(request.section, Some(&value));
                if !assessment.is_fully_supplied() {
                    tracing::warn!(
                        assessor = self.assessor.name(),
                        source = ?assessment.source,
                        "qualitative scores incomplete, defaults applied"
                    );
                }
                assessment
            }
            Err(e) => {
                tracing::warn!(
                    assessor = self.assessor.name(),
                    "qualitative assessment failed, using defaults: {e:#}"
                );
                QualitativeAssessment::defaulted(request.section, format!("assessor error: {e}"))
            }
        }
    }

    /// Score independent attempts with at most `parallelism` in flight.
    ///
    /// Reports come back in the order of `requests`; attempts themselves
    /// complete in no particular order.
    pub async fn evaluate_batch(
        &self,
        requests: &[ScoringRequest],
        parallelism: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ScoringReport>> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));

        let mut futures = FuturesUnordered::new();
        for (index, request) in requests.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                Ok::<_, anyhow::Error>((index, self.evaluate(request).await))
            });
        }

        let mut indexed = Vec::with_capacity(requests.len());
        while let Some(outcome) = futures.next().await {
            let (index, report) = outcome?;
            progress.on_attempt_complete(index, &report);
            indexed.push((index, report));
        }

        progress.on_batch_complete(requests.len(), start.elapsed());

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, report)| report).collect())
    }
}
