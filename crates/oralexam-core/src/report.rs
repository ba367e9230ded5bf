//! Scoring report with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CompositeResult, DeterministicMetrics, QualitativeAssessment, Section};

/// Everything produced by one run of the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// Session the attempt belongs to, when known.
    #[serde(default)]
    pub session_id: Option<String>,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub section: Section,
    pub topic_id: u32,
    /// Layer 1: deterministic metrics.
    pub metrics: DeterministicMetrics,
    /// Layer 2: qualitative scores after default filling.
    pub qualitative: QualitativeAssessment,
    /// Layer 3: composite score and CLB mapping.
    pub result: CompositeResult,
}

impl ScoringReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoringReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// One-line summary for logs and console output.
    pub fn summary(&self) -> String {
        format!(
            "{} topic {}: CLB {} ({}), composite {:.2}",
            self.section,
            self.topic_id,
            self.result.clb_level,
            self.result.readiness,
            self.result.composite_score
        )
    }
}
