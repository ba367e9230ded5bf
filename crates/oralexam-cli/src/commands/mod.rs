pub mod init;
pub mod score;
pub mod simulate;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use oralexam_core::engine::ScoringPipeline;
use oralexam_providers::config::{create_assessor, load_config_from, OralExamConfig};

/// Load config and build the scoring pipeline it describes.
pub(crate) fn build_pipeline(
    config_path: Option<&Path>,
    offline: bool,
) -> Result<(OralExamConfig, ScoringPipeline)> {
    let config = load_config_from(config_path)?;
    let assessor = if offline {
        create_assessor(None)?
    } else {
        create_assessor(config.assessor.as_ref())?
    };
    tracing::debug!(assessor = assessor.name(), "assessor selected");
    let pipeline = ScoringPipeline::new(config.scoring.clone(), assessor)?;
    Ok((config, pipeline))
}
