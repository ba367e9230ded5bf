//! oralexam-providers: Qualitative assessor integrations.
//!
//! Implements the `QualitativeAssessor` trait for an OpenAI-compatible chat
//! completions API and a scriptable mock, plus the configuration that picks
//! between them.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_assessor, load_config, AssessorConfig, OralExamConfig};
pub use error::ProviderError;
