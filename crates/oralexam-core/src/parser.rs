//! JSON attempt file parser.
//!
//! Loads recorded exam attempts from JSON files and directories, and
//! validates them before scoring.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::engine::ScoringRequest;

/// An attempt together with the file it was read from.
#[derive(Debug, Clone)]
pub struct AttemptFile {
    pub path: PathBuf,
    pub request: ScoringRequest,
}

impl AttemptFile {
    /// File stem, used as a display name.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Path below `root` without the extension, `/`-separated. Unique among
    /// the attempts loaded from one root; falls back to [`AttemptFile::name`]
    /// when `root` is the file itself.
    pub fn relative_name(&self, root: &Path) -> String {
        match self.path.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            _ => self.name(),
        }
    }
}

/// Parse a single JSON attempt file.
pub fn parse_attempt(path: &Path) -> Result<AttemptFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read attempt file: {}", path.display()))?;

    let request = parse_attempt_str(&content, path)?;
    Ok(AttemptFile {
        path: path.to_path_buf(),
        request,
    })
}

/// Parse a JSON string into a [`ScoringRequest`] (useful for testing).
pub fn parse_attempt_str(content: &str, source_path: &Path) -> Result<ScoringRequest> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse attempt JSON: {}", source_path.display()))
}

/// Recursively load all `.json` attempt files from a directory, in path order.
pub fn load_attempt_directory(dir: &Path) -> Result<Vec<AttemptFile>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut attempts = Vec::new();
    for path in paths {
        if path.is_dir() {
            attempts.extend(load_attempt_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match parse_attempt(&path) {
                Ok(attempt) => attempts.push(attempt),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(attempts)
}

/// Load a single file or every attempt under a directory.
pub fn load_attempts(path: &Path) -> Result<Vec<AttemptFile>> {
    if path.is_dir() {
        load_attempt_directory(path)
    } else {
        Ok(vec![parse_attempt(path)?])
    }
}

/// A warning from attempt validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// Index of the transcript turn concerned, if any.
    pub turn: Option<usize>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn attempt(message: impl Into<String>) -> Self {
        Self {
            turn: None,
            message: message.into(),
        }
    }

    fn turn(index: usize, message: impl Into<String>) -> Self {
        Self {
            turn: Some(index),
            message: message.into(),
        }
    }
}

/// Check an attempt for input the scorer accepts but that is probably wrong.
pub fn validate_attempt(request: &ScoringRequest) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let speaking = request.speaking_time_sec;
    let total = request.total_time_sec;

    for (name, value) in [("speaking_time_sec", speaking), ("total_time_sec", total)] {
        if !value.is_finite() {
            warnings.push(ValidationWarning::attempt(format!("{name} is not a finite number")));
        } else if value < 0.0 {
            warnings.push(ValidationWarning::attempt(format!("{name} is negative")));
        }
    }

    if total == 0.0 {
        warnings.push(ValidationWarning::attempt(
            "total_time_sec is zero, speaking percentage will be 0",
        ));
    } else if speaking.is_finite() && total.is_finite() && speaking > total {
        warnings.push(ValidationWarning::attempt(format!(
            "speaking time {speaking}s exceeds total time {total}s"
        )));
    }

    if !request.transcript.iter().any(|turn| turn.is_user()) {
        warnings.push(ValidationWarning::attempt("transcript has no user turns"));
    }

    let mut last_timestamp: Option<f64> = None;
    for (index, turn) in request.transcript.iter().enumerate() {
        if turn.is_user() && turn.text.trim().is_empty() {
            warnings.push(ValidationWarning::turn(index, "user turn has no text"));
        }
        if let Some(ts) = turn.timestamp {
            if let Some(previous) = last_timestamp {
                if ts < previous {
                    warnings.push(ValidationWarning::turn(
                        index,
                        format!("timestamp {ts} is earlier than previous turn ({previous})"),
                    ));
                }
            }
            last_timestamp = Some(ts);
        }
    }

    warnings
}
