//! The `oralexam validate` command.

use std::path::PathBuf;

use anyhow::Result;

use oralexam_core::parser;

pub fn execute(attempt_path: PathBuf) -> Result<()> {
    let attempts = parser::load_attempts(&attempt_path)?;

    let mut total_warnings = 0;

    for attempt in &attempts {
        let request = &attempt.request;
        println!(
            "Attempt: {} ({}, topic {}, {} turns)",
            attempt.name(),
            request.section,
            request.topic_id,
            request.transcript.len()
        );

        let warnings = parser::validate_attempt(request);
        for w in &warnings {
            let prefix = w
                .turn
                .map(|index| format!("  [turn {index}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if attempts.is_empty() {
        println!("No attempt files found.");
    } else if total_warnings == 0 {
        println!("All attempts valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
