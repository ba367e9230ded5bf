//! The `oralexam init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("oralexam.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("attempts").context("failed to create attempts/")?;
    write_if_missing(Path::new("attempts/example.json"), EXAMPLE_ATTEMPT)?;

    println!("\nNext steps:");
    println!("  1. Set ORALEXAM_OPENAI_KEY, or edit the [assessor] table in oralexam.toml");
    println!("  2. Run: oralexam validate --attempt attempts/example.json");
    println!("  3. Run: oralexam score --attempt attempts --offline");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# oralexam configuration

parallelism = 4
output_dir = "./oralexam-results"

# Qualitative assessor. Remove this table to score with neutral
# qualitative scores.
[assessor]
type = "openai"
api_key = "${OPENAI_API_KEY}"
model = "gpt-4"

[scoring.scorer]
silence_gap_seconds = 3.0

[scoring.mapping]
deterministic_weight = 0.4
qualitative_weight = 0.6
level_thresholds = [2.0, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5]

[scoring.mapping.feedback]
min_speaking_percentage = 30.0
max_long_silences = 3
min_questions = 5
max_repetition = 0.5
min_arguments = 3
max_points = 3
"#;

const EXAMPLE_ATTEMPT: &str = r#"{
  "session_id": "example",
  "section": "EO1",
  "topic_id": 1,
  "speaking_time_sec": 125.0,
  "total_time_sec": 300.0,
  "transcript": [
    {"speaker": "ai", "text": "Bonjour, École de langues Horizon, je vous écoute.", "timestamp": 0.0},
    {"speaker": "user", "text": "Bonjour madame, j'ai vu votre annonce pour les cours du soir.", "timestamp": 4.0},
    {"speaker": "ai", "text": "Oui, bien sûr.", "timestamp": 8.0},
    {"speaker": "user", "text": "Quel est le prix d'une session complète ?", "timestamp": 10.0},
    {"speaker": "ai", "text": "C'est 350 dollars pour dix semaines.", "timestamp": 13.0},
    {"speaker": "user", "text": "Combien d'élèves y a-t-il par groupe ?", "timestamp": 16.0},
    {"speaker": "ai", "text": "Douze au maximum.", "timestamp": 19.0},
    {"speaker": "user", "text": "Est-ce que les professeurs sont francophones ?", "timestamp": 21.5},
    {"speaker": "ai", "text": "Tous nos professeurs sont natifs.", "timestamp": 24.0},
    {"speaker": "user", "text": "Pouvez-vous m'envoyer le calendrier par courriel ?", "timestamp": 26.0},
    {"speaker": "ai", "text": "Avec plaisir.", "timestamp": 29.0},
    {"speaker": "user", "text": "Où se trouvent vos locaux exactement ?", "timestamp": 31.0},
    {"speaker": "ai", "text": "Au centre-ville, rue Sainte-Catherine.", "timestamp": 34.0},
    {"speaker": "user", "text": "Merci beaucoup, bonne journée.", "timestamp": 36.0}
  ]
}
"#;
