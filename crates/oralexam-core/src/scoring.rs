//! Deterministic scoring of an exam transcript.
//!
//! Turns a transcript plus timing into objective metrics using text-pattern
//! heuristics only. Everything here is a pure function of its inputs.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScorerConfig;
use crate::model::{DeterministicMetrics, Section, TranscriptTurn};

/// French interrogative words and inversions that mark a question.
const INTERROGATIVE_WORDS: &[&str] = &[
    "qui",
    "que",
    "quoi",
    "où",
    "quand",
    "comment",
    "pourquoi",
    "combien",
    "est-ce",
    "avez-vous",
    "avez",
    "êtes",
    "pouvez",
];

static INTERROGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = INTERROGATIVE_WORDS
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({alternation})\b")).expect("interrogative pattern is valid")
});

static INTERROGATIVE_DETERMINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(quel|quelle|quels|quelles)\b").expect("determiner pattern is valid")
});

/// Computes [`DeterministicMetrics`] for a transcript.
#[derive(Debug, Clone, Default)]
pub struct DeterministicScorer {
    config: ScorerConfig,
}

impl DeterministicScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score one attempt.
    ///
    /// `section` must already be validated by the caller. Degenerate input
    /// (empty transcript, zero total time) yields zero metrics rather than
    /// an error.
    pub fn score(
        &self,
        transcript: &[TranscriptTurn],
        section: Section,
        speaking_time_seconds: f64,
        total_time_seconds: f64,
    ) -> DeterministicMetrics {
        let user_turns: Vec<&TranscriptTurn> =
            transcript.iter().filter(|turn| turn.is_user()).collect();

        let speaking_percentage = if total_time_seconds > 0.0 {
            speaking_time_seconds / total_time_seconds * 100.0
        } else {
            0.0
        };

        let mut metrics = DeterministicMetrics {
            speaking_time_seconds,
            speaking_percentage,
            long_silence_count: count_long_silences(&user_turns, self.config.silence_gap_seconds),
            interaction_turn_count: user_turns.len() as u32,
            ..Default::default()
        };

        let texts: Vec<&str> = user_turns.iter().map(|turn| turn.text.as_str()).collect();
        match section {
            Section::A => {
                metrics.question_count =
                    Some(texts.iter().filter(|text| is_question(text)).count() as u32);
                metrics.repetition_score = Some(repetition_score(&texts));
            }
            Section::B => {
                metrics.argument_count = Some(texts.iter().map(|text| count_arguments(text)).sum());
            }
        }

        tracing::debug!(
            %section,
            user_turns = metrics.interaction_turn_count,
            silences = metrics.long_silence_count,
            "deterministic metrics computed"
        );

        metrics
    }
}

/// Score with the default configuration.
pub fn score(
    transcript: &[TranscriptTurn],
    section: Section,
    speaking_time_seconds: f64,
    total_time_seconds: f64,
) -> DeterministicMetrics {
    DeterministicScorer::default().score(
        transcript,
        section,
        speaking_time_seconds,
        total_time_seconds,
    )
}

/// Count adjacent user-turn pairs whose timestamp gap exceeds `gap_seconds`.
/// Pairs where either turn lacks a timestamp are skipped.
pub fn count_long_silences(user_turns: &[&TranscriptTurn], gap_seconds: f64) -> u32 {
    user_turns
        .windows(2)
        .filter_map(|pair| match (pair[0].timestamp, pair[1].timestamp) {
            (Some(earlier), Some(later)) => Some(later - earlier),
            _ => None,
        })
        .filter(|gap| *gap > gap_seconds)
        .count() as u32
}

/// Whether a user turn reads as a question.
pub fn is_question(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains('?')
        || INTERROGATIVE.is_match(&lowered)
        || INTERROGATIVE_DETERMINER.is_match(&lowered)
}

/// Mean Jaccard similarity over all distinct pairs of turns.
///
/// 0.0 means no repeated vocabulary, 1.0 means every turn uses the same
/// words. Fewer than two turns score 0.0.
pub fn repetition_score(texts: &[&str]) -> f64 {
    if texts.len() < 2 {
        return 0.0;
    }

    let word_sets: Vec<HashSet<String>> = texts.iter().map(|text| word_set(text)).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, left) in word_sets.iter().enumerate() {
        for right in &word_sets[i + 1..] {
            total += jaccard_similarity(left, right);
            pairs += 1;
        }
    }

    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

/// Intersection over union of two word sets; 0.0 if either is empty.
pub fn jaccard_similarity(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Count declarative sentence fragments in one turn.
pub fn count_arguments(text: &str) -> u32 {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty() && !fragment.ends_with('?'))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str, ts: Option<f64>) -> TranscriptTurn {
        TranscriptTurn::user(text, ts)
    }

    #[test]
    fn empty_transcript_yields_zero_metrics() {
        let metrics = score(&[], Section::A, 0.0, 0.0);
        assert_eq!(metrics.speaking_percentage, 0.0);
        assert_eq!(metrics.long_silence_count, 0);
        assert_eq!(metrics.interaction_turn_count, 0);
        assert_eq!(metrics.question_count, Some(0));
        assert_eq!(metrics.repetition_score, Some(0.0));
        assert_eq!(metrics.argument_count, None);
    }

    #[test]
    fn speaking_percentage_is_not_clamped() {
        let metrics = score(&[], Section::B, 450.0, 300.0);
        assert!((metrics.speaking_percentage - 150.0).abs() < 1e-9);
        let metrics = score(&[], Section::B, 120.0, 0.0);
        assert_eq!(metrics.speaking_percentage, 0.0);
    }

    #[test]
    fn only_user_turns_count_as_interaction() {
        let transcript = vec![
            TranscriptTurn::system("Bonjour, que puis-je faire pour vous ?", Some(0.0)),
            user("Bonjour", Some(2.0)),
            TranscriptTurn::system("Oui ?", Some(3.0)),
            user("Merci", Some(4.0)),
        ];
        let metrics = score(&transcript, Section::A, 10.0, 100.0);
        assert_eq!(metrics.interaction_turn_count, 2);
        assert_eq!(metrics.question_count, Some(0));
    }

    #[test]
    fn long_silences_skip_missing_timestamps() {
        let transcript = vec![
            user("un", Some(0.0)),
            user("deux", Some(3.0)),
            user("trois", Some(7.5)),
            user("quatre", None),
            user("cinq", Some(30.0)),
            user("six", Some(40.0)),
        ];
        let metrics = score(&transcript, Section::B, 0.0, 60.0);
        // 0→3 is exactly the threshold, 3→7.5 counts, pairs touching None are skipped, 30→40 counts.
        assert_eq!(metrics.long_silence_count, 2);
    }

    #[test]
    fn silence_gap_is_configurable() {
        let transcript = vec![user("un", Some(0.0)), user("deux", Some(4.0))];
        let strict = DeterministicScorer::new(ScorerConfig {
            silence_gap_seconds: 5.0,
        });
        assert_eq!(
            strict
                .score(&transcript, Section::B, 0.0, 10.0)
                .long_silence_count,
            0
        );
        assert_eq!(
            score(&transcript, Section::B, 0.0, 10.0).long_silence_count,
            1
        );
    }

    #[test]
    fn question_detection() {
        assert!(is_question("C'est ouvert le dimanche ?"));
        assert!(is_question("Quand est-ce que la visite commence"));
        assert!(is_question("Où se trouve la salle"));
        assert!(is_question("Quelle est la durée du cours"));
        assert!(is_question("AVEZ-VOUS une réduction pour étudiants"));
        assert!(is_question("Pouvez vous répéter"));
        assert!(!is_question("Je voudrais réserver une table."));
        // Whole words only.
        assert!(!is_question("Quiconque aime la musique."));
        assert!(!is_question("Je suis tranquille"));
    }

    #[test]
    fn question_turn_counts_once() {
        let transcript = vec![user("Qui, quand, où et comment ?", None)];
        let metrics = score(&transcript, Section::A, 0.0, 0.0);
        assert_eq!(metrics.question_count, Some(1));
    }

    #[test]
    fn repetition_of_distinct_turns_is_zero() {
        let texts = ["alpha beta", "gamma delta", "epsilon zeta"];
        assert_eq!(repetition_score(&texts), 0.0);
    }

    #[test]
    fn repetition_of_identical_turns_is_one() {
        let texts = ["Quel est le prix ?", "quel est le prix ?"];
        assert!((repetition_score(&texts) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repetition_is_order_independent() {
        let a = ["le prix du billet", "le prix du repas", "une autre chose"];
        let b = ["une autre chose", "le prix du repas", "le prix du billet"];
        assert!((repetition_score(&a) - repetition_score(&b)).abs() < 1e-12);
        // pairs: 3/5, 0, 0
        assert!((repetition_score(&a) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn repetition_handles_single_and_empty_turns() {
        assert_eq!(repetition_score(&["seul"]), 0.0);
        assert_eq!(repetition_score(&["", "   "]), 0.0);
    }

    #[test]
    fn argument_counting() {
        assert_eq!(count_arguments("C'est moins cher. Et c'est plus rapide!"), 2);
        assert_eq!(count_arguments("Tu es d'accord ? Je pense que oui."), 2);
        assert_eq!(count_arguments("...!?"), 0);
        assert_eq!(count_arguments(""), 0);
    }

    #[test]
    fn section_b_sums_arguments_over_user_turns() {
        let transcript = vec![
            user("Le train est pratique. Il est écologique.", None),
            TranscriptTurn::system("Mais c'est cher. Trop cher.", None),
            user("Il y a des réductions !", None),
        ];
        let metrics = score(&transcript, Section::B, 0.0, 0.0);
        assert_eq!(metrics.argument_count, Some(3));
        assert_eq!(metrics.question_count, None);
        assert_eq!(metrics.repetition_score, None);
    }

    #[test]
    fn scoring_is_reproducible() {
        let transcript = vec![
            user("Quel est le tarif ?", Some(1.0)),
            user("Et pour les enfants ?", Some(6.0)),
        ];
        let first = score(&transcript, Section::A, 40.0, 90.0);
        let second = score(&transcript, Section::A, 40.0, 90.0);
        assert_eq!(first, second);
    }
}
