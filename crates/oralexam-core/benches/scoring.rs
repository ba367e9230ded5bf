use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oralexam_core::mapper::CompositeMapper;
use oralexam_core::model::{QualitativeAssessment, Section, TranscriptTurn};
use oralexam_core::scoring::{self, repetition_score};

const QUESTIONS: &[&str] = &[
    "Bonjour, quel est le prix de l'inscription ?",
    "Est-ce que les cours ont lieu le soir ?",
    "Combien d'élèves y a-t-il par groupe ?",
    "Où se trouve la salle principale ?",
    "Pouvez-vous m'envoyer le programme ?",
    "Quand commence la prochaine session ?",
];

fn make_transcript(turns: usize) -> Vec<TranscriptTurn> {
    (0..turns)
        .flat_map(|i| {
            let t = i as f64 * 6.0;
            [
                TranscriptTurn::system("Oui, bien sûr. Autre chose ?", Some(t)),
                TranscriptTurn::user(QUESTIONS[i % QUESTIONS.len()], Some(t + 2.0 + (i % 3) as f64)),
            ]
        })
        .collect()
}

fn bench_deterministic(c: &mut Criterion) {
    let mut group = c.benchmark_group("deterministic_score");

    for turns in [6, 30, 120] {
        let transcript = make_transcript(turns);
        group.bench_function(format!("section_a/{turns}_turns"), |b| {
            b.iter(|| scoring::score(black_box(&transcript), Section::A, 120.0, 300.0))
        });
        group.bench_function(format!("section_b/{turns}_turns"), |b| {
            b.iter(|| scoring::score(black_box(&transcript), Section::B, 120.0, 300.0))
        });
    }

    group.finish();
}

fn bench_repetition(c: &mut Criterion) {
    let mut group = c.benchmark_group("repetition_score");
    let texts: Vec<&str> = QUESTIONS.iter().cycle().take(60).copied().collect();

    group.bench_function("60_turns", |b| {
        b.iter(|| repetition_score(black_box(&texts)))
    });

    group.finish();
}

fn bench_map_to_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_to_level");
    let mapper = CompositeMapper::default();
    let metrics = scoring::score(&make_transcript(6), Section::A, 120.0, 300.0);
    let neutral = QualitativeAssessment::from_value(Section::A, None);
    let supplied = serde_json::json!({
        "pertinence": 7, "variete": 6, "politesse": 8,
        "reformulation": 5, "qualite_interaction": 7
    });

    group.bench_function("neutral", |b| {
        b.iter(|| mapper.map_to_level(black_box(&metrics), black_box(&neutral), Section::A))
    });

    group.bench_function("default_filling", |b| {
        b.iter(|| QualitativeAssessment::from_value(Section::A, Some(black_box(&supplied))))
    });

    group.finish();
}

criterion_group!(benches, bench_deterministic, bench_repetition, bench_map_to_level);
criterion_main!(benches);
