//! The `oralexam simulate` command.
//!
//! Replays a recorded attempt through a live exam session: every lifecycle
//! phase is requested in order, transcript turns are appended while the
//! session is active, and the session is graded and archived at the end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use oralexam_core::parser;
use oralexam_core::session::{InMemorySessionStore, SessionOrchestrator};
use oralexam_core::state_machine::ExamPhase;

type Orchestrator = SessionOrchestrator<InMemorySessionStore>;

pub async fn execute(
    attempt_path: PathBuf,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, pipeline) = super::build_pipeline(config_path.as_deref(), offline)?;
    let attempt = parser::parse_attempt(&attempt_path)?;
    let request = attempt.request;

    let orchestrator = SessionOrchestrator::new(InMemorySessionStore::new(), Arc::new(pipeline));
    let session = orchestrator
        .start_session(request.section, request.topic_id)
        .await;
    let id = session.session_id;
    println!(
        "Session {id} ({}, topic {}): {}",
        session.section, session.topic_id, session.phase
    );

    for phase in [
        ExamPhase::Selection,
        ExamPhase::Instructions,
        ExamPhase::AdDisplay,
        ExamPhase::Active,
    ] {
        advance(&orchestrator, id, phase).await?;
    }

    for turn in request.transcript {
        orchestrator.append_turn(id, turn).await?;
    }
    let turns = orchestrator.snapshot(id).await?.transcript.len();
    println!("  recorded {turns} turn(s)");

    advance(&orchestrator, id, ExamPhase::TimeExpired).await?;
    advance(&orchestrator, id, ExamPhase::Grading).await?;

    let report = orchestrator
        .grade(
            id,
            request.speaking_time_sec,
            request.total_time_sec,
            request.qualitative_scores,
        )
        .await?;

    advance(&orchestrator, id, ExamPhase::Results).await?;
    anyhow::ensure!(
        orchestrator.complete(id).await?,
        "session {id} could not be completed"
    );
    let final_phase = orchestrator.snapshot(id).await?.phase;
    println!("  -> {final_phase} (archived)");

    println!("\n{}", report.summary());
    println!("Readiness: {}", report.result.readiness);
    for point in &report.result.improvement_points {
        println!("  - {point}");
    }
    println!("\n{}", report.result.explanation);

    Ok(())
}

async fn advance(orchestrator: &Orchestrator, id: Uuid, phase: ExamPhase) -> Result<()> {
    anyhow::ensure!(
        orchestrator.request_phase(id, phase).await?,
        "transition to {phase} was rejected"
    );
    println!("  -> {phase}");
    Ok(())
}
