//! Exam session orchestration.
//!
//! A session owns one state machine and the transcript accumulated while the
//! exam runs. Sessions live in an injected [`SessionStore`]; each one sits
//! behind its own async mutex so phase changes on one session are serialized
//! while independent sessions proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::engine::{ScoringPipeline, ScoringRequest};
use crate::error::SessionError;
use crate::model::{Section, TranscriptTurn};
use crate::report::ScoringReport;
use crate::state_machine::{ExamPhase, ExamStateMachine};

/// Shared handle to a live or archived session.
pub type SessionHandle = Arc<Mutex<ExamSession>>;

/// One candidate's run through an exam section.
#[derive(Debug, Clone)]
pub struct ExamSession {
    pub session_id: Uuid,
    pub section: Section,
    pub topic_id: u32,
    pub created_at: DateTime<Utc>,
    machine: ExamStateMachine,
    transcript: Vec<TranscriptTurn>,
    report: Option<ScoringReport>,
}

impl ExamSession {
    pub fn new(section: Section, topic_id: u32) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            section,
            topic_id,
            created_at: Utc::now(),
            machine: ExamStateMachine::new(),
            transcript: Vec::new(),
            report: None,
        }
    }

    pub fn phase(&self) -> ExamPhase {
        self.machine.current_phase()
    }

    pub fn transcript(&self) -> &[TranscriptTurn] {
        &self.transcript
    }

    pub fn report(&self) -> Option<&ScoringReport> {
        self.report.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            section: self.section,
            topic_id: self.topic_id,
            phase: self.phase(),
            created_at: self.created_at,
            transcript: self.transcript.clone(),
            report: self.report.clone(),
        }
    }

    fn require_phase(&self, expected: ExamPhase) -> Result<(), SessionError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                session_id: self.session_id,
                expected,
                actual,
            })
        }
    }
}

/// Point-in-time copy of a session, safe to hand out to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub section: Section,
    pub topic_id: u32,
    pub phase: ExamPhase,
    pub created_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScoringReport>,
}

/// Where sessions live between requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: ExamSession) -> SessionHandle;

    /// Live session by id.
    async fn get(&self, id: Uuid) -> Option<SessionHandle>;

    /// Move a live session to the archive. Returns `None` if it was not live.
    async fn archive(&self, id: Uuid) -> Option<SessionHandle>;

    async fn get_archived(&self, id: Uuid) -> Option<SessionHandle>;

    /// Number of live sessions.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    live: RwLock<HashMap<Uuid, SessionHandle>>,
    archived: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: ExamSession) -> SessionHandle {
        let id = session.session_id;
        let handle = Arc::new(Mutex::new(session));
        self.live.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.live.read().await.get(&id).cloned()
    }

    async fn archive(&self, id: Uuid) -> Option<SessionHandle> {
        let handle = self.live.write().await.remove(&id)?;
        self.archived.write().await.insert(id, Arc::clone(&handle));
        Some(handle)
    }

    async fn get_archived(&self, id: Uuid) -> Option<SessionHandle> {
        self.archived.read().await.get(&id).cloned()
    }

    async fn len(&self) -> usize {
        self.live.read().await.len()
    }
}

/// Drives sessions through their lifecycle and grades them.
pub struct SessionOrchestrator<S: SessionStore> {
    store: S,
    pipeline: Arc<ScoringPipeline>,
}

impl<S: SessionStore> SessionOrchestrator<S> {
    pub fn new(store: S, pipeline: Arc<ScoringPipeline>) -> Self {
        Self { store, pipeline }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a session in `Idle`.
    pub async fn start_session(&self, section: Section, topic_id: u32) -> SessionSnapshot {
        let session = ExamSession::new(section, topic_id);
        let snapshot = session.snapshot();
        self.store.insert(session).await;
        tracing::info!(session_id = %snapshot.session_id, %section, topic_id, "session started");
        snapshot
    }

    /// Current state of a live or archived session.
    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let handle = match self.store.get(id).await {
            Some(handle) => handle,
            None => self
                .store
                .get_archived(id)
                .await
                .ok_or(SessionError::NotFound(id))?,
        };
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Ask for a phase change. `Ok(false)` means the move is illegal from the
    /// current phase and nothing changed.
    pub async fn request_phase(&self, id: Uuid, phase: ExamPhase) -> Result<bool, SessionError> {
        let handle = self.live(id).await?;
        let mut session = handle.lock().await;
        let moved = session.machine.transition(phase);
        if !moved {
            tracing::warn!(
                session_id = %id,
                current = %session.phase(),
                requested = %phase,
                "illegal phase transition rejected"
            );
        }
        Ok(moved)
    }

    /// Record a turn of the live exchange. Only accepted while `Active`.
    pub async fn append_turn(&self, id: Uuid, turn: TranscriptTurn) -> Result<(), SessionError> {
        let handle = self.live(id).await?;
        let mut session = handle.lock().await;
        session.require_phase(ExamPhase::Active)?;
        session.transcript.push(turn);
        Ok(())
    }

    /// Score the accumulated transcript. The session must be in `Grading`;
    /// the report is kept on the session. Qualitative scores assessed
    /// elsewhere bypass the pipeline's assessor.
    pub async fn grade(
        &self,
        id: Uuid,
        speaking_time_sec: f64,
        total_time_sec: f64,
        qualitative_scores: Option<serde_json::Value>,
    ) -> Result<ScoringReport, SessionError> {
        let handle = self.live(id).await?;
        let mut session = handle.lock().await;
        session.require_phase(ExamPhase::Grading)?;

        let request = ScoringRequest {
            session_id: Some(id.to_string()),
            section: session.section,
            topic_id: session.topic_id,
            transcript: session.transcript.clone(),
            speaking_time_sec,
            total_time_sec,
            qualitative_scores,
        };
        let report = self.pipeline.evaluate(&request).await;
        session.report = Some(report.clone());
        Ok(report)
    }

    /// Finish a session: `Results → Completed`, then archive it.
    /// `Ok(false)` if the session is not in `Results`.
    pub async fn complete(&self, id: Uuid) -> Result<bool, SessionError> {
        let handle = self.live(id).await?;
        {
            let mut session = handle.lock().await;
            if !session.machine.transition(ExamPhase::Completed) {
                tracing::warn!(
                    session_id = %id,
                    current = %session.phase(),
                    "cannot complete session"
                );
                return Ok(false);
            }
        }
        self.store.archive(id).await;
        tracing::info!(session_id = %id, "session completed and archived");
        Ok(true)
    }

    async fn live(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        self.store.get(id).await.ok_or(SessionError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> SessionOrchestrator<InMemorySessionStore> {
        SessionOrchestrator::new(
            InMemorySessionStore::new(),
            Arc::new(ScoringPipeline::offline()),
        )
    }

    async fn advance_to(
        orchestrator: &SessionOrchestrator<InMemorySessionStore>,
        id: Uuid,
        target: ExamPhase,
    ) {
        for &phase in ExamPhase::ALL.iter().skip(1) {
            assert!(orchestrator.request_phase(id, phase).await.unwrap());
            if phase == target {
                break;
            }
        }
    }

    #[tokio::test]
    async fn new_session_starts_idle() {
        let orchestrator = orchestrator();
        let snapshot = orchestrator.start_session(Section::A, 3).await;
        assert_eq!(snapshot.phase, ExamPhase::Idle);
        assert!(snapshot.transcript.is_empty());
        assert_eq!(orchestrator.store().len().await, 1);
    }

    #[tokio::test]
    async fn illegal_request_is_false_not_error() {
        let orchestrator = orchestrator();
        let id = orchestrator.start_session(Section::A, 1).await.session_id;
        assert!(!orchestrator.request_phase(id, ExamPhase::Grading).await.unwrap());
        assert_eq!(orchestrator.snapshot(id).await.unwrap().phase, ExamPhase::Idle);
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .request_phase(Uuid::new_v4(), ExamPhase::Selection)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn turns_only_accepted_while_active() {
        let orchestrator = orchestrator();
        let id = orchestrator.start_session(Section::B, 2).await.session_id;

        let err = orchestrator
            .append_turn(id, TranscriptTurn::user("trop tôt", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongPhase {
                expected: ExamPhase::Active,
                actual: ExamPhase::Idle,
                ..
            }
        ));

        advance_to(&orchestrator, id, ExamPhase::Active).await;
        orchestrator
            .append_turn(id, TranscriptTurn::user("Le train est pratique.", Some(1.0)))
            .await
            .unwrap();
        assert_eq!(orchestrator.snapshot(id).await.unwrap().transcript.len(), 1);
    }

    #[tokio::test]
    async fn full_lifecycle_grades_and_archives() {
        let orchestrator = orchestrator();
        let id = orchestrator.start_session(Section::A, 5).await.session_id;

        advance_to(&orchestrator, id, ExamPhase::Active).await;
        for (i, text) in ["Quel est le tarif", "Combien de places restent"]
            .iter()
            .enumerate()
        {
            orchestrator
                .append_turn(id, TranscriptTurn::user(*text, Some(i as f64)))
                .await
                .unwrap();
        }

        assert!(matches!(
            orchestrator.grade(id, 60.0, 300.0, None).await,
            Err(SessionError::WrongPhase { .. })
        ));

        assert!(orchestrator.request_phase(id, ExamPhase::TimeExpired).await.unwrap());
        assert!(orchestrator.request_phase(id, ExamPhase::Grading).await.unwrap());
        let report = orchestrator.grade(id, 60.0, 300.0, None).await.unwrap();
        assert_eq!(report.metrics.question_count, Some(2));
        assert_eq!(report.session_id, Some(id.to_string()));

        assert!(!orchestrator.complete(id).await.unwrap());
        assert!(orchestrator.request_phase(id, ExamPhase::Results).await.unwrap());
        assert!(orchestrator.complete(id).await.unwrap());

        assert!(orchestrator.store().is_empty().await);
        assert!(orchestrator.store().get_archived(id).await.is_some());
        let snapshot = orchestrator.snapshot(id).await.unwrap();
        assert_eq!(snapshot.phase, ExamPhase::Completed);
        assert!(snapshot.report.is_some());

        // Archived sessions accept no further changes.
        assert!(matches!(
            orchestrator.request_phase(id, ExamPhase::Idle).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn grade_uses_supplied_qualitative_scores() {
        let orchestrator = orchestrator();
        let id = orchestrator.start_session(Section::B, 4).await.session_id;
        advance_to(&orchestrator, id, ExamPhase::Active).await;
        orchestrator
            .append_turn(id, TranscriptTurn::user("Le vélo est rapide.", Some(1.0)))
            .await
            .unwrap();
        assert!(orchestrator.request_phase(id, ExamPhase::TimeExpired).await.unwrap());
        assert!(orchestrator.request_phase(id, ExamPhase::Grading).await.unwrap());

        let scores = serde_json::json!({
            "structure": 7, "argument_quality": 8, "objection_handling": 6,
            "fluency": 7, "language_control": 7
        });
        let report = orchestrator
            .grade(id, 60.0, 300.0, Some(scores))
            .await
            .unwrap();
        assert!(report.qualitative.is_fully_supplied());
        assert_eq!(report.qualitative.scores.values(), [7.0, 8.0, 6.0, 7.0, 7.0]);

        let stored = orchestrator.snapshot(id).await.unwrap().report.unwrap();
        assert_eq!(stored.result.clb_level, report.result.clb_level);
    }

    #[tokio::test]
    async fn concurrent_requests_move_once() {
        let orchestrator = Arc::new(orchestrator());
        let id = orchestrator.start_session(Section::A, 1).await.session_id;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let orchestrator = Arc::clone(&orchestrator);
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .request_phase(id, ExamPhase::Selection)
                    .await
                    .unwrap()
            }));
        }

        let mut moved = 0;
        for task in tasks {
            if task.await.unwrap() {
                moved += 1;
            }
        }
        assert_eq!(moved, 1);
        assert_eq!(
            orchestrator.snapshot(id).await.unwrap().phase,
            ExamPhase::Selection
        );
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let orchestrator = orchestrator();
        let first = orchestrator.start_session(Section::A, 1).await.session_id;
        let second = orchestrator.start_session(Section::B, 2).await.session_id;
        advance_to(&orchestrator, first, ExamPhase::Instructions).await;
        assert_eq!(orchestrator.snapshot(second).await.unwrap().phase, ExamPhase::Idle);
        assert_eq!(orchestrator.store().len().await, 2);
    }
}
