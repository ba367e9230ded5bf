//! Exam lifecycle state machine.
//!
//! Each phase maps to a set of allowed successor phases. The default table is
//! a single linear chain from `Idle` to `Completed`, but the representation
//! keeps room for branching transitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Phases an exam session moves through, in lifecycle order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExamPhase {
    #[default]
    Idle,
    Selection,
    Instructions,
    AdDisplay,
    #[serde(alias = "exam_active")]
    Active,
    TimeExpired,
    Grading,
    Results,
    Completed,
}

impl ExamPhase {
    /// All phases in lifecycle order.
    pub const ALL: [ExamPhase; 9] = [
        ExamPhase::Idle,
        ExamPhase::Selection,
        ExamPhase::Instructions,
        ExamPhase::AdDisplay,
        ExamPhase::Active,
        ExamPhase::TimeExpired,
        ExamPhase::Grading,
        ExamPhase::Results,
        ExamPhase::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamPhase::Idle => "idle",
            ExamPhase::Selection => "selection",
            ExamPhase::Instructions => "instructions",
            ExamPhase::AdDisplay => "ad_display",
            ExamPhase::Active => "active",
            ExamPhase::TimeExpired => "time_expired",
            ExamPhase::Grading => "grading",
            ExamPhase::Results => "results",
            ExamPhase::Completed => "completed",
        }
    }
}

impl fmt::Display for ExamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase → allowed successor phases.
pub type TransitionTable = BTreeMap<ExamPhase, BTreeSet<ExamPhase>>;

/// The linear exam lifecycle: every phase has exactly one successor except
/// `Completed`, which has none.
pub fn default_transitions() -> TransitionTable {
    ExamPhase::ALL
        .windows(2)
        .map(|pair| (pair[0], BTreeSet::from([pair[1]])))
        .collect()
}

/// Holds the current phase of one exam session and enforces legal moves.
#[derive(Debug, Clone)]
pub struct ExamStateMachine {
    current: ExamPhase,
    transitions: TransitionTable,
}

impl Default for ExamStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamStateMachine {
    /// A machine in `Idle` over the default lifecycle.
    pub fn new() -> Self {
        Self::with_transitions(default_transitions())
    }

    /// A machine in `Idle` over a custom transition table.
    pub fn with_transitions(transitions: TransitionTable) -> Self {
        Self {
            current: ExamPhase::Idle,
            transitions,
        }
    }

    pub fn current_phase(&self) -> ExamPhase {
        self.current
    }

    /// Whether `target` is an allowed successor of the current phase.
    pub fn can_transition(&self, target: ExamPhase) -> bool {
        self.transitions
            .get(&self.current)
            .is_some_and(|allowed| allowed.contains(&target))
    }

    /// Move to `target` if legal. Returns `false` and leaves the phase
    /// unchanged otherwise; callers must check the result.
    #[must_use]
    pub fn transition(&mut self, target: ExamPhase) -> bool {
        if self.can_transition(target) {
            tracing::debug!(from = %self.current, to = %target, "phase transition");
            self.current = target;
            true
        } else {
            tracing::debug!(from = %self.current, to = %target, "phase transition rejected");
            false
        }
    }

    /// Successors of the current phase, in lifecycle order.
    pub fn allowed_targets(&self) -> impl Iterator<Item = ExamPhase> + '_ {
        self.transitions
            .get(&self.current)
            .into_iter()
            .flat_map(|allowed| allowed.iter().copied())
    }

    /// True once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().next().is_none()
    }
}
