//! The session aggregate and its dialog state machine.
//!
//! A session is created on the first message from a conversation key and
//! mutated by every pipeline stage under the repository's per-key lock. The
//! dialog lifecycle is explicit so any task can resume a conversation from
//! stored state alone:
//!
//! ```text
//! Empty -> Collecting -> Resolved -> Orchestrating -> Terminal -> Empty
//!            ^   |
//!            '---'   (clarification loops)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::foundation::{SessionKey, StateMachine, Timestamp, ValidationError};
use crate::domain::intent::Intent;

/// Turns of history kept per session. Older turns fall off the front.
pub const MAX_HISTORY_TURNS: usize = 12;

/// Who produced a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One prior turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: Timestamp,
}

impl Turn {
    pub fn user(text: impl Into<String>, at: Timestamp) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            at,
        }
    }

    pub fn assistant(text: impl Into<String>, at: Timestamp) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            at,
        }
    }
}

/// How a completed turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Success,
    Error,
}

/// The per-session dialog lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    /// No pending intent.
    #[default]
    Empty,
    /// Slots are being filled; may loop across turns while clarifications
    /// are answered.
    Collecting,
    /// Every required slot is resolved.
    Resolved,
    /// The builder call is in flight. At most one per session.
    Orchestrating,
    /// The turn ended. Clears the pending intent on the way back to Empty.
    Terminal,
}

impl StateMachine for DialogState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DialogState::*;
        matches!(
            (self, target),
            (Empty, Collecting)
                | (Collecting, Collecting)
                | (Collecting, Resolved)
                | (Collecting, Terminal)
                | (Resolved, Orchestrating)
                | (Resolved, Terminal)
                | (Orchestrating, Terminal)
                | (Terminal, Empty)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DialogState::*;
        match self {
            Empty => vec![Collecting],
            Collecting => vec![Collecting, Resolved, Terminal],
            Resolved => vec![Orchestrating, Terminal],
            Orchestrating => vec![Terminal],
            Terminal => vec![Empty],
        }
    }
}

/// Per-conversation state. Exclusively owns its pending intent and slots
/// while one is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    key: SessionKey,
    state: DialogState,
    pending_intent: Option<Intent>,
    history: VecDeque<Turn>,
    last_activity: Timestamp,
}

impl Session {
    /// A fresh, empty session.
    pub fn new(key: SessionKey, now: Timestamp) -> Self {
        Self {
            key,
            state: DialogState::Empty,
            pending_intent: None,
            history: VecDeque::new(),
            last_activity: now,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn pending_intent(&self) -> Option<&Intent> {
        self.pending_intent.as_ref()
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// History oldest-first.
    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    /// Appends a turn, dropping the oldest past the bound, and bumps
    /// `last_activity`.
    pub fn record_turn(&mut self, turn: Turn) {
        self.last_activity = turn.at;
        self.history.push_back(turn);
        while self.history.len() > MAX_HISTORY_TURNS {
            self.history.pop_front();
        }
    }

    /// Validated state transition.
    pub fn transition(&mut self, target: DialogState) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(target)?;
        Ok(())
    }

    /// Stores (or replaces) the pending intent while collecting/resolving.
    pub fn set_pending_intent(&mut self, intent: Intent) {
        self.pending_intent = Some(intent);
    }

    /// Ends the turn: drops the pending intent and returns the session to
    /// Empty via Terminal, ready for the next instruction.
    pub fn finish(&mut self, outcome: TerminalOutcome) -> Result<(), ValidationError> {
        tracing::debug!(session = %self.key, outcome = ?outcome, "turn finished");
        self.transition(DialogState::Terminal)?;
        self.pending_intent = None;
        self.transition(DialogState::Empty)
    }

    /// True when the session has been idle for at least `ttl_secs`.
    pub fn is_expired(&self, now: Timestamp, ttl_secs: u64) -> bool {
        now.secs_since(&self.last_activity) >= ttl_secs
    }
}
