//! Session - per-conversation state tracked across turns.

mod session;

pub use session::{DialogState, Session, Speaker, TerminalOutcome, Turn, MAX_HISTORY_TURNS};
