//! Foundation - shared value objects for the pipeline domain.
//!
//! Strongly-typed identifiers, timestamps, and the state machine trait used by
//! the per-session dialog lifecycle. Everything here is immutable and
//! validation happens at construction.

mod confidence;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use confidence::Confidence;
pub use errors::ValidationError;
pub use ids::{ActionId, SessionKey};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
