//! Intent - typed representation of what the user wants done.
//!
//! An utterance is parsed into a tagged [`Intent`] variant carrying a slot map,
//! a confidence score, and the raw text it came from. The parser validates the
//! language-understanding service's output against a closed schema; anything
//! non-conforming becomes `Unrecognized` and is never partially trusted.

mod intent;
mod parser;
mod slot;

pub use intent::{Intent, IntentKind};
pub use parser::{intent_schema, IntentParser, ParseFailure, ParseOutcome};
pub use slot::{Provenance, Slot, SlotName, SlotState, SlotValue, TimeWindow, TokenCandidate};
