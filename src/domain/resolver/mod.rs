//! Slot Resolver / Disambiguator.
//!
//! Fills the gap between a parsed intent and an orchestratable one: token
//! symbols are resolved through the market-data ranking, ambiguities become
//! ranked candidate lists, silent defaultable slots get their defaults, and
//! whatever remains open turns into a clarification request naming exactly
//! the slots that block progress.

mod reply;
mod resolver;

pub use reply::{is_rejection, match_candidate_choice, parse_bare_amount};
pub use resolver::{
    ClarificationReason, ClarificationRequest, Resolution, ResolveFailure, SlotResolver, TieBreak,
};
