//! Application layer - the per-turn pipeline.
//!
//! One service orchestrates a full inbound turn: session checkout, intent
//! parsing, slot resolution, orchestration, and response composition. The
//! transport layer calls nothing else.

mod turn_service;

pub use turn_service::TurnService;
