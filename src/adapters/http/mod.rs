//! HTTP adapter - the inbound-turn surface.
//!
//! The transport layer (webhook receiver) posts each user message here and
//! relays the single response message back. Delivery mechanics, signatures,
//! and rendering live outside this service.

mod turn;

pub use turn::{turn_router, TurnAppState};
