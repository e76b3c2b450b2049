//! Txpilot - Conversational Transaction Front-End
//!
//! This crate implements the intent-resolution and transaction-orchestration
//! pipeline: free-form natural-language turns are parsed into typed intents,
//! missing parameters are resolved through lookups or follow-up dialogue, and
//! fully-resolved intents are handed to an external transaction-construction
//! service whose output is validated before anything reaches the user.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
