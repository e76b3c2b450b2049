//! Transaction Orchestrator.
//!
//! Converts a fully-resolved intent into an [`ActionRequest`], drives the
//! external transaction-construction call, and validates the returned payload
//! field-for-field before an [`ActionResult`] exists. A payload that differs
//! from the request on any economically material field is a fatal
//! `BuilderMismatch`, never a retry.

mod orchestrator;

pub use orchestrator::{
    ActionRequest, ActionResult, EconomicFields, OrchestrationError, TransactionOrchestrator,
};
