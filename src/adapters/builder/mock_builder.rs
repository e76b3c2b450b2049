//! Scriptable mock of the transaction-construction service.
//!
//! Echoes the request's economic fields by default, which is exactly what a
//! well-behaved builder does. Tests script it to tamper with a field, fail
//! transiently, or reject outright.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::domain::orchestrator::ActionRequest;
use crate::ports::{BuilderError, BuilderPayload, TransactionBuilder};

/// A scripted deviation from echoing the request.
#[derive(Debug, Clone)]
pub enum Tamper {
    /// Echo a different amount.
    Amount(Decimal),
    /// Echo a different primary asset.
    Asset(String),
    /// Echo a different destination.
    Destination(String),
}

/// Echo builder with scriptable failures and tampering.
#[derive(Debug)]
pub struct MockTransactionBuilder {
    errors: Mutex<VecDeque<BuilderError>>,
    tamper: Option<Tamper>,
    validity_secs: u64,
    calls: Mutex<u32>,
    requests: Mutex<Vec<ActionRequest>>,
}

impl Default for MockTransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransactionBuilder {
    /// A faithful echo builder with a two-minute validity window.
    pub fn new() -> Self {
        Self {
            errors: Mutex::new(VecDeque::new()),
            tamper: None,
            validity_secs: 120,
            calls: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues an error for the next call; queued errors are consumed in
    /// order before any echoing happens.
    pub fn with_error(self, err: BuilderError) -> Self {
        self.errors.lock().unwrap().push_back(err);
        self
    }

    /// Makes every successful payload deviate from the request.
    pub fn with_tamper(mut self, tamper: Tamper) -> Self {
        self.tamper = Some(tamper);
        self
    }

    /// Overrides the validity window.
    pub fn with_validity_secs(mut self, secs: u64) -> Self {
        self.validity_secs = secs;
        self
    }

    /// Number of build calls received.
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }

    /// Every ActionRequest received, in order.
    pub fn recorded_requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionBuilder for MockTransactionBuilder {
    async fn build(&self, request: &ActionRequest) -> Result<BuilderPayload, BuilderError> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        self.requests.lock().unwrap().push(request.clone());

        if let Some(err) = self.errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        let fields = request.fields();
        let mut payload = BuilderPayload {
            reference: format!("mock-tx-{}-{}", request.id(), call_no),
            asset: fields.asset.clone(),
            amount: fields.amount,
            destination: fields.destination.clone(),
            counter_asset: fields.counter_asset.clone(),
            expires_at: Timestamp::now().plus_secs(self.validity_secs),
        };

        match &self.tamper {
            None => {}
            Some(Tamper::Amount(amount)) => payload.amount = Some(*amount),
            Some(Tamper::Asset(asset)) => payload.asset = asset.clone(),
            Some(Tamper::Destination(dest)) => payload.destination = Some(dest.clone()),
        }

        Ok(payload)
    }
}
