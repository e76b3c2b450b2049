//! ActionRequest construction, builder invocation, payload validation.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::foundation::{ActionId, Timestamp};
use crate::domain::intent::{Intent, IntentKind, Slot, SlotName, SlotValue, TokenCandidate};
use crate::ports::{BuilderError, BuilderPayload, RetryError, RetryPolicy, TransactionBuilder};

/// The economically material fields of a request, compared verbatim against
/// whatever the builder echoes back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicFields {
    /// Chain identifier of the primary asset.
    pub asset: String,
    /// Symbol of the primary asset, for user-facing text only.
    pub asset_symbol: String,
    /// Amount of the primary asset. Absent for balance queries.
    pub amount: Option<Decimal>,
    /// Destination address for transfers.
    pub destination: Option<String>,
    /// Chain identifier of the counter asset for swaps.
    pub counter_asset: Option<String>,
    /// Symbol of the counter asset, for user-facing text only.
    pub counter_symbol: Option<String>,
}

/// The fully-resolved, validated payload sent to the builder.
///
/// Invariant: can only be constructed from an intent whose required slots are
/// all resolved; [`ActionRequest::from_intent`] is the sole constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    id: ActionId,
    kind: IntentKind,
    fields: EconomicFields,
    created_at: Timestamp,
}

impl ActionRequest {
    /// Converts a resolved intent. Fails if any required slot is unresolved
    /// or the variant never builds transactions.
    pub fn from_intent(intent: &Intent) -> Result<Self, OrchestrationError> {
        if !intent.kind().requires_builder() {
            return Err(OrchestrationError::UnsupportedVariant {
                kind: intent.kind(),
            });
        }
        if !intent.is_fully_resolved() {
            let mut open = intent.unfilled_required();
            open.extend(intent.ambiguous_required());
            return Err(OrchestrationError::UnresolvedIntent { slots: open });
        }

        let fields = match intent.kind() {
            IntentKind::Transfer => {
                let token = token_slot(intent, SlotName::Asset)?;
                EconomicFields {
                    asset: token.identifier.clone(),
                    asset_symbol: token.symbol.clone(),
                    amount: amount_slot(intent)?,
                    destination: address_slot(intent, SlotName::Destination)?,
                    counter_asset: None,
                    counter_symbol: None,
                }
            }
            IntentKind::Swap => {
                let from = token_slot(intent, SlotName::FromAsset)?;
                let to = token_slot(intent, SlotName::ToAsset)?;
                EconomicFields {
                    asset: from.identifier.clone(),
                    asset_symbol: from.symbol.clone(),
                    amount: amount_slot(intent)?,
                    destination: None,
                    counter_asset: Some(to.identifier.clone()),
                    counter_symbol: Some(to.symbol.clone()),
                }
            }
            IntentKind::BalanceQuery => {
                let token = token_slot(intent, SlotName::Asset)?;
                EconomicFields {
                    asset: token.identifier.clone(),
                    asset_symbol: token.symbol.clone(),
                    amount: None,
                    destination: None,
                    counter_asset: None,
                    counter_symbol: None,
                }
            }
            IntentKind::RankingQuery => unreachable!("checked by requires_builder above"),
        };

        Ok(Self {
            id: ActionId::new(),
            kind: intent.kind(),
            fields,
            created_at: Timestamp::now(),
        })
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn fields(&self) -> &EconomicFields {
        &self.fields
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// A validated, constructed, unsigned transaction proposal.
///
/// Invariant: never fabricated locally. The only constructor is
/// [`TransactionOrchestrator::validate_payload`], which requires an external
/// payload matching the originating request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    action_id: ActionId,
    kind: IntentKind,
    reference: String,
    fields: EconomicFields,
    expires_at: Timestamp,
}

impl ActionResult {
    pub fn action_id(&self) -> ActionId {
        self.action_id
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// Opaque unsigned-transaction reference for the wallet layer.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn fields(&self) -> &EconomicFields {
        &self.fields
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Downstream consumers must reject expired proposals instead of
    /// reusing them.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }
}

/// Orchestration failures.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("intent still has open slots: {slots:?}")]
    UnresolvedIntent { slots: Vec<SlotName> },

    #[error("variant '{kind}' does not build transactions")]
    UnsupportedVariant { kind: IntentKind },

    /// The builder echoed a payload whose `{field}` differs from the
    /// request. Fatal, never retried.
    #[error("builder payload mismatch on {field}: expected {expected}, got {actual}")]
    BuilderMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("builder rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("transaction service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },
}

/// Drives the external builder with bounded retries and validates its output.
pub struct TransactionOrchestrator {
    builder: Arc<dyn TransactionBuilder>,
    retry: RetryPolicy,
}

impl TransactionOrchestrator {
    pub fn new(builder: Arc<dyn TransactionBuilder>, retry: RetryPolicy) -> Self {
        Self { builder, retry }
    }

    /// Builds and validates a transaction proposal for a resolved intent.
    pub async fn orchestrate(&self, intent: &Intent) -> Result<ActionResult, OrchestrationError> {
        let request = ActionRequest::from_intent(intent)?;
        info!(action = %request.id(), kind = %request.kind(), "requesting transaction construction");

        let payload = self
            .retry
            .call("tx-builder", || self.builder.build(&request))
            .await
            .map_err(|err| match err {
                RetryError::Fatal(BuilderError::Rejected { reason }) => {
                    OrchestrationError::Rejected { reason }
                }
                RetryError::Fatal(other) => {
                    warn!(error = %other, "builder call failed fatally");
                    OrchestrationError::ServiceUnavailable { attempts: 1 }
                }
                RetryError::Exhausted { attempts, .. } => {
                    OrchestrationError::ServiceUnavailable { attempts }
                }
            })?;

        Self::validate_payload(&request, payload)
    }

    /// Compares every economically material field before accepting the
    /// payload as an ActionResult.
    fn validate_payload(
        request: &ActionRequest,
        payload: BuilderPayload,
    ) -> Result<ActionResult, OrchestrationError> {
        let fields = request.fields();

        if payload.asset != fields.asset {
            return Err(Self::mismatch("asset", &fields.asset, &payload.asset));
        }
        if payload.amount != fields.amount {
            return Err(Self::mismatch(
                "amount",
                &format_option(&fields.amount),
                &format_option(&payload.amount),
            ));
        }
        if payload.destination != fields.destination {
            return Err(Self::mismatch(
                "destination",
                &format_option(&fields.destination),
                &format_option(&payload.destination),
            ));
        }
        if payload.counter_asset != fields.counter_asset {
            return Err(Self::mismatch(
                "counter_asset",
                &format_option(&fields.counter_asset),
                &format_option(&payload.counter_asset),
            ));
        }

        Ok(ActionResult {
            action_id: request.id(),
            kind: request.kind(),
            reference: payload.reference,
            fields: fields.clone(),
            expires_at: payload.expires_at,
        })
    }

    fn mismatch(field: &'static str, expected: &str, actual: &str) -> OrchestrationError {
        error!(field, expected, actual, "builder payload mismatch");
        OrchestrationError::BuilderMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

fn format_option<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<none>".to_string(),
    }
}

// Slot extraction guards. `is_fully_resolved` has already passed when these
// run, so a failure here means a slot resolved to the wrong value type.

fn token_slot(intent: &Intent, name: SlotName) -> Result<&TokenCandidate, OrchestrationError> {
    intent
        .slot(name)
        .and_then(Slot::value)
        .and_then(SlotValue::as_token)
        .ok_or(OrchestrationError::UnresolvedIntent { slots: vec![name] })
}

fn amount_slot(intent: &Intent) -> Result<Option<Decimal>, OrchestrationError> {
    intent
        .slot(SlotName::Amount)
        .and_then(Slot::value)
        .and_then(SlotValue::as_amount)
        .map(Some)
        .ok_or(OrchestrationError::UnresolvedIntent {
            slots: vec![SlotName::Amount],
        })
}

fn address_slot(intent: &Intent, name: SlotName) -> Result<Option<String>, OrchestrationError> {
    match intent.slot(name).and_then(Slot::value) {
        Some(SlotValue::Address(address)) => Ok(Some(address.clone())),
        _ => Err(OrchestrationError::UnresolvedIntent { slots: vec![name] }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Confidence;
    use crate::domain::intent::{Provenance, Slot};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Builder stub: echoes the request unless told to tamper or fail.
    struct StubBuilder {
        tamper_amount: Option<Decimal>,
        errors: Mutex<VecDeque<BuilderError>>,
        calls: Mutex<u32>,
        expiry_secs: u64,
    }

    impl StubBuilder {
        fn echo() -> Self {
            Self {
                tamper_amount: None,
                errors: Mutex::new(VecDeque::new()),
                calls: Mutex::new(0),
                expiry_secs: 120,
            }
        }

        fn tampering(amount: Decimal) -> Self {
            Self {
                tamper_amount: Some(amount),
                ..Self::echo()
            }
        }

        fn with_error(self, err: BuilderError) -> Self {
            self.errors.lock().unwrap().push_back(err);
            self
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TransactionBuilder for StubBuilder {
        async fn build(&self, request: &ActionRequest) -> Result<BuilderPayload, BuilderError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            let fields = request.fields();
            Ok(BuilderPayload {
                reference: format!("unsigned-tx-{}", request.id()),
                asset: fields.asset.clone(),
                amount: self.tamper_amount.or(fields.amount),
                destination: fields.destination.clone(),
                counter_asset: fields.counter_asset.clone(),
                expires_at: Timestamp::now().plus_secs(self.expiry_secs),
            })
        }
    }

    fn orchestrator_with(stub: StubBuilder) -> (TransactionOrchestrator, Arc<StubBuilder>) {
        let stub = Arc::new(stub);
        let retry = RetryPolicy::new(3, Duration::from_millis(100))
            .with_base_delay(Duration::from_millis(1));
        (
            TransactionOrchestrator::new(stub.clone(), retry),
            stub,
        )
    }

    fn usdc() -> TokenCandidate {
        TokenCandidate::new("usdc-mint", "USDC", "USD Coin", 6)
    }

    fn sol() -> TokenCandidate {
        TokenCandidate::new("sol-mint", "SOL", "Solana", 5)
    }

    fn resolved_transfer() -> Intent {
        Intent::new(
            IntentKind::Transfer,
            vec![
                Slot::resolved(
                    SlotName::Amount,
                    SlotValue::Amount(Decimal::new(5, 0)),
                    Provenance::UserStated,
                ),
                Slot::resolved(SlotName::Asset, SlotValue::Token(usdc()), Provenance::LookedUp),
                Slot::resolved(
                    SlotName::Destination,
                    SlotValue::Address("alice.sol".into()),
                    Provenance::UserStated,
                ),
            ],
            Confidence::new(0.9).unwrap(),
            "send 5 USDC to alice.sol",
        )
    }

    fn resolved_swap() -> Intent {
        Intent::new(
            IntentKind::Swap,
            vec![
                Slot::resolved(
                    SlotName::Amount,
                    SlotValue::Amount(Decimal::new(2, 0)),
                    Provenance::UserStated,
                ),
                Slot::resolved(SlotName::FromAsset, SlotValue::Token(sol()), Provenance::LookedUp),
                Slot::resolved(SlotName::ToAsset, SlotValue::Token(usdc()), Provenance::LookedUp),
            ],
            Confidence::new(0.9).unwrap(),
            "swap 2 SOL for USDC",
        )
    }

    #[test]
    fn action_request_captures_stated_values_exactly() {
        let request = ActionRequest::from_intent(&resolved_transfer()).unwrap();
        let fields = request.fields();

        assert_eq!(fields.asset, "usdc-mint");
        assert_eq!(fields.asset_symbol, "USDC");
        assert_eq!(fields.amount, Some(Decimal::new(5, 0)));
        assert_eq!(fields.destination.as_deref(), Some("alice.sol"));
        assert_eq!(fields.counter_asset, None);
    }

    #[test]
    fn swap_request_carries_both_assets() {
        let request = ActionRequest::from_intent(&resolved_swap()).unwrap();
        let fields = request.fields();

        assert_eq!(fields.asset, "sol-mint");
        assert_eq!(fields.counter_asset.as_deref(), Some("usdc-mint"));
        assert_eq!(fields.counter_symbol.as_deref(), Some("USDC"));
    }

    #[test]
    fn unresolved_intent_never_becomes_a_request() {
        let intent = Intent::new(
            IntentKind::Transfer,
            vec![Slot::stated(SlotName::Asset, "USDC")],
            Confidence::new(0.9).unwrap(),
            "send USDC",
        );

        match ActionRequest::from_intent(&intent) {
            Err(OrchestrationError::UnresolvedIntent { slots }) => {
                assert!(slots.contains(&SlotName::Amount));
                assert!(slots.contains(&SlotName::Asset));
                assert!(slots.contains(&SlotName::Destination));
            }
            other => panic!("expected unresolved error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn ranking_query_is_not_a_builder_variant() {
        let intent = Intent::new(
            IntentKind::RankingQuery,
            vec![],
            Confidence::new(0.9).unwrap(),
            "top tokens",
        );
        assert!(matches!(
            ActionRequest::from_intent(&intent),
            Err(OrchestrationError::UnsupportedVariant { .. })
        ));
    }

    #[tokio::test]
    async fn matching_payload_becomes_an_action_result() {
        let (orchestrator, stub) = orchestrator_with(StubBuilder::echo());

        let result = orchestrator.orchestrate(&resolved_transfer()).await.unwrap();

        assert!(result.reference().starts_with("unsigned-tx-"));
        assert_eq!(result.fields().amount, Some(Decimal::new(5, 0)));
        assert!(!result.is_expired(Timestamp::now()));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn tampered_amount_is_a_fatal_mismatch() {
        let (orchestrator, stub) =
            orchestrator_with(StubBuilder::tampering(Decimal::new(50, 0)));

        let result = orchestrator.orchestrate(&resolved_transfer()).await;

        match result {
            Err(OrchestrationError::BuilderMismatch {
                field, expected, actual,
            }) => {
                assert_eq!(field, "amount");
                assert_eq!(expected, "5");
                assert_eq!(actual, "50");
            }
            other => panic!("expected mismatch, got {:?}", other.map(|_| ())),
        }
        // Mismatches are never retried.
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn rejection_is_fatal_and_not_retried() {
        let (orchestrator, stub) = orchestrator_with(
            StubBuilder::echo().with_error(BuilderError::rejected("unknown asset")),
        );

        let result = orchestrator.orchestrate(&resolved_transfer()).await;
        assert!(matches!(result, Err(OrchestrationError::Rejected { .. })));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn repeated_timeouts_exhaust_into_service_unavailable() {
        let stub = StubBuilder::echo()
            .with_error(BuilderError::Timeout { timeout_secs: 1 })
            .with_error(BuilderError::Timeout { timeout_secs: 1 })
            .with_error(BuilderError::Timeout { timeout_secs: 1 });
        let (orchestrator, stub) = orchestrator_with(stub);

        let result = orchestrator.orchestrate(&resolved_transfer()).await;
        match result {
            Err(OrchestrationError::ServiceUnavailable { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected unavailability, got {:?}", other.map(|_| ())),
        }
        assert_eq!(stub.call_count(), 3);
    }

    #[tokio::test]
    async fn transient_failure_then_success_recovers() {
        let stub = StubBuilder::echo().with_error(BuilderError::unavailable("blip"));
        let (orchestrator, stub) = orchestrator_with(stub);

        let result = orchestrator.orchestrate(&resolved_transfer()).await;
        assert!(result.is_ok());
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn deterministic_builder_yields_identical_economic_fields() {
        let (orchestrator, _) = orchestrator_with(StubBuilder::echo());
        let intent = resolved_transfer();

        let first = orchestrator.orchestrate(&intent).await.unwrap();
        let second = orchestrator.orchestrate(&intent).await.unwrap();

        // Opaque references may differ; the economics may not.
        assert_eq!(first.fields(), second.fields());
        assert_ne!(first.reference(), second.reference());
    }

    #[test]
    fn expired_results_report_expiry() {
        let (_, _) = orchestrator_with(StubBuilder::echo());
        let payload = BuilderPayload {
            reference: "ref-1".into(),
            asset: "usdc-mint".into(),
            amount: Some(Decimal::new(5, 0)),
            destination: Some("alice.sol".into()),
            counter_asset: None,
            expires_at: Timestamp::now().minus_secs(1),
        };
        let request = ActionRequest::from_intent(&resolved_transfer()).unwrap();
        let result = TransactionOrchestrator::validate_payload(&request, payload).unwrap();

        assert!(result.is_expired(Timestamp::now()));
    }
}
