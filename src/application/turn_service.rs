//! TurnService - the inbound-turn call surface.
//!
//! `(session key, utterance, received at) -> outbound message`, exactly one
//! message per turn. The session guard is held for the whole turn, which
//! serializes turns per key and guarantees at most one orchestration in
//! flight per session; turns for different keys run fully in parallel.

use std::sync::Arc;
use tracing::{error, info};

use crate::domain::composer::{ResponseComposer, TurnOutcome};
use crate::domain::foundation::{SessionKey, Timestamp};
use crate::domain::intent::{
    Intent, IntentKind, IntentParser, ParseFailure, ParseOutcome, Provenance, Slot, SlotName,
    SlotValue,
};
use crate::domain::resolver::{
    is_rejection, match_candidate_choice, parse_bare_amount, Resolution, ResolveFailure,
    SlotResolver,
};
use crate::domain::orchestrator::{OrchestrationError, TransactionOrchestrator};
use crate::domain::session::{DialogState, Session, TerminalOutcome, Turn};
use crate::ports::{MarketDataProvider, RetryError, RetryPolicy, SessionRepository};

/// Coordinates the pipeline stages for one conversation turn.
pub struct TurnService {
    sessions: Arc<dyn SessionRepository>,
    parser: IntentParser,
    resolver: SlotResolver,
    orchestrator: TransactionOrchestrator,
    market: Arc<dyn MarketDataProvider>,
    market_retry: RetryPolicy,
    composer: ResponseComposer,
}

impl TurnService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        parser: IntentParser,
        resolver: SlotResolver,
        orchestrator: TransactionOrchestrator,
        market: Arc<dyn MarketDataProvider>,
        market_retry: RetryPolicy,
    ) -> Self {
        Self {
            sessions,
            parser,
            resolver,
            orchestrator,
            market,
            market_retry,
            composer: ResponseComposer::new(),
        }
    }

    /// Handles one inbound turn and returns the single outbound message.
    ///
    /// This is the only call surface the transport layer uses.
    pub async fn handle_turn(
        &self,
        key: &SessionKey,
        utterance: &str,
        received_at: Timestamp,
    ) -> String {
        let mut session = self.sessions.get(key).await;
        info!(session = %key, state = ?session.state(), "turn received");

        session.record_turn(Turn::user(utterance, received_at));

        let outcome = self.run_pipeline(&mut session, utterance).await;
        let message = self.composer.compose(&outcome, Timestamp::now());

        session.record_turn(Turn::assistant(&message, Timestamp::now()));
        message
    }

    async fn run_pipeline(&self, session: &mut Session, utterance: &str) -> TurnOutcome {
        // Short replies answering an outstanding clarification skip the
        // language-understanding round-trip entirely.
        if session.state() == DialogState::Collecting {
            if let Some(outcome) = self.try_reply_shortcut(session, utterance).await {
                return outcome;
            }
        }

        let parsed = match self.parser.parse(utterance, session).await {
            Ok(parsed) => parsed,
            Err(ParseFailure::ServiceUnavailable { attempts }) => {
                info!(attempts, "parse gave up; ending turn");
                conclude_error(session);
                return TurnOutcome::ServiceUnavailable;
            }
        };

        match parsed {
            ParseOutcome::Conversational(text) => TurnOutcome::Conversational(text),
            // Prior progress, if any, stays untouched for the next attempt.
            ParseOutcome::Unrecognized => TurnOutcome::Unrecognized,
            ParseOutcome::LowConfidence(intent) => TurnOutcome::ConfirmRephrase {
                kind: intent.kind(),
            },
            ParseOutcome::Intent(intent) => {
                if session.state() == DialogState::Empty {
                    if let Err(err) = session.transition(DialogState::Collecting) {
                        error!(error = %err, "state machine refused Collecting");
                        conclude_error(session);
                        return TurnOutcome::ServiceUnavailable;
                    }
                }
                self.resolve_and_execute(session, intent).await
            }
        }
    }

    /// Interprets rejections, candidate choices, and bare amounts while a
    /// clarification is outstanding. Returns None to fall through to a full
    /// parse.
    async fn try_reply_shortcut(
        &self,
        session: &mut Session,
        utterance: &str,
    ) -> Option<TurnOutcome> {
        let pending = session.pending_intent()?.clone();

        if is_rejection(utterance) {
            conclude_error(session);
            return Some(TurnOutcome::IntentAbandoned);
        }

        if let Some(slot_name) = pending.ambiguous_required().first().copied() {
            let candidates = pending.slot(slot_name).and_then(Slot::candidates)?;
            if let Some(choice) = match_candidate_choice(utterance, candidates) {
                let updated = pending.with_slot(Slot::resolved(
                    slot_name,
                    SlotValue::Token(choice.clone()),
                    Provenance::LookedUp,
                ));
                return Some(self.resolve_and_execute(session, updated).await);
            }
            return None;
        }

        if pending.unfilled_required().contains(&SlotName::Amount) {
            if let Some(amount) = parse_bare_amount(utterance) {
                let updated = pending.with_slot(Slot::resolved(
                    SlotName::Amount,
                    SlotValue::Amount(amount),
                    Provenance::UserStated,
                ));
                return Some(self.resolve_and_execute(session, updated).await);
            }
        }

        None
    }

    async fn resolve_and_execute(&self, session: &mut Session, intent: Intent) -> TurnOutcome {
        match self.resolver.resolve(intent).await {
            Err(ResolveFailure::ServiceUnavailable { attempts }) => {
                info!(attempts, "resolution gave up; ending turn");
                conclude_error(session);
                TurnOutcome::ServiceUnavailable
            }
            Ok(Resolution::NeedsClarification { intent, requests }) => {
                // Persist the partial progress and stay in Collecting.
                if let Err(err) = session.transition(DialogState::Collecting) {
                    error!(error = %err, "state machine refused Collecting loop");
                }
                session.set_pending_intent(intent);
                TurnOutcome::Clarification { requests }
            }
            Ok(Resolution::Complete(intent)) => {
                session.set_pending_intent(intent.clone());
                if let Err(err) = session.transition(DialogState::Resolved) {
                    error!(error = %err, "state machine refused Resolved");
                    conclude_error(session);
                    return TurnOutcome::ServiceUnavailable;
                }

                if intent.kind() == IntentKind::RankingQuery {
                    self.run_ranking(session, &intent).await
                } else {
                    self.run_builder(session, &intent).await
                }
            }
        }
    }

    async fn run_builder(&self, session: &mut Session, intent: &Intent) -> TurnOutcome {
        if let Err(err) = session.transition(DialogState::Orchestrating) {
            error!(error = %err, "state machine refused Orchestrating");
            conclude_error(session);
            return TurnOutcome::ServiceUnavailable;
        }

        match self.orchestrator.orchestrate(intent).await {
            Ok(result) => {
                if result.is_expired(Timestamp::now()) {
                    conclude_error(session);
                    return TurnOutcome::ProposalExpired;
                }
                conclude_success(session);
                TurnOutcome::Proposal(result)
            }
            Err(OrchestrationError::BuilderMismatch { field, .. }) => {
                error!(field, "builder mismatch; clearing session");
                conclude_error(session);
                TurnOutcome::BuilderMismatch
            }
            Err(OrchestrationError::Rejected { reason }) => {
                info!(%reason, "builder rejected request");
                conclude_error(session);
                TurnOutcome::BuilderRejected
            }
            Err(OrchestrationError::ServiceUnavailable { attempts }) => {
                info!(attempts, "builder unavailable; ending turn");
                conclude_error(session);
                TurnOutcome::ServiceUnavailable
            }
            Err(err) => {
                // UnresolvedIntent / UnsupportedVariant cannot happen for a
                // Complete resolution; treat as an internal fault.
                error!(error = %err, "unexpected orchestration failure");
                conclude_error(session);
                TurnOutcome::ServiceUnavailable
            }
        }
    }

    async fn run_ranking(&self, session: &mut Session, intent: &Intent) -> TurnOutcome {
        let count = intent
            .slot(SlotName::Count)
            .and_then(Slot::value)
            .and_then(|v| match v {
                SlotValue::Count(c) => Some(*c),
                _ => None,
            })
            .unwrap_or(10);
        let window = intent
            .slot(SlotName::Window)
            .and_then(Slot::value)
            .and_then(|v| match v {
                SlotValue::Window(w) => Some(*w),
                _ => None,
            })
            .unwrap_or_default();

        let listings = self
            .market_retry
            .call("market-data", || self.market.top_ranked(count, window))
            .await;

        match listings {
            Ok(listings) => {
                conclude_success(session);
                TurnOutcome::RankingReport { window, listings }
            }
            Err(RetryError::Fatal(err)) => {
                error!(error = %err, "ranking lookup failed fatally");
                conclude_error(session);
                TurnOutcome::ServiceUnavailable
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                info!(attempts, "ranking lookup gave up; ending turn");
                conclude_error(session);
                TurnOutcome::ServiceUnavailable
            }
        }
    }
}

/// Terminal(success): clear the pending intent, back to Empty.
fn conclude_success(session: &mut Session) {
    if session.state() != DialogState::Empty {
        if let Err(err) = session.finish(TerminalOutcome::Success) {
            error!(error = %err, "failed to conclude session");
        }
    }
}

/// Terminal(error): clear the pending intent, back to Empty. A session that
/// never left Empty has nothing to clear.
fn conclude_error(session: &mut Session) {
    if session.state() != DialogState::Empty {
        if let Err(err) = session.finish(TerminalOutcome::Error) {
            error!(error = %err, "failed to conclude session");
        }
    }
}
