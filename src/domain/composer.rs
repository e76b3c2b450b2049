//! Response Composer - one outbound message per turn.
//!
//! A pure mapping from the pipeline's outcome to a single user-facing string.
//! Stateless, never calls an external service, and never leaks raw service
//! errors: every failure arrives here already shaped into a variant with a
//! composed message of its own.

use crate::domain::foundation::Timestamp;
use crate::domain::intent::{IntentKind, SlotName, TimeWindow, TokenCandidate};
use crate::domain::orchestrator::ActionResult;
use crate::domain::resolver::{ClarificationReason, ClarificationRequest};

/// Everything a turn can end in.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// A validated, unsigned transaction proposal.
    Proposal(ActionResult),
    /// Ranking query answer.
    RankingReport {
        window: TimeWindow,
        listings: Vec<TokenCandidate>,
    },
    /// One or more slots need the user's help.
    Clarification { requests: Vec<ClarificationRequest> },
    /// The extraction was plausible but under the confidence threshold.
    ConfirmRephrase { kind: IntentKind },
    /// The language-understanding service answered in prose.
    Conversational(String),
    /// Nothing recognizable; includes unsupported instructions.
    Unrecognized,
    /// The user turned down the pending request.
    IntentAbandoned,
    /// A dependency stayed down through every retry.
    ServiceUnavailable,
    /// The builder declined the request outright.
    BuilderRejected,
    /// The builder's payload contradicted the request; nothing was kept.
    BuilderMismatch,
    /// A previously issued proposal is past its validity window.
    ProposalExpired,
}

/// Maps outcomes to messages. Construction is free; the composer holds no
/// state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// The single outbound message for this turn. `now` is only used to
    /// phrase the remaining validity of a proposal.
    pub fn compose(&self, outcome: &TurnOutcome, now: Timestamp) -> String {
        match outcome {
            TurnOutcome::Proposal(result) => compose_proposal(result, now),
            TurnOutcome::RankingReport { window, listings } => {
                compose_ranking(*window, listings)
            }
            TurnOutcome::Clarification { requests } => compose_clarification(requests),
            TurnOutcome::ConfirmRephrase { kind } => format!(
                "It sounds like you want a {}, but I'm not confident I got the details right. \
                 Could you rephrase with a bit more detail?",
                kind_phrase(*kind)
            ),
            TurnOutcome::Conversational(text) => text.clone(),
            TurnOutcome::Unrecognized => {
                "❌ Sorry, I couldn't map that to something I can do. Try something like \
                 'send 5 USDC to alice.sol' or 'swap 2 SOL for USDC'."
                    .to_string()
            }
            TurnOutcome::IntentAbandoned => {
                "Okay, I've dropped that request. What would you like to do instead?".to_string()
            }
            TurnOutcome::ServiceUnavailable => {
                "😔 A service I depend on is not responding right now. Nothing was prepared - \
                 please try again in a moment."
                    .to_string()
            }
            TurnOutcome::BuilderRejected => {
                "❌ The transaction service declined this request, so nothing was prepared. \
                 Please check the details and send it again."
                    .to_string()
            }
            TurnOutcome::BuilderMismatch => {
                "⚠️ The transaction service returned details that do not match what you asked \
                 for, so I discarded its response. No transaction was prepared and nothing \
                 will be signed. Please send your request again."
                    .to_string()
            }
            TurnOutcome::ProposalExpired => {
                "This proposal has expired. Please send your request again.".to_string()
            }
        }
    }
}

fn compose_proposal(result: &ActionResult, now: Timestamp) -> String {
    let fields = result.fields();
    let summary = match result.kind() {
        IntentKind::Transfer => format!(
            "send {} {} to {}",
            format_amount(fields.amount),
            fields.asset_symbol,
            fields.destination.as_deref().unwrap_or("the destination")
        ),
        IntentKind::Swap => format!(
            "swap {} {} for {}",
            format_amount(fields.amount),
            fields.asset_symbol,
            fields.counter_symbol.as_deref().unwrap_or("the target token")
        ),
        IntentKind::BalanceQuery => format!("check your {} balance", fields.asset_symbol),
        IntentKind::RankingQuery => "complete your request".to_string(),
    };

    let validity_secs = result.expires_at().secs_since(&now);
    format!(
        "✅ Ready to {}. Open your wallet and confirm within the next {} - reference: {}",
        summary,
        format_validity(validity_secs),
        result.reference()
    )
}

fn compose_ranking(window: TimeWindow, listings: &[TokenCandidate]) -> String {
    let period = match window {
        TimeWindow::Day => "past day",
        TimeWindow::Week => "past week",
        TimeWindow::Month => "past month",
    };

    if listings.is_empty() {
        return format!("I couldn't find any ranked tokens for the {}.", period);
    }

    let mut lines = vec![format!("📈 Top {} tokens ({}):", listings.len(), period)];
    for (i, token) in listings.iter().enumerate() {
        lines.push(format!(
            "{}. {} - {} (rank {})",
            i + 1,
            token.symbol,
            token.display_name,
            token.rank
        ));
    }
    lines.join("\n")
}

fn compose_clarification(requests: &[ClarificationRequest]) -> String {
    let mut lines = Vec::new();

    let missing: Vec<&ClarificationRequest> = requests
        .iter()
        .filter(|r| r.reason == ClarificationReason::Missing)
        .collect();
    if !missing.is_empty() {
        let named: Vec<&str> = missing.iter().map(|r| slot_phrase(r.slot)).collect();
        lines.push(format!("To continue, please tell me {}.", named.join(" and ")));
    }

    for request in requests {
        match &request.reason {
            ClarificationReason::Missing => {}
            ClarificationReason::UnknownToken { query } => {
                lines.push(format!(
                    "I couldn't find a token matching '{}'. Try a different symbol for {}.",
                    query,
                    slot_phrase(request.slot)
                ));
            }
            ClarificationReason::Ambiguous { candidates } => {
                lines.push(format!(
                    "Several tokens match for {}:",
                    slot_phrase(request.slot)
                ));
                for (i, c) in candidates.iter().enumerate() {
                    lines.push(format!(
                        "{}. {} - {} (rank {})",
                        i + 1,
                        c.symbol,
                        c.display_name,
                        c.rank
                    ));
                }
                lines.push(
                    "Reply with a number or symbol; 1 is what I'd pick.".to_string(),
                );
            }
        }
    }

    lines.join("\n")
}

fn slot_phrase(name: SlotName) -> &'static str {
    match name {
        SlotName::Amount => "the amount",
        SlotName::Asset => "the token",
        SlotName::FromAsset => "the token to sell",
        SlotName::ToAsset => "the token to buy",
        SlotName::Destination => "the destination address",
        SlotName::Count => "how many entries you want",
        SlotName::Window => "the time range",
    }
}

fn kind_phrase(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Transfer => "transfer",
        IntentKind::Swap => "swap",
        IntentKind::BalanceQuery => "balance check",
        IntentKind::RankingQuery => "market ranking",
    }
}

fn format_amount(amount: Option<rust_decimal::Decimal>) -> String {
    match amount {
        Some(a) => a.normalize().to_string(),
        None => "some".to_string(),
    }
}

fn format_validity(secs: u64) -> String {
    if secs >= 120 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs.max(1))
    }
}
