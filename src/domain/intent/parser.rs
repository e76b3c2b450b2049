//! Intent Parser - one structured-extraction call, strictly validated.
//!
//! The language-understanding service is asked to invoke a single extraction
//! tool whose arguments must conform to [`intent_schema`]. Whatever comes
//! back is validated into the closed [`IntentKind`] set here; any deviation -
//! unknown variant, unknown parameter, wrong type, out-of-range confidence -
//! makes the whole turn `Unrecognized`. Partial output is never trusted.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::foundation::Confidence;
use crate::domain::session::{Session, Speaker};
use crate::ports::{
    ExtractionReply, ExtractionRequest, ExtractorError, HistoryTurn, IntentExtractor, RetryError,
    RetryPolicy,
};

use super::intent::{Intent, IntentKind};
use super::slot::{Provenance, Slot, SlotName, SlotValue, TimeWindow};

/// The strict output schema declared to the language-understanding service.
///
/// `additionalProperties: false` at both levels is what lets the validator
/// below reject anything the model invents.
pub fn intent_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": ["transfer", "swap", "balance_query", "ranking_query"]
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0
            },
            "parameters": {
                "type": "object",
                "properties": {
                    "amount": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "description": "Amount of the primary asset, as stated by the user"
                    },
                    "asset": {
                        "type": "string",
                        "description": "Token symbol for transfers and balance queries"
                    },
                    "from_asset": {
                        "type": "string",
                        "description": "Token symbol being sold in a swap"
                    },
                    "to_asset": {
                        "type": "string",
                        "description": "Token symbol being bought in a swap"
                    },
                    "destination": {
                        "type": "string",
                        "description": "Destination address or name"
                    },
                    "count": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "How many entries a ranking query should return"
                    },
                    "window": {
                        "type": "string",
                        "enum": ["day", "week", "month"],
                        "description": "Time range for a ranking query"
                    }
                },
                "additionalProperties": false
            }
        },
        "required": ["intent", "confidence"],
        "additionalProperties": false
    })
}

/// The raw tool arguments, before semantic validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExtraction {
    intent: String,
    confidence: f64,
    #[serde(default)]
    parameters: serde_json::Map<String, Value>,
}

/// What one parse produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A conformant intent at or above the confidence threshold, already
    /// merged with the session's pending intent where the kinds matched.
    Intent(Intent),
    /// Conformant but below the threshold: ask, do not act. Not merged and
    /// not meant to be persisted.
    LowConfidence(Intent),
    /// The service answered in prose instead of invoking the tool.
    Conversational(String),
    /// Non-conformant output or an unsupported instruction.
    Unrecognized,
}

/// Parse-level failures that are not recoverable into an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("language-understanding service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },
}

/// Converts utterances into typed intents via the extraction port.
pub struct IntentParser {
    extractor: Arc<dyn IntentExtractor>,
    retry: RetryPolicy,
    confidence_threshold: f64,
}

impl IntentParser {
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        retry: RetryPolicy,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            extractor,
            retry,
            confidence_threshold,
        }
    }

    /// Parses `utterance` in the context of `session`.
    ///
    /// Pending-intent refinement: a conformant extraction of the same kind as
    /// the pending intent merges into it; a different kind replaces it. The
    /// caller persists whichever intent comes back.
    pub async fn parse(
        &self,
        utterance: &str,
        session: &Session,
    ) -> Result<ParseOutcome, ParseFailure> {
        let history = session
            .history()
            .map(|turn| match turn.speaker {
                Speaker::User => HistoryTurn::user(&turn.text),
                Speaker::Assistant => HistoryTurn::assistant(&turn.text),
            })
            .collect();
        let request = ExtractionRequest::new(utterance, intent_schema()).with_history(history);

        let reply = match self
            .retry
            .call("language-understanding", || {
                self.extractor.extract(request.clone())
            })
            .await
        {
            Ok(reply) => reply,
            // Undecodable provider output is a local ParseError, recovered
            // as Unrecognized rather than surfaced as an outage.
            Err(RetryError::Fatal(ExtractorError::MalformedResponse(reason))) => {
                warn!(provider = self.extractor.name(), %reason, "malformed extractor response");
                return Ok(ParseOutcome::Unrecognized);
            }
            Err(RetryError::Fatal(err)) => {
                warn!(provider = self.extractor.name(), error = %err, "extractor call failed");
                return Err(ParseFailure::ServiceUnavailable { attempts: 1 });
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                return Err(ParseFailure::ServiceUnavailable { attempts });
            }
        };

        let arguments = match reply {
            ExtractionReply::Conversational(text) => {
                return Ok(ParseOutcome::Conversational(text))
            }
            ExtractionReply::ToolCall { arguments } => arguments,
        };

        let candidate = match validate_extraction(arguments, utterance) {
            Some(intent) => intent,
            None => return Ok(ParseOutcome::Unrecognized),
        };

        if !candidate.confidence().meets(self.confidence_threshold) {
            debug!(
                kind = %candidate.kind(),
                confidence = %candidate.confidence(),
                threshold = self.confidence_threshold,
                "extraction below confidence threshold"
            );
            return Ok(ParseOutcome::LowConfidence(candidate));
        }

        let intent = match session.pending_intent() {
            Some(pending) if pending.kind() == candidate.kind() => {
                pending.merged_with(&candidate)
            }
            _ => candidate,
        };

        Ok(ParseOutcome::Intent(intent))
    }
}

/// Validates raw tool arguments into an [`Intent`]. None means the output
/// failed schema validation and the turn is `Unrecognized`.
fn validate_extraction(arguments: Value, utterance: &str) -> Option<Intent> {
    let raw: RawExtraction = serde_json::from_value(arguments).ok()?;
    let kind = IntentKind::parse(&raw.intent)?;
    let confidence = Confidence::new(raw.confidence).ok()?;

    let mut slots = Vec::with_capacity(raw.parameters.len());
    for (key, value) in &raw.parameters {
        let name = SlotName::parse(key)?;
        if !variant_accepts(kind, name) {
            return None;
        }
        slots.push(slot_from_value(name, value)?);
    }

    Some(Intent::new(kind, slots, confidence, utterance))
}

/// A parameter is only conformant if the variant declares it.
fn variant_accepts(kind: IntentKind, name: SlotName) -> bool {
    kind.required_slots().contains(&name) || kind.defaultable_slots().contains(&name)
}

fn slot_from_value(name: SlotName, value: &Value) -> Option<Slot> {
    match name {
        SlotName::Amount => {
            let amount = decimal_from_value(value)?;
            if amount <= Decimal::ZERO {
                return None;
            }
            Some(Slot::resolved(
                name,
                SlotValue::Amount(amount),
                Provenance::UserStated,
            ))
        }
        SlotName::Asset | SlotName::FromAsset | SlotName::ToAsset => {
            let symbol = non_empty_str(value)?;
            Some(Slot::stated(name, symbol))
        }
        SlotName::Destination => {
            let address = non_empty_str(value)?;
            Some(Slot::resolved(
                name,
                SlotValue::Address(address.to_string()),
                Provenance::UserStated,
            ))
        }
        SlotName::Count => {
            let count = value.as_u64().filter(|c| (1..=100).contains(c))?;
            Some(Slot::resolved(
                name,
                SlotValue::Count(count as u32),
                Provenance::UserStated,
            ))
        }
        SlotName::Window => {
            let window = TimeWindow::parse(value.as_str()?)?;
            Some(Slot::resolved(
                name,
                SlotValue::Window(window),
                Provenance::UserStated,
            ))
        }
    }
}

/// Accepts JSON numbers and numeric strings; anything else is nonconformant.
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    let s = value.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
