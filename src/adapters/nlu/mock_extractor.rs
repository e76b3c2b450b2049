//! Deterministic mock of the language-understanding service.
//!
//! Interprets a small command grammar with fixed rules so tests and local
//! development run without API credentials. The grammar mirrors what the
//! real model is prompted to do: emit a tool call with only the parameters
//! the user actually stated, or answer conversationally.
//!
//! Deterministic knobs:
//! - hedged phrasing ("maybe ...", trailing "?") lowers the reported
//!   confidence under any reasonable threshold
//! - unsupported verbs ("stake", "burn", "mint") produce a tool call with
//!   that verb as the variant tag, which the parser rejects as unrecognized

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Mutex;

use crate::ports::{ExtractionReply, ExtractionRequest, ExtractorError, IntentExtractor};

const GREETING_REPLY: &str = "Hello! I can send tokens, swap them, check balances, or show \
    you the top-ranked tokens. Try 'send 5 USDC to alice.sol'.";

const UNSUPPORTED_VERBS: [&str; 3] = ["stake", "burn", "mint"];

/// Rule-based extractor standing in for the real service.
#[derive(Debug, Default)]
pub struct MockIntentExtractor {
    calls: Mutex<Vec<ExtractionRequest>>,
}

impl MockIntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of extraction calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IntentExtractor for MockIntentExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionReply, ExtractorError> {
        let reply = interpret(&request.utterance);
        self.calls.lock().unwrap().push(request);
        Ok(reply)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn interpret(utterance: &str) -> ExtractionReply {
    let words: Vec<String> = utterance
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '.').to_string())
        .filter(|w| !w.is_empty())
        .collect();
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let confidence = if lower.iter().any(|w| w == "maybe" || w == "perhaps")
        || utterance.trim_end().ends_with('?') && !lower.iter().any(|w| w == "balance")
    {
        0.45
    } else {
        0.9
    };

    if let Some(verb) = lower
        .iter()
        .find(|w| UNSUPPORTED_VERBS.contains(&w.as_str()))
    {
        return tool_call(verb, confidence, Map::new());
    }

    if let Some(i) = position(&lower, &["send", "transfer"]) {
        return transfer(&words, &lower, i, confidence);
    }
    if let Some(i) = position(&lower, &["swap", "exchange"]) {
        return swap(&words, &lower, i, confidence);
    }
    if lower.iter().any(|w| w == "balance") {
        return balance(&words, &lower, confidence);
    }
    if position(&lower, &["top", "ranking", "rankings", "trending"]).is_some() {
        return ranking(&lower, confidence);
    }

    ExtractionReply::Conversational(GREETING_REPLY.to_string())
}

fn transfer(words: &[String], lower: &[String], verb_at: usize, confidence: f64) -> ExtractionReply {
    let mut params = Map::new();

    let amount_at = (verb_at + 1..words.len()).find(|&i| parse_number(&lower[i]).is_some());
    if let Some(i) = amount_at {
        // parse_number succeeded for this index above
        if let Some(n) = parse_number(&lower[i]) {
            params.insert("amount".to_string(), n);
        }
    }

    // The asset is the first non-numeric word after the amount (or verb),
    // before any "to <destination>" clause.
    let to_at = lower.iter().position(|w| w == "to");
    let asset_from = amount_at.unwrap_or(verb_at) + 1;
    if let Some(asset) = (asset_from..to_at.unwrap_or(words.len()))
        .find(|&i| parse_number(&lower[i]).is_none())
        .map(|i| words[i].clone())
    {
        params.insert("asset".to_string(), Value::String(asset));
    }

    if let Some(i) = to_at {
        if i + 1 < words.len() {
            params.insert("destination".to_string(), Value::String(words[i + 1].clone()));
        }
    }

    tool_call("transfer", confidence, params)
}

fn swap(words: &[String], lower: &[String], verb_at: usize, confidence: f64) -> ExtractionReply {
    let mut params = Map::new();
    let pivot = lower.iter().position(|w| w == "for" || w == "into");

    if let Some(n) = (verb_at + 1..pivot.unwrap_or(words.len()))
        .find_map(|i| parse_number(&lower[i]))
    {
        params.insert("amount".to_string(), n);
    }

    if let Some(p) = pivot {
        // Source asset: last non-numeric word before the pivot.
        if let Some(from) = (verb_at + 1..p)
            .rev()
            .find(|&i| parse_number(&lower[i]).is_none() && lower[i] != "some")
            .map(|i| words[i].clone())
        {
            params.insert("from_asset".to_string(), Value::String(from));
        }
        if p + 1 < words.len() {
            params.insert("to_asset".to_string(), Value::String(words[p + 1].clone()));
        }
    }

    tool_call("swap", confidence, params)
}

fn balance(words: &[String], lower: &[String], confidence: f64) -> ExtractionReply {
    let mut params = Map::new();
    let balance_at = lower.iter().position(|w| w == "balance");

    let asset = lower
        .iter()
        .position(|w| w == "of")
        .and_then(|i| words.get(i + 1))
        .cloned()
        .or_else(|| {
            // "SOL balance" - the word right before "balance".
            balance_at
                .filter(|&i| i > 0)
                .map(|i| words[i - 1].clone())
                .filter(|w| {
                    let l = w.to_lowercase();
                    l != "my" && l != "the" && l != "a"
                })
        });

    if let Some(asset) = asset {
        params.insert("asset".to_string(), Value::String(asset));
    }

    tool_call("balance_query", confidence, params)
}

fn ranking(lower: &[String], confidence: f64) -> ExtractionReply {
    let mut params = Map::new();

    if let Some(count) = lower.iter().find_map(|w| w.parse::<u32>().ok()) {
        params.insert("count".to_string(), json!(count));
    }
    if lower.iter().any(|w| w == "week" || w == "weekly") {
        params.insert("window".to_string(), json!("week"));
    } else if lower.iter().any(|w| w == "month" || w == "monthly") {
        params.insert("window".to_string(), json!("month"));
    }

    tool_call("ranking_query", confidence, params)
}

fn tool_call(intent: &str, confidence: f64, parameters: Map<String, Value>) -> ExtractionReply {
    ExtractionReply::ToolCall {
        arguments: json!({
            "intent": intent,
            "confidence": confidence,
            "parameters": Value::Object(parameters),
        }),
    }
}

fn position(lower: &[String], verbs: &[&str]) -> Option<usize> {
    lower.iter().position(|w| verbs.contains(&w.as_str()))
}

fn parse_number(word: &str) -> Option<Value> {
    if let Ok(n) = word.parse::<u64>() {
        return Some(json!(n));
    }
    word.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| json!(f))
}
