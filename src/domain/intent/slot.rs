//! Slot - a single named parameter of an intent.
//!
//! Each slot tracks its fill-state (unfilled, resolved, or ambiguous with
//! ranked candidates) and the provenance of its value, so the pipeline can
//! distinguish what the user said from what a lookup or a default supplied.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the parameters an intent variant can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Amount,
    Asset,
    FromAsset,
    ToAsset,
    Destination,
    Count,
    Window,
}

impl SlotName {
    /// Stable wire name, matching the extraction schema's parameter keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Amount => "amount",
            SlotName::Asset => "asset",
            SlotName::FromAsset => "from_asset",
            SlotName::ToAsset => "to_asset",
            SlotName::Destination => "destination",
            SlotName::Count => "count",
            SlotName::Window => "window",
        }
    }

    /// Parses a wire name back into a slot name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "amount" => Some(SlotName::Amount),
            "asset" => Some(SlotName::Asset),
            "from_asset" => Some(SlotName::FromAsset),
            "to_asset" => Some(SlotName::ToAsset),
            "destination" => Some(SlotName::Destination),
            "count" => Some(SlotName::Count),
            "window" => Some(SlotName::Window),
            _ => None,
        }
    }

    /// True for slots that hold a token/asset identifier and therefore go
    /// through the market-data lookup.
    pub fn is_token(&self) -> bool {
        matches!(
            self,
            SlotName::Asset | SlotName::FromAsset | SlotName::ToAsset
        )
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time range for ranking queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
    Month,
}

impl TimeWindow {
    /// Parses the wire form ("day" | "week" | "month").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(TimeWindow::Day),
            "week" => Some(TimeWindow::Week),
            "month" => Some(TimeWindow::Month),
            _ => None,
        }
    }
}

/// One entry from the market-data/ranking service.
///
/// `rank` is the market-cap rank; lower numbers are larger assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCandidate {
    /// Chain-level identifier (mint address or equivalent).
    pub identifier: String,
    /// Ticker symbol as listed.
    pub symbol: String,
    /// Human-readable name.
    pub display_name: String,
    /// Market rank, 1 is the top asset.
    pub rank: u32,
}

impl TokenCandidate {
    pub fn new(
        identifier: impl Into<String>,
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        rank: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            symbol: symbol.into(),
            display_name: display_name.into(),
            rank,
        }
    }
}

/// A resolved slot value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum SlotValue {
    Amount(Decimal),
    Token(TokenCandidate),
    Address(String),
    Count(u32),
    Window(TimeWindow),
}

impl SlotValue {
    /// Returns the resolved token, if this value is one.
    pub fn as_token(&self) -> Option<&TokenCandidate> {
        match self {
            SlotValue::Token(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the amount, if this value is one.
    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            SlotValue::Amount(a) => Some(*a),
            _ => None,
        }
    }
}

/// Where a slot's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Stated by the user in an utterance.
    UserStated,
    /// Resolved through the market-data lookup.
    LookedUp,
    /// Filled with a variant default, never overriding a stated value.
    Defaulted,
}

/// Fill-state of a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SlotState {
    /// Nothing usable yet. `hint` carries the user's raw text (e.g. a token
    /// symbol awaiting lookup) when there is one.
    Unfilled { hint: Option<String> },
    /// A final value with its provenance.
    Resolved {
        value: SlotValue,
        provenance: Provenance,
    },
    /// Multiple market matches, ranked lowest rank number first. The first
    /// candidate is offered as the default; the rest are kept for a
    /// follow-up choice.
    Ambiguous { candidates: Vec<TokenCandidate> },
}

/// A named parameter with its current fill-state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: SlotName,
    pub state: SlotState,
}

impl Slot {
    /// An empty slot.
    pub fn unfilled(name: SlotName) -> Self {
        Self {
            name,
            state: SlotState::Unfilled { hint: None },
        }
    }

    /// A slot holding the user's raw text, pending resolution.
    pub fn stated(name: SlotName, hint: impl Into<String>) -> Self {
        Self {
            name,
            state: SlotState::Unfilled {
                hint: Some(hint.into()),
            },
        }
    }

    /// A resolved slot.
    pub fn resolved(name: SlotName, value: SlotValue, provenance: Provenance) -> Self {
        Self {
            name,
            state: SlotState::Resolved { value, provenance },
        }
    }

    /// An ambiguous token slot. Candidates must already be ranked.
    pub fn ambiguous(name: SlotName, candidates: Vec<TokenCandidate>) -> Self {
        Self {
            name,
            state: SlotState::Ambiguous { candidates },
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, SlotState::Resolved { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.state, SlotState::Ambiguous { .. })
    }

    pub fn is_unfilled(&self) -> bool {
        matches!(self.state, SlotState::Unfilled { .. })
    }

    /// The raw lookup hint, if this slot is unfilled and carries one.
    pub fn hint(&self) -> Option<&str> {
        match &self.state {
            SlotState::Unfilled { hint } => hint.as_deref(),
            _ => None,
        }
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<&SlotValue> {
        match &self.state {
            SlotState::Resolved { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The retained candidates, if this slot is ambiguous.
    pub fn candidates(&self) -> Option<&[TokenCandidate]> {
        match &self.state {
            SlotState::Ambiguous { candidates } => Some(candidates),
            _ => None,
        }
    }
}
