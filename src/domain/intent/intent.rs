//! Intent - a tagged variant over the supported action kinds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::foundation::Confidence;

use super::slot::{Slot, SlotName};

/// The closed set of action kinds the pipeline understands.
///
/// Anything the language-understanding service tags outside this set is
/// `Unrecognized`; the pipeline never guesses at unsupported instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Send an amount of one asset to a destination address.
    Transfer,
    /// Exchange an amount of one asset for another.
    Swap,
    /// Ask for the balance of one asset.
    BalanceQuery,
    /// Ask for the top-ranked assets over a time window.
    RankingQuery,
}

impl IntentKind {
    /// Wire tag, matching the extraction schema's variant enum.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Transfer => "transfer",
            IntentKind::Swap => "swap",
            IntentKind::BalanceQuery => "balance_query",
            IntentKind::RankingQuery => "ranking_query",
        }
    }

    /// Parses a wire tag back into a kind.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "transfer" => Some(IntentKind::Transfer),
            "swap" => Some(IntentKind::Swap),
            "balance_query" => Some(IntentKind::BalanceQuery),
            "ranking_query" => Some(IntentKind::RankingQuery),
            _ => None,
        }
    }

    /// The parameters this variant must have resolved before orchestration.
    pub fn required_slots(&self) -> &'static [SlotName] {
        match self {
            IntentKind::Transfer => &[SlotName::Amount, SlotName::Asset, SlotName::Destination],
            IntentKind::Swap => &[SlotName::Amount, SlotName::FromAsset, SlotName::ToAsset],
            IntentKind::BalanceQuery => &[SlotName::Asset],
            IntentKind::RankingQuery => &[SlotName::Count, SlotName::Window],
        }
    }

    /// Slots the resolver may fill with a default when the user stayed silent.
    /// Defaults never override a stated value.
    pub fn defaultable_slots(&self) -> &'static [SlotName] {
        match self {
            IntentKind::RankingQuery => &[SlotName::Count, SlotName::Window],
            _ => &[],
        }
    }

    /// True for variants that produce an ActionRequest for the
    /// transaction-construction service. Ranking queries are answered from
    /// market data and never reach the builder.
    pub fn requires_builder(&self) -> bool {
        !matches!(self, IntentKind::RankingQuery)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured, typed candidate action derived from one or more utterances.
///
/// Immutable once constructed: refinement produces a new Intent via
/// [`Intent::merged_with`] or [`Intent::with_slot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    kind: IntentKind,
    slots: HashMap<SlotName, Slot>,
    confidence: Confidence,
    utterance: String,
}

impl Intent {
    /// Creates an intent. Required slots absent from `slots` are added as
    /// unfilled so the resolver and composer always see the full set.
    pub fn new(
        kind: IntentKind,
        slots: Vec<Slot>,
        confidence: Confidence,
        utterance: impl Into<String>,
    ) -> Self {
        let mut map: HashMap<SlotName, Slot> =
            slots.into_iter().map(|s| (s.name, s)).collect();
        for name in kind.required_slots() {
            map.entry(*name).or_insert_with(|| Slot::unfilled(*name));
        }
        Self {
            kind,
            slots: map,
            confidence,
            utterance: utterance.into(),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    pub fn slot(&self, name: SlotName) -> Option<&Slot> {
        self.slots.get(&name)
    }

    /// All slots, keyed by name. Order is not meaningful.
    pub fn slots(&self) -> &HashMap<SlotName, Slot> {
        &self.slots
    }

    /// Required slots with no value at all, in declaration order.
    pub fn unfilled_required(&self) -> Vec<SlotName> {
        self.kind
            .required_slots()
            .iter()
            .copied()
            .filter(|name| self.slots.get(name).map_or(true, Slot::is_unfilled))
            .collect()
    }

    /// Required slots stuck on multiple candidates, in declaration order.
    pub fn ambiguous_required(&self) -> Vec<SlotName> {
        self.kind
            .required_slots()
            .iter()
            .copied()
            .filter(|name| self.slots.get(name).is_some_and(Slot::is_ambiguous))
            .collect()
    }

    /// True when every required slot is resolved. Only then may an
    /// ActionRequest be constructed.
    pub fn is_fully_resolved(&self) -> bool {
        self.kind
            .required_slots()
            .iter()
            .all(|name| self.slots.get(name).is_some_and(Slot::is_resolved))
    }

    /// Returns a new intent with `slot` replacing its namesake.
    pub fn with_slot(&self, slot: Slot) -> Self {
        let mut next = self.clone();
        next.slots.insert(slot.name, slot);
        next
    }

    /// Turn-over-turn refinement: merges a newer intent of the same kind into
    /// this one. Slots the newer intent actually says something about (a
    /// value, a hint, or candidates) replace the old ones; prior progress on
    /// everything else is kept. The newer confidence and utterance win.
    ///
    /// Callers are expected to have checked the kinds match; a different
    /// kind replaces the pending intent entirely instead of merging.
    pub fn merged_with(&self, newer: &Intent) -> Intent {
        debug_assert_eq!(self.kind, newer.kind);
        let mut slots = self.slots.clone();
        for (name, slot) in newer.slots() {
            let says_something = !matches!(
                slot.state,
                super::slot::SlotState::Unfilled { hint: None }
            );
            if says_something {
                slots.insert(*name, slot.clone());
            }
        }
        Intent {
            kind: self.kind,
            slots,
            confidence: newer.confidence,
            utterance: newer.utterance.clone(),
        }
    }
}
