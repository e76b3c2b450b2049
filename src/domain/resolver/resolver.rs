//! Required-slot resolution against the market-data ranking.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::intent::{
    Intent, Provenance, Slot, SlotName, SlotState, SlotValue, TimeWindow, TokenCandidate,
};
use crate::ports::{MarketDataProvider, MarketError, RetryError, RetryPolicy};

/// Default entry count for ranking queries when the user stayed silent.
const DEFAULT_RANKING_COUNT: u32 = 10;

/// Orders candidates that share a market rank. Surfaced as configuration
/// because the ranking feed gives no inherent order for equal ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Case-insensitive symbol order, then identifier.
    #[default]
    Alphabetical,
    /// Identifier order only.
    Identifier,
}

/// Why a slot needs the user's help.
#[derive(Debug, Clone, PartialEq)]
pub enum ClarificationReason {
    /// Nothing was stated and no default applies.
    Missing,
    /// Multiple market matches; ranked lowest rank number first, the first
    /// candidate is the offered default.
    Ambiguous { candidates: Vec<TokenCandidate> },
    /// The stated symbol matched nothing in the ranking.
    UnknownToken { query: String },
}

/// One slot the pipeline cannot fill on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ClarificationRequest {
    pub slot: SlotName,
    pub reason: ClarificationReason,
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every required slot is resolved; safe to orchestrate.
    Complete(Intent),
    /// One or more required slots are open. The partially-resolved intent is
    /// returned for persistence; no transaction is built this turn.
    NeedsClarification {
        intent: Intent,
        requests: Vec<ClarificationRequest>,
    },
}

/// Resolution-level failures that are not recoverable into an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ResolveFailure {
    #[error("market-data service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },
}

/// Resolves an intent's required slots, one market lookup per open token slot.
pub struct SlotResolver {
    market: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
    tie_break: TieBreak,
}

impl SlotResolver {
    pub fn new(market: Arc<dyn MarketDataProvider>, retry: RetryPolicy, tie_break: TieBreak) -> Self {
        Self {
            market,
            retry,
            tie_break,
        }
    }

    /// Walks the variant's required slots in declaration order. Already
    /// resolved slots are skipped; token slots with a stated symbol go
    /// through the ranking lookup; defaultable slots get their defaults;
    /// everything else becomes a clarification request.
    pub async fn resolve(&self, intent: Intent) -> Result<Resolution, ResolveFailure> {
        let mut current = intent;
        let mut requests = Vec::new();

        for name in current.kind().required_slots() {
            let slot = current
                .slot(*name)
                .cloned()
                .unwrap_or_else(|| Slot::unfilled(*name));

            match slot.state {
                SlotState::Resolved { .. } => continue,
                SlotState::Ambiguous { candidates } => {
                    // Retained from an earlier turn; re-offer the same choice.
                    requests.push(ClarificationRequest {
                        slot: *name,
                        reason: ClarificationReason::Ambiguous { candidates },
                    });
                }
                SlotState::Unfilled { hint: Some(query) } if name.is_token() => {
                    match self.lookup(&query).await? {
                        Lookup::Hit(token) => {
                            debug!(slot = %name, symbol = %token.symbol, rank = token.rank, "symbol resolved");
                            current = current.with_slot(Slot::resolved(
                                *name,
                                SlotValue::Token(token),
                                Provenance::LookedUp,
                            ));
                        }
                        Lookup::Ambiguous(candidates) => {
                            current = current.with_slot(Slot::ambiguous(*name, candidates.clone()));
                            requests.push(ClarificationRequest {
                                slot: *name,
                                reason: ClarificationReason::Ambiguous { candidates },
                            });
                        }
                        Lookup::Miss => {
                            warn!(slot = %name, query = %query, "symbol matched nothing");
                            requests.push(ClarificationRequest {
                                slot: *name,
                                reason: ClarificationReason::UnknownToken { query },
                            });
                        }
                    }
                }
                SlotState::Unfilled { .. } => {
                    if let Some(value) = default_for(current.kind().defaultable_slots(), *name) {
                        current = current.with_slot(Slot::resolved(
                            *name,
                            value,
                            Provenance::Defaulted,
                        ));
                    } else {
                        requests.push(ClarificationRequest {
                            slot: *name,
                            reason: ClarificationReason::Missing,
                        });
                    }
                }
            }
        }

        if requests.is_empty() {
            Ok(Resolution::Complete(current))
        } else {
            Ok(Resolution::NeedsClarification {
                intent: current,
                requests,
            })
        }
    }

    async fn lookup(&self, query: &str) -> Result<Lookup, ResolveFailure> {
        let listings = self
            .retry
            .call("market-data", || self.market.lookup_symbol(query))
            .await
            .map_err(|err| match err {
                RetryError::Fatal(MarketError::MalformedResponse(reason)) => {
                    warn!(%reason, "malformed market response");
                    ResolveFailure::ServiceUnavailable { attempts: 1 }
                }
                RetryError::Fatal(_) => ResolveFailure::ServiceUnavailable { attempts: 1 },
                RetryError::Exhausted { attempts, .. } => {
                    ResolveFailure::ServiceUnavailable { attempts }
                }
            })?;

        Ok(self.classify(query, listings))
    }

    /// Exact symbol match wins; several case-insensitive matches become an
    /// ambiguity ranked by ascending market rank (tie-break per config); no
    /// match is a miss.
    fn classify(&self, query: &str, listings: Vec<TokenCandidate>) -> Lookup {
        let exact: Vec<&TokenCandidate> =
            listings.iter().filter(|t| t.symbol == query).collect();
        if exact.len() == 1 {
            return Lookup::Hit(exact[0].clone());
        }

        let mut matches: Vec<TokenCandidate> = listings
            .into_iter()
            .filter(|t| t.symbol.eq_ignore_ascii_case(query))
            .collect();

        match matches.len() {
            0 => Lookup::Miss,
            1 => Lookup::Hit(matches.remove(0)),
            _ => {
                self.rank_candidates(&mut matches);
                Lookup::Ambiguous(matches)
            }
        }
    }

    fn rank_candidates(&self, candidates: &mut [TokenCandidate]) {
        match self.tie_break {
            TieBreak::Alphabetical => candidates.sort_by(|a, b| {
                a.rank
                    .cmp(&b.rank)
                    .then_with(|| a.symbol.to_lowercase().cmp(&b.symbol.to_lowercase()))
                    .then_with(|| a.identifier.cmp(&b.identifier))
            }),
            TieBreak::Identifier => candidates
                .sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.identifier.cmp(&b.identifier))),
        }
    }
}

enum Lookup {
    Hit(TokenCandidate),
    Ambiguous(Vec<TokenCandidate>),
    Miss,
}

fn default_for(defaultable: &[SlotName], name: SlotName) -> Option<SlotValue> {
    if !defaultable.contains(&name) {
        return None;
    }
    match name {
        SlotName::Count => Some(SlotValue::Count(DEFAULT_RANKING_COUNT)),
        SlotName::Window => Some(SlotValue::Window(TimeWindow::Day)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Confidence;
    use crate::domain::intent::IntentKind;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubMarket {
        replies: Mutex<VecDeque<Result<Vec<TokenCandidate>, MarketError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubMarket {
        fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_listings(self, listings: Vec<TokenCandidate>) -> Self {
            self.replies.lock().unwrap().push_back(Ok(listings));
            self
        }

        fn with_error(self, err: MarketError) -> Self {
            self.replies.lock().unwrap().push_back(Err(err));
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MarketDataProvider for StubMarket {
        async fn lookup_symbol(&self, query: &str) -> Result<Vec<TokenCandidate>, MarketError> {
            self.calls.lock().unwrap().push(query.to_string());
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(vec![]))
        }

        async fn top_ranked(
            &self,
            _limit: u32,
            _window: TimeWindow,
        ) -> Result<Vec<TokenCandidate>, MarketError> {
            Ok(vec![])
        }
    }

    fn resolver_with(stub: StubMarket) -> (SlotResolver, Arc<StubMarket>) {
        let stub = Arc::new(stub);
        let retry = RetryPolicy::new(3, Duration::from_millis(100))
            .with_base_delay(Duration::from_millis(1));
        (
            SlotResolver::new(stub.clone(), retry, TieBreak::Alphabetical),
            stub,
        )
    }

    fn usdc() -> TokenCandidate {
        TokenCandidate::new("usdc-mint", "USDC", "USD Coin", 6)
    }

    fn transfer_intent(slots: Vec<Slot>) -> Intent {
        Intent::new(
            IntentKind::Transfer,
            slots,
            Confidence::new(0.9).unwrap(),
            "send 5 USDC to alice.sol",
        )
    }

    fn full_transfer_slots() -> Vec<Slot> {
        vec![
            Slot::resolved(
                SlotName::Amount,
                SlotValue::Amount(Decimal::new(5, 0)),
                Provenance::UserStated,
            ),
            Slot::stated(SlotName::Asset, "USDC"),
            Slot::resolved(
                SlotName::Destination,
                SlotValue::Address("alice.sol".into()),
                Provenance::UserStated,
            ),
        ]
    }

    #[tokio::test]
    async fn unique_symbol_resolves_with_lookup_provenance() {
        let (resolver, stub) =
            resolver_with(StubMarket::new().with_listings(vec![usdc()]));

        let resolution = resolver
            .resolve(transfer_intent(full_transfer_slots()))
            .await
            .unwrap();

        let intent = match resolution {
            Resolution::Complete(i) => i,
            other => panic!("expected complete, got {:?}", other),
        };
        let slot = intent.slot(SlotName::Asset).unwrap();
        assert!(matches!(
            slot.state,
            SlotState::Resolved {
                provenance: Provenance::LookedUp,
                ..
            }
        ));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn already_resolved_slots_are_skipped() {
        let (resolver, stub) = resolver_with(StubMarket::new());

        let intent = transfer_intent(vec![
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
        ]);

        let resolution = resolver.resolve(intent).await.unwrap();
        assert!(matches!(resolution, Resolution::Complete(_)));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn multiple_matches_rank_lowest_first_and_keep_alternates() {
        let wif = TokenCandidate::new("wif-mint", "WIF", "dogwifhat", 41);
        let wif_clone = TokenCandidate::new("wifc-mint", "Wif", "wif classic", 310);
        let (resolver, _) = resolver_with(
            StubMarket::new().with_listings(vec![wif_clone.clone(), wif.clone()]),
        );

        let intent = transfer_intent(vec![
            Slot::resolved(
                SlotName::Amount,
                SlotValue::Amount(Decimal::ONE),
                Provenance::UserStated,
            ),
            Slot::stated(SlotName::Asset, "wif"),
            Slot::resolved(
                SlotName::Destination,
                SlotValue::Address("bob.sol".into()),
                Provenance::UserStated,
            ),
        ]);

        let resolution = resolver.resolve(intent).await.unwrap();
        let (intent, requests) = match resolution {
            Resolution::NeedsClarification { intent, requests } => (intent, requests),
            other => panic!("expected clarification, got {:?}", other),
        };

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].slot, SlotName::Asset);
        match &requests[0].reason {
            ClarificationReason::Ambiguous { candidates } => {
                assert_eq!(candidates[0], wif);
                assert_eq!(candidates[1], wif_clone);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        // The ambiguity is persisted on the intent for the follow-up choice.
        assert!(intent.slot(SlotName::Asset).unwrap().is_ambiguous());
    }

    #[tokio::test]
    async fn exact_case_match_beats_ambiguity() {
        let wif = TokenCandidate::new("wif-mint", "WIF", "dogwifhat", 41);
        let wif_clone = TokenCandidate::new("wifc-mint", "Wif", "wif classic", 310);
        let (resolver, _) =
            resolver_with(StubMarket::new().with_listings(vec![wif_clone, wif.clone()]));

        let intent = transfer_intent(vec![
            Slot::resolved(
                SlotName::Amount,
                SlotValue::Amount(Decimal::ONE),
                Provenance::UserStated,
            ),
            Slot::stated(SlotName::Asset, "WIF"),
            Slot::resolved(
                SlotName::Destination,
                SlotValue::Address("bob.sol".into()),
                Provenance::UserStated,
            ),
        ]);

        let resolution = resolver.resolve(intent).await.unwrap();
        let intent = match resolution {
            Resolution::Complete(i) => i,
            other => panic!("expected complete, got {:?}", other),
        };
        assert_eq!(
            intent.slot(SlotName::Asset).unwrap().value().and_then(SlotValue::as_token),
            Some(&wif)
        );
    }

    #[tokio::test]
    async fn equal_ranks_fall_back_to_alphabetical_tie_break() {
        let a = TokenCandidate::new("mint-b", "ABC", "Token B", 50);
        let b = TokenCandidate::new("mint-a", "abc", "Token A", 50);
        let (resolver, _) = resolver_with(StubMarket::new().with_listings(vec![a, b]));

        let intent = transfer_intent(vec![
            Slot::resolved(
                SlotName::Amount,
                SlotValue::Amount(Decimal::ONE),
                Provenance::UserStated,
            ),
            Slot::stated(SlotName::Asset, "aBc"),
            Slot::resolved(
                SlotName::Destination,
                SlotValue::Address("bob.sol".into()),
                Provenance::UserStated,
            ),
        ]);

        let resolution = resolver.resolve(intent).await.unwrap();
        match resolution {
            Resolution::NeedsClarification { requests, .. } => match &requests[0].reason {
                ClarificationReason::Ambiguous { candidates } => {
                    // Same rank and same symbol ignoring case: the
                    // identifier breaks the tie deterministically.
                    assert_eq!(candidates[0].identifier, "mint-a");
                    assert_eq!(candidates[1].identifier, "mint-b");
                }
                other => panic!("expected ambiguity, got {:?}", other),
            },
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_symbol_requests_clarification_and_keeps_the_hint() {
        let (resolver, _) = resolver_with(StubMarket::new().with_listings(vec![]));

        let intent = transfer_intent(vec![
            Slot::resolved(
                SlotName::Amount,
                SlotValue::Amount(Decimal::ONE),
                Provenance::UserStated,
            ),
            Slot::stated(SlotName::Asset, "NOPECOIN"),
            Slot::resolved(
                SlotName::Destination,
                SlotValue::Address("bob.sol".into()),
                Provenance::UserStated,
            ),
        ]);

        let resolution = resolver.resolve(intent).await.unwrap();
        match resolution {
            Resolution::NeedsClarification { intent, requests } => {
                assert_eq!(
                    requests[0].reason,
                    ClarificationReason::UnknownToken {
                        query: "NOPECOIN".to_string()
                    }
                );
                assert_eq!(intent.slot(SlotName::Asset).unwrap().hint(), Some("NOPECOIN"));
            }
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_slots_are_named_exactly() {
        // SOL resolves uniquely, so only amount and to_asset stay open.
        let (resolver, _) = resolver_with(
            StubMarket::new()
                .with_listings(vec![TokenCandidate::new("sol-mint", "SOL", "Solana", 5)]),
        );

        let intent = Intent::new(
            IntentKind::Swap,
            vec![Slot::stated(SlotName::FromAsset, "SOL")],
            Confidence::new(0.9).unwrap(),
            "swap some SOL for something",
        );

        let resolution = resolver.resolve(intent).await.unwrap();
        match resolution {
            Resolution::NeedsClarification { requests, .. } => {
                let slots: Vec<SlotName> = requests.iter().map(|r| r.slot).collect();
                assert_eq!(slots, vec![SlotName::Amount, SlotName::ToAsset]);
                assert!(requests
                    .iter()
                    .all(|r| r.reason == ClarificationReason::Missing));
            }
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ranking_query_defaults_silent_slots() {
        let (resolver, stub) = resolver_with(StubMarket::new());

        let intent = Intent::new(
            IntentKind::RankingQuery,
            vec![],
            Confidence::new(0.9).unwrap(),
            "what's hot today",
        );

        let resolution = resolver.resolve(intent).await.unwrap();
        let intent = match resolution {
            Resolution::Complete(i) => i,
            other => panic!("expected complete, got {:?}", other),
        };
        let count = intent.slot(SlotName::Count).unwrap();
        assert!(matches!(
            count.state,
            SlotState::Resolved {
                provenance: Provenance::Defaulted,
                ..
            }
        ));
        assert_eq!(
            intent.slot(SlotName::Window).and_then(Slot::value),
            Some(&SlotValue::Window(TimeWindow::Day))
        );
        // Defaults never touch the market.
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn stated_count_is_not_overridden_by_the_default() {
        let (resolver, _) = resolver_with(StubMarket::new());

        let intent = Intent::new(
            IntentKind::RankingQuery,
            vec![Slot::resolved(
                SlotName::Count,
                SlotValue::Count(25),
                Provenance::UserStated,
            )],
            Confidence::new(0.9).unwrap(),
            "top 25 tokens",
        );

        let resolution = resolver.resolve(intent).await.unwrap();
        let intent = match resolution {
            Resolution::Complete(i) => i,
            other => panic!("expected complete, got {:?}", other),
        };
        assert_eq!(
            intent.slot(SlotName::Count).and_then(Slot::value),
            Some(&SlotValue::Count(25))
        );
    }

    #[tokio::test]
    async fn market_exhaustion_surfaces_as_service_unavailable() {
        let stub = StubMarket::new()
            .with_error(MarketError::network("reset"))
            .with_error(MarketError::network("reset"))
            .with_error(MarketError::network("reset"));
        let (resolver, stub) = resolver_with(stub);

        let result = resolver.resolve(transfer_intent(full_transfer_slots())).await;
        match result {
            Err(ResolveFailure::ServiceUnavailable { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected failure, got {:?}", other.map(|_| ())),
        }
        assert_eq!(stub.call_count(), 3);
    }
}
