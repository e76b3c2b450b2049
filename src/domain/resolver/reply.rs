//! Short-reply interpretation while a clarification is outstanding.
//!
//! When the assistant has just asked for an amount or offered token
//! candidates, the natural reply is a bare "10.5", a "2", or a "no" - not a
//! full sentence worth a language-understanding round-trip. These helpers
//! interpret such replies deterministically.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::intent::TokenCandidate;

/// Words that abandon the pending intent.
static REJECTION_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["no", "nope", "reject", "cancel", "stop", "different", "another", "nevermind"]
        .into_iter()
        .collect()
});

/// True when the reply reads as a rejection of what was offered.
pub fn is_rejection(text: &str) -> bool {
    let normalized = text.to_lowercase();
    if normalized.replace(' ', "") == "nevermind" {
        return true;
    }
    normalized
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|word| REJECTION_KEYWORDS.contains(word))
}

/// Finds the first standalone positive number in a reply.
///
/// Digits glued to letters ("v2", "2x") do not count, matching how the
/// assistant's own prompt asks for "just the number".
pub fn parse_bare_amount(text: &str) -> Option<Decimal> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let starts_number = chars[i].is_ascii_digit()
            || (chars[i] == '.' && i + 1 < len && chars[i + 1].is_ascii_digit());
        if !starts_number {
            i += 1;
            continue;
        }

        let preceded_by_letter = i > 0 && chars[i - 1].is_ascii_alphabetic();
        let start = i;
        while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }
        let followed_by_letter = i < len && chars[i].is_ascii_alphabetic();

        if preceded_by_letter || followed_by_letter {
            continue;
        }

        let run: String = chars[start..i].iter().collect();
        let run = run.trim_end_matches('.');
        if run.matches('.').count() > 1 {
            continue;
        }
        let normalized = if run.starts_with('.') {
            format!("0{}", run)
        } else {
            run.to_string()
        };
        if let Ok(amount) = Decimal::from_str(&normalized) {
            if amount > Decimal::ZERO {
                return Some(amount);
            }
        }
    }

    None
}

/// Matches a reply against offered candidates: a 1-based index or a symbol.
/// An exact-case symbol match wins over a case-insensitive one.
pub fn match_candidate_choice<'a>(
    text: &str,
    candidates: &'a [TokenCandidate],
) -> Option<&'a TokenCandidate> {
    let reply = text.trim();

    if let Ok(index) = reply.parse::<usize>() {
        if (1..=candidates.len()).contains(&index) {
            return Some(&candidates[index - 1]);
        }
        return None;
    }

    candidates
        .iter()
        .find(|c| c.symbol == reply)
        .or_else(|| candidates.iter().find(|c| c.symbol.eq_ignore_ascii_case(reply)))
}
