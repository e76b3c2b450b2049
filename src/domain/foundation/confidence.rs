//! Confidence value object - bounded extraction certainty.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Extraction confidence in [0.0, 1.0].
///
/// Reported by the language-understanding service for each candidate intent.
/// Construction rejects out-of-range or non-finite values so downstream
/// threshold checks never see garbage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a confidence score, rejecting values outside [0, 1].
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::invalid_format(
                "confidence",
                format!("must be within [0.0, 1.0], got {}", value),
            ));
        }
        Ok(Self(value))
    }

    /// Full certainty.
    pub fn certain() -> Self {
        Self(1.0)
    }

    /// Returns the raw score.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// True if this score meets or exceeds `threshold`.
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_boundaries() {
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(1.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Confidence::new(-0.01).is_err());
        assert!(Confidence::new(1.01).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
        assert!(Confidence::new(f64::INFINITY).is_err());
    }

    #[test]
    fn meets_compares_inclusive() {
        let c = Confidence::new(0.6).unwrap();
        assert!(c.meets(0.6));
        assert!(c.meets(0.5));
        assert!(!c.meets(0.61));
    }

    proptest! {
        #[test]
        fn valid_range_always_constructs(v in 0.0f64..=1.0) {
            let c = Confidence::new(v).unwrap();
            prop_assert_eq!(c.value(), v);
        }
    }
}
