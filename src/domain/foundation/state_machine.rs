//! State machine trait for status enums.
//!
//! The per-session dialog lifecycle mutates only through validated
//! transitions; this trait gives any status enum the transition methods.

use super::ValidationError;

/// Trait for status enums that represent state machines.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Idle,
        Working,
        Done,
    }

    impl StateMachine for Phase {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Phase::*;
            matches!((self, target), (Idle, Working) | (Working, Done))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Phase::*;
            match self {
                Idle => vec![Working],
                Working => vec![Done],
                Done => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        assert_eq!(Phase::Idle.transition_to(Phase::Working), Ok(Phase::Working));
    }

    #[test]
    fn invalid_transition_fails() {
        assert!(Phase::Idle.transition_to(Phase::Done).is_err());
    }

    #[test]
    fn terminal_state_has_no_exits() {
        assert!(Phase::Done.is_terminal());
        assert!(!Phase::Idle.is_terminal());
    }
}
