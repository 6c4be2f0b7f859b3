//! Transaction stage machine.
//!
//! A transaction moves strictly forward through four stages and never leaves the last one:
//! `AGREEMENT -> EARNEST_MONEY -> TITLE_DEED -> COMPLETED`. The legal moves live in a single
//! lookup table indexed by stage so the whole machine can be audited (and tested) by
//! enumeration. Validation here is pure: it knows nothing about persistence.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle position of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Initial stage, set when the transaction is created
    Agreement,
    /// Earnest money has been paid
    EarnestMoney,
    /// Title deed transfer is in progress
    TitleDeed,
    /// Terminal stage; commission is settled
    Completed,
}

/// Legal next stages, indexed by `Stage::index`.
const VALID_TRANSITIONS: [&[Stage]; 4] = [
    &[Stage::EarnestMoney],
    &[Stage::TitleDeed],
    &[Stage::Completed],
    &[],
];

impl Stage {
    /// Every stage in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Agreement,
        Self::EarnestMoney,
        Self::TitleDeed,
        Self::Completed,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Agreement => 0,
            Self::EarnestMoney => 1,
            Self::TitleDeed => 2,
            Self::Completed => 3,
        }
    }

    /// Stored and serialized name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agreement => "AGREEMENT",
            Self::EarnestMoney => "EARNEST_MONEY",
            Self::TitleDeed => "TITLE_DEED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Stages that may legally follow `self`. Empty for the terminal stage.
    #[must_use]
    pub const fn valid_next_stages(self) -> &'static [Self] {
        VALID_TRANSITIONS[self.index()]
    }

    /// Whether no transition can leave this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Negation of [`Stage::is_terminal`].
    #[must_use]
    pub const fn is_not_terminal(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Unknown stage: {s}")))
    }
}

/// Checks whether moving from `current` to `requested` is a legal transition.
///
/// Self-transitions (including `COMPLETED -> COMPLETED`), skips and backward moves are all
/// rejected with [`Error::InvalidTransition`], which carries both stages and the list of
/// stages that would have been accepted.
pub fn validate_transition(current: Stage, requested: Stage) -> Result<()> {
    let valid_next = current.valid_next_stages();

    if current == requested || !valid_next.contains(&requested) {
        return Err(Error::InvalidTransition {
            current,
            requested,
            valid_next: valid_next.to_vec(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_forward_transitions_are_valid() {
        let forward = [
            (Stage::Agreement, Stage::EarnestMoney),
            (Stage::EarnestMoney, Stage::TitleDeed),
            (Stage::TitleDeed, Stage::Completed),
        ];
        for (current, next) in forward {
            assert!(validate_transition(current, next).is_ok());
        }
    }

    #[test]
    fn test_only_immediate_successor_is_accepted() {
        for (i, current) in Stage::ALL.into_iter().enumerate() {
            for (j, requested) in Stage::ALL.into_iter().enumerate() {
                let result = validate_transition(current, requested);
                if j == i + 1 {
                    assert!(result.is_ok(), "{current} -> {requested} should be valid");
                } else {
                    assert!(
                        matches!(result, Err(Error::InvalidTransition { .. })),
                        "{current} -> {requested} should be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_stage_rejected() {
        let err = validate_transition(Stage::EarnestMoney, Stage::EarnestMoney).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                current: Stage::EarnestMoney,
                requested: Stage::EarnestMoney,
                ..
            }
        ));
    }

    #[test]
    fn test_skip_message_names_both_stages() {
        let err = validate_transition(Stage::Agreement, Stage::Completed).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AGREEMENT"));
        assert!(message.contains("COMPLETED"));
        assert!(message.contains("Valid next stages: EARNEST_MONEY"));
    }

    #[test]
    fn test_backward_move_rejected() {
        let err = validate_transition(Stage::TitleDeed, Stage::Agreement).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                current: Stage::TitleDeed,
                requested: Stage::Agreement,
                ..
            }
        ));
    }

    #[test]
    fn test_completed_has_no_way_out() {
        assert!(Stage::Completed.valid_next_stages().is_empty());
        for requested in Stage::ALL {
            let err = validate_transition(Stage::Completed, requested).unwrap_err();
            let message = err.to_string();
            assert!(message.contains("COMPLETED"));
            assert!(message.contains(requested.as_str()));
            assert!(message.contains("Valid next stages: none"));
        }
    }

    #[test]
    fn test_terminal_predicates() {
        assert!(Stage::Completed.is_terminal());
        assert!(!Stage::Completed.is_not_terminal());
        for stage in [Stage::Agreement, Stage::EarnestMoney, Stage::TitleDeed] {
            assert!(!stage.is_terminal());
            assert!(stage.is_not_terminal());
        }
    }

    #[test]
    fn test_parse_and_display() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
            assert_eq!(stage.to_string(), stage.as_str());
        }
        assert!(matches!(
            "CLOSED".parse::<Stage>(),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Stage::EarnestMoney).unwrap();
        assert_eq!(json, "\"EARNEST_MONEY\"");
    }
}
