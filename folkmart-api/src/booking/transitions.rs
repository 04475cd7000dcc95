//! Session status transition policy

use std::fmt;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};
use crate::models::{SessionStatus, UnknownVariant};

/// Which status moves `updateSessionStatus` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Explicit transition table; terminal states stay terminal
    #[default]
    Strict,
    /// Any status may be overwritten with any other
    Permissive,
}

impl TransitionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionPolicy::Strict => "strict",
            TransitionPolicy::Permissive => "permissive",
        }
    }

    pub fn allows(self, from: SessionStatus, to: SessionStatus) -> bool {
        use SessionStatus::*;

        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => matches!(
                (from, to),
                (Pending, Confirmed)
                    | (Pending, Cancelled)
                    | (Confirmed, Completed)
                    | (Confirmed, Cancelled)
                    | (Confirmed, Rescheduled)
                    | (Rescheduled, Confirmed)
                    | (Rescheduled, Cancelled)
            ),
        }
    }

    /// InvalidState when the move is not allowed
    pub fn check(self, from: SessionStatus, to: SessionStatus) -> ApiResult<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(ApiError::InvalidState(format!(
                "cannot change session status from {} to {}",
                from, to
            )))
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            _ => Err(UnknownVariant::new("transition policy", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    #[test]
    fn test_strict_table() {
        let allowed = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
            (Confirmed, Rescheduled),
            (Rescheduled, Confirmed),
            (Rescheduled, Cancelled),
        ];

        for from in SessionStatus::ALL {
            for to in SessionStatus::ALL {
                assert_eq!(
                    TransitionPolicy::Strict.allows(from, to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        for to in SessionStatus::ALL {
            assert!(TransitionPolicy::Strict.check(Completed, to).is_err());
            assert!(TransitionPolicy::Strict.check(Cancelled, to).is_err());
        }
    }

    #[test]
    fn test_permissive_allows_everything() {
        for from in SessionStatus::ALL {
            for to in SessionStatus::ALL {
                assert!(TransitionPolicy::Permissive.check(from, to).is_ok());
            }
        }
    }

    #[test]
    fn test_rejection_is_invalid_state() {
        assert!(matches!(
            TransitionPolicy::Strict.check(Pending, Completed),
            Err(ApiError::InvalidState(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("strict".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Strict));
        assert_eq!(
            " Permissive ".parse::<TransitionPolicy>(),
            Ok(TransitionPolicy::Permissive)
        );
        assert!("lenient".parse::<TransitionPolicy>().is_err());
    }
}
