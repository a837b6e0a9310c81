//! State tracking for a single resolution pass

use crate::errors::{Error, Result};
use std::fmt;

/// `Idle -> Fetching -> {Resolved | Failed}`; the last two are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Fetching,
    Resolved,
    Failed,
}

impl PassState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Resolved | PassState::Failed)
    }

    /// Move to `next`, rejecting transitions the pass model does not allow
    pub fn transition(self, next: PassState) -> Result<PassState> {
        let allowed = matches!(
            (self, next),
            (PassState::Idle, PassState::Fetching)
                | (PassState::Idle, PassState::Failed)
                | (PassState::Fetching, PassState::Resolved)
                | (PassState::Fetching, PassState::Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::configuration(format!(
                "invalid resolution pass transition {self} -> {next}"
            )))
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Idle => "idle",
            PassState::Fetching => "fetching",
            PassState::Resolved => "resolved",
            PassState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = PassState::Idle
            .transition(PassState::Fetching)
            .and_then(|s| s.transition(PassState::Resolved))
            .unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(PassState::Resolved.transition(PassState::Fetching).is_err());
        assert!(PassState::Failed.transition(PassState::Idle).is_err());
        assert!(PassState::Idle.transition(PassState::Resolved).is_err());
    }

    #[test]
    fn test_validation_failure_skips_fetching() {
        assert_eq!(
            PassState::Idle.transition(PassState::Failed).unwrap(),
            PassState::Failed
        );
    }
}
