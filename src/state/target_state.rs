/// Target state definitions for tracking a batch
///
/// This module defines every state a target can be in while it is scraped.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a target in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    // ===== Active States =====
    /// Target is waiting for a page slot and its origin's rate limit
    Pending,

    /// Page is loading the target URL
    Navigating,

    /// Fields and items are being read
    Extracting,

    // ===== Terminal Success States =====
    /// Every item was extracted with all required fields
    Completed,

    /// Extraction finished but some records are partial or pagination did not converge
    Partial,

    // ===== Terminal Error States =====
    /// Page showed a login wall or block signal after all retries
    Blocked,

    /// Page could not be loaded
    NavigationFailed,

    /// Origin request cap reached before the target could run
    RateLimited,

    /// Target failed for other reasons (page factory, task failure)
    Failed,

    // ===== Special States =====
    /// Batch was aborted before the target ran
    Skipped,
}

impl TargetState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Navigating | Self::Extracting)
    }

    /// Returns true if the target produced a usable report
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Partial)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Blocked | Self::NavigationFailed | Self::RateLimited | Self::Failed
        )
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Navigating => "navigating",
            Self::Extracting => "extracting",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Blocked => "blocked",
            Self::NavigationFailed => "navigation_failed",
            Self::RateLimited => "rate_limited",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "navigating" => Some(Self::Navigating),
            "extracting" => Some(Self::Extracting),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "blocked" => Some(Self::Blocked),
            "navigation_failed" => Some(Self::NavigationFailed),
            "rate_limited" => Some(Self::RateLimited),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Navigating,
            Self::Extracting,
            Self::Completed,
            Self::Partial,
            Self::Blocked,
            Self::NavigationFailed,
            Self::RateLimited,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!TargetState::Pending.is_terminal());
        assert!(!TargetState::Navigating.is_terminal());
        assert!(!TargetState::Extracting.is_terminal());

        assert!(TargetState::Completed.is_terminal());
        assert!(TargetState::Partial.is_terminal());
        assert!(TargetState::Blocked.is_terminal());
        assert!(TargetState::NavigationFailed.is_terminal());
        assert!(TargetState::Skipped.is_terminal());
    }

    #[test]
    fn test_success_and_error() {
        assert!(TargetState::Completed.is_success());
        assert!(TargetState::Partial.is_success());
        assert!(!TargetState::Blocked.is_success());

        assert!(TargetState::Blocked.is_error());
        assert!(TargetState::NavigationFailed.is_error());
        assert!(!TargetState::Skipped.is_error());
        assert!(!TargetState::Partial.is_error());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in TargetState::all_states() {
            let parsed = TargetState::from_db_string(state.to_db_string());
            assert_eq!(Some(state), parsed, "Failed roundtrip for {:?}", state);
        }
        assert_eq!(TargetState::from_db_string("invalid"), None);
    }

    #[test]
    fn test_serde_matches_db_string() {
        for state in TargetState::all_states() {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.to_db_string()));
        }
    }
}
