//! The access-gate contract shared with front ends.

use serde::{Deserialize, Serialize};

/// Resolution state for a guarded page or feature.
///
/// Callers start in `Pending` and must not render the protected content
/// until the check lands on `Granted`. `Denied` is terminal for the request;
/// a UI reacts by redirecting or showing a generic denial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    #[default]
    Pending,
    Granted,
    Denied,
}

impl AccessState {
    /// Whether the protected content may be shown.
    ///
    /// Only `Granted` passes; `Pending` renders as not-yet-authorized.
    #[must_use]
    pub const fn allows_render(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Whether the check has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Collapse an evaluator verdict into a terminal state.
    #[must_use]
    pub const fn from_decision(allowed: bool) -> Self {
        if allowed { Self::Granted } else { Self::Denied }
    }
}

impl std::fmt::Display for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Granted => "granted",
            Self::Denied => "denied",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(AccessState::default(), AccessState::Pending);
    }

    #[test]
    fn test_only_granted_allows_render() {
        assert!(AccessState::Granted.allows_render());
        assert!(!AccessState::Pending.allows_render());
        assert!(!AccessState::Denied.allows_render());
    }

    #[test]
    fn test_pending_is_not_terminal() {
        assert!(!AccessState::Pending.is_terminal());
        assert!(AccessState::Granted.is_terminal());
        assert!(AccessState::Denied.is_terminal());
    }

    #[test]
    fn test_from_decision() {
        assert_eq!(AccessState::from_decision(true), AccessState::Granted);
        assert_eq!(AccessState::from_decision(false), AccessState::Denied);
    }

    #[test]
    fn test_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&AccessState::Granted).unwrap(),
            "\"granted\""
        );
        let parsed: AccessState = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(parsed, AccessState::Denied);
    }
}
