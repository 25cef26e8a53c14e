/// Crawl queue entry states
///
/// The frontier outlives the process, so every state change goes through
/// [`EntryStatus::can_transition_to`] before it is written.
use std::fmt;

/// Represents the current state of a crawl queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    // ===== Active States =====
    /// Entry is waiting in the frontier
    Pending,

    /// Entry has been claimed and its page is being fetched
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and its links followed (or depth was exhausted)
    Fetched,

    /// Page was classified as an article and an Article record exists
    IsArticle,

    /// Fetch or processing failed; only an operator reset brings it back
    Failed,

    /// Page was not fetched or not processed (robots.txt, non-HTML content)
    Skipped,
}

impl EntryStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Fetching)
    }

    /// Returns true if moving from `self` to `next` is a permitted transition
    ///
    /// | From | To |
    /// |------|----|
    /// | Pending | Fetching, Skipped |
    /// | Fetching | Fetched, IsArticle, Failed, Skipped |
    ///
    /// Terminal states never change; the queue is reset by deleting entries.
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Fetching | Self::Skipped),
            Self::Fetching => matches!(
                next,
                Self::Fetched | Self::IsArticle | Self::Failed | Self::Skipped
            ),
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Fetching => "FETCHING",
            Self::Fetched => "FETCHED",
            Self::IsArticle => "IS_ARTICLE",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "FETCHING" => Some(Self::Fetching),
            "FETCHED" => Some(Self::Fetched),
            "IS_ARTICLE" => Some(Self::IsArticle),
            "FAILED" => Some(Self::Failed),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Fetched,
            Self::IsArticle,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!EntryStatus::Pending.is_terminal());
        assert!(!EntryStatus::Fetching.is_terminal());

        assert!(EntryStatus::Fetched.is_terminal());
        assert!(EntryStatus::IsArticle.is_terminal());
        assert!(EntryStatus::Failed.is_terminal());
        assert!(EntryStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(EntryStatus::Pending.can_transition_to(EntryStatus::Fetching));
        assert!(EntryStatus::Pending.can_transition_to(EntryStatus::Skipped));
        assert!(EntryStatus::Fetching.can_transition_to(EntryStatus::Fetched));
        assert!(EntryStatus::Fetching.can_transition_to(EntryStatus::IsArticle));
        assert!(EntryStatus::Fetching.can_transition_to(EntryStatus::Failed));
        assert!(EntryStatus::Fetching.can_transition_to(EntryStatus::Skipped));
    }

    #[test]
    fn test_rejected_transitions() {
        // Pending must be claimed before it can finish
        assert!(!EntryStatus::Pending.can_transition_to(EntryStatus::Fetched));
        assert!(!EntryStatus::Pending.can_transition_to(EntryStatus::IsArticle));
        assert!(!EntryStatus::Pending.can_transition_to(EntryStatus::Failed));
        assert!(!EntryStatus::Fetching.can_transition_to(EntryStatus::Pending));

        // Terminal states are frozen, including self transitions
        for from in EntryStatus::all_states().into_iter().filter(|s| s.is_terminal()) {
            for to in EntryStatus::all_states() {
                assert!(
                    !from.can_transition_to(to),
                    "{:?} -> {:?} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in EntryStatus::all_states() {
            let parsed = EntryStatus::from_db_string(state.to_db_string());
            assert_eq!(Some(state), parsed, "Failed roundtrip for {:?}", state);
        }
        assert_eq!(EntryStatus::from_db_string("pending"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntryStatus::IsArticle), "IS_ARTICLE");
        assert_eq!(format!("{}", EntryStatus::Pending), "PENDING");
    }
}
