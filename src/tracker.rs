use std::sync::atomic::{AtomicU64, Ordering};

/// Issues monotonically increasing tokens so a client can tell whether a
/// response still belongs to its most recent request.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

/// Identifies one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; every earlier token becomes stale.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

/// What happened to a request's response.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// The response was the latest and is now the component's state.
    Applied(T),
    /// A newer request was issued while this one was in flight; the response
    /// was dropped without touching state.
    Superseded,
}

impl<T> Completion<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Completion::Applied(value) => Some(value),
            Completion::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Completion::Superseded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_token_supersedes_older() {
        let tracker = RequestTracker::new();
        let first = tracker.issue();
        assert!(tracker.is_current(first));

        let second = tracker.issue();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn completion_helpers() {
        assert_eq!(Completion::Applied(3).applied(), Some(3));
        assert!(Completion::<u8>::Superseded.is_superseded());
        assert_eq!(Completion::<u8>::Superseded.applied(), None);
    }
}
