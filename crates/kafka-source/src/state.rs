use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a subscription.
///
/// ```text
/// Disconnected -> Connecting -> Active -> Closed
///                     |
///                     +-> Disconnected (handshake or auth failure)
/// ```
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connecting,
    Active,
    Closed,
}

impl SubscriptionState {
    pub fn can_transition_to(self, next: SubscriptionState) -> bool {
        use SubscriptionState::{Active, Closed, Connecting, Disconnected};
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Active)
                | (Connecting, Disconnected)
                | (Active, Closed)
        )
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Shared, watchable state cell. Shared between the handle and the librdkafka
/// context, which may close the subscription from a callback thread.
#[derive(Clone)]
pub(crate) struct StateCell(Arc<watch::Sender<SubscriptionState>>);

impl StateCell {
    pub(crate) fn new(initial: SubscriptionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self(Arc::new(tx))
    }

    pub(crate) fn get(&self) -> SubscriptionState {
        *self.0.borrow()
    }

    /// Apply `next` if it is a legal transition. Returns whether it was applied.
    pub(crate) fn transition(&self, next: SubscriptionState) -> bool {
        self.0.send_if_modified(|current| {
            if current.can_transition_to(next) {
                *current = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SubscriptionState> {
        self.0.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionState::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = StateCell::new(Disconnected);
        assert!(state.transition(Connecting));
        assert!(state.transition(Active));
        assert!(state.transition(Closed));
        assert_eq!(state.get(), Closed);
    }

    #[test]
    fn test_failed_handshake_returns_to_disconnected() {
        let state = StateCell::new(Disconnected);
        assert!(state.transition(Connecting));
        assert!(state.transition(Disconnected));
        assert!(!state.transition(Active));
        assert_eq!(state.get(), Disconnected);
    }

    #[test]
    fn test_closed_is_terminal() {
        let state = StateCell::new(Disconnected);
        state.transition(Connecting);
        state.transition(Active);
        state.transition(Closed);

        for next in [Disconnected, Connecting, Active, Closed] {
            assert!(!state.transition(next));
        }
        assert_eq!(state.get(), Closed);
    }

    #[test]
    fn test_cannot_skip_connecting() {
        assert!(!Disconnected.can_transition_to(Active));
        assert!(!Disconnected.can_transition_to(Closed));
        assert!(!Connecting.can_transition_to(Closed));
    }

    #[tokio::test]
    async fn test_watchers_see_transitions() {
        let state = StateCell::new(Disconnected);
        let mut rx = state.subscribe();
        state.transition(Connecting);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Connecting);
    }
}
