//! Protected-route gate.

use tokio::sync::watch;

use crate::config::SessionConfig;
use crate::state::{SessionPhase, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a loading indicator.
    Pending,
    /// Not signed in; send the visitor here.
    Redirect(String),
    Render,
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self { login_path: login_path.into() }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.login_path.clone())
    }

    pub fn decide(&self, state: &SessionState) -> GuardDecision {
        match state.phase() {
            SessionPhase::Loading => GuardDecision::Pending,
            SessionPhase::Unauthenticated => GuardDecision::Redirect(self.login_path.clone()),
            SessionPhase::Authenticated => GuardDecision::Render,
        }
    }

    /// Wait until the session leaves the loading phase, then decide.
    pub async fn settle(&self, rx: &mut watch::Receiver<SessionState>) -> GuardDecision {
        if let Ok(state) = rx.wait_for(|s| !s.is_loading).await {
            return self.decide(&state);
        }
        // Manager gone: decide on the last value it published.
        self.decide(&rx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionEnd;

    #[test]
    fn loading_is_pending_and_signed_out_redirects() {
        let guard = RouteGuard::new("/login");
        assert_eq!(guard.decide(&SessionState::initializing()), GuardDecision::Pending);
        assert_eq!(
            guard.decide(&SessionState::signed_out(1, Some(SessionEnd::SignedOut))),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[tokio::test]
    async fn settle_waits_for_loading_to_finish() {
        let (tx, mut rx) = watch::channel(SessionState::initializing());
        let guard = RouteGuard::new("/login");

        let waiter = tokio::spawn(async move { guard.settle(&mut rx).await });
        tx.send_replace(SessionState::signed_out(1, None));

        assert_eq!(waiter.await.unwrap(), GuardDecision::Redirect("/login".to_string()));
    }
}
