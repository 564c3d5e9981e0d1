//! Session boot and state
//!
//! Authentication is never stored; it is re-derived on every boot by
//! challenging the server with the stored token.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::gateway::AuthGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

pub struct SessionController {
    gateway: Arc<AuthGateway>,
}

impl SessionController {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }

    /// Decide the initial state.
    ///
    /// Without a stored token no request is made. With one, a single whoami
    /// check runs; any failure logs out. There is no retry.
    pub async fn boot(&self) -> SessionState {
        if self.gateway.tokens().get().is_none() {
            debug!("No stored token, showing login");
            self.gateway.overlay().show();
            self.gateway.set_session_state(SessionState::Unauthenticated);
            return SessionState::Unauthenticated;
        }

        match self.gateway.whoami().await {
            Some(identity) => {
                info!(user = ?identity.user, "Stored session is valid");
                self.gateway.overlay().hide();
                self.gateway.set_session_state(SessionState::Authenticated);
                SessionState::Authenticated
            }
            // whoami already logged out and showed the overlay
            None => SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.gateway.session_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.gateway.subscribe()
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }
}
