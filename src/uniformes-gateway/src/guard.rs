//! Session guard: the policy applied when the backend rejects credentials.
//!
//! Any 401 from any call drops the session. Concurrent 401s race on
//! `CredentialStore::clear_if_active`, so exactly one of them performs the
//! clear and the redirect; the rest are no-ops.

use std::sync::Arc;
use tracing::{debug, info, warn};

use uniformes_login::CredentialStore;

use crate::constants::LOGIN_ROUTE;

/// UI navigation seam used by the guard.
pub trait Navigator: Send + Sync {
    /// Current UI location (path), if the host has one.
    fn current_location(&self) -> Option<String>;

    /// Send the user to the login surface.
    fn redirect_to_login(&self);
}

/// Navigator for headless hosts: logs instead of navigating.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn current_location(&self) -> Option<String> {
        None
    }

    fn redirect_to_login(&self) {
        warn!("Session expired; sign in again");
    }
}

/// Whether `location` is the login surface (query and fragment ignored).
pub fn is_login_location(location: &str) -> bool {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    path == LOGIN_ROUTE || path.ends_with(LOGIN_ROUTE)
}

/// Reacts to authorization failures reported by the gateway.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard").finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn new(store: Arc<CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Handle a 401. Returns true if this call cleared the session.
    pub fn on_unauthorized(&self) -> bool {
        match self.store.clear_if_active() {
            Ok(false) => {
                debug!("Received 401 with no active session, nothing to clear");
                return false;
            }
            Ok(true) => {}
            Err(e) => {
                // In-memory session is already cleared at this point.
                warn!(error = %e, "Session cleared but persisted copy could not be removed");
            }
        }

        info!("Session cleared after 401 response");

        let on_login = self
            .navigator
            .current_location()
            .is_some_and(|location| is_login_location(&location));
        if !on_login {
            self.navigator.redirect_to_login();
        }
        true
    }
}
