//! Login, logout and session validation.
//!
//! Session state lives in the shared `CredentialStore`; this module drives the
//! network calls that populate it. Both `login` and `validate_session` apply
//! the same access gate: a principal must be a super-admin or hold at least
//! one scoped role.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use uniformes_login::{Principal, Session, StorageError};

use crate::constants::{LOGIN_PATH, ME_PATH};
use crate::gateway::Gateway;
use crate::normalize::to_display_message;
use crate::request::RequestOptions;

/// Message recorded when a principal passes authentication but holds no
/// role in the back office.
pub const MSG_ACCESS_DENIED: &str = "No tienes permisos para acceder al sistema.";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: TokenPayload,
    user: Principal,
}

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
}

/// Credential operations bound to a gateway.
#[derive(Debug, Clone)]
pub struct AuthClient {
    gateway: Gateway,
}

impl AuthClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.gateway.credential_store().session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.credential_store().is_authenticated()
    }

    /// Dismiss the recorded display message.
    pub fn clear_error(&self) {
        self.gateway.credential_store().clear_error();
    }

    /// Exchange credentials for a token.
    ///
    /// Any failure, including a principal without access, leaves the session
    /// cleared with a display message and returns false.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let body = LoginRequest { username, password };
        let options = RequestOptions::default().without_session_guard();

        let outcome = match self.gateway.post(LOGIN_PATH, &body, options).await {
            Ok(response) => response.json::<LoginResponse>(),
            Err(e) => Err(e),
        };

        let login = match outcome {
            Ok(login) => login,
            Err(e) => {
                warn!(kind = %e.kind(), status = ?e.status(), "Login failed");
                self.fail(to_display_message(&e));
                return false;
            }
        };

        if !login.user.has_access() {
            warn!(principal_id = %login.user.id, "Login rejected: principal has no roles");
            self.fail(MSG_ACCESS_DENIED.to_string());
            return false;
        }

        let token = SecretString::from(login.token.access_token);
        log_storage(
            self.gateway
                .credential_store()
                .set_authenticated(token, login.user),
        );
        info!("Login succeeded");
        true
    }

    /// Drop credentials locally. Always succeeds; no network call is made.
    pub fn logout(&self) {
        log_storage(self.gateway.credential_store().clear(None));
        info!("Logged out");
    }

    /// Re-check the stored token against the backend.
    pub async fn validate_session(&self) -> bool {
        let store = self.gateway.credential_store();
        if store.token().is_none() {
            debug!("No token to validate");
            log_storage(store.clear(None));
            return false;
        }

        let outcome = match self.gateway.get(ME_PATH, RequestOptions::default()).await {
            Ok(response) => response.json::<Principal>(),
            Err(e) => Err(e),
        };

        let principal = match outcome {
            Ok(principal) => principal,
            Err(e) => {
                warn!(kind = %e.kind(), "Session validation failed");
                self.fail(to_display_message(&e));
                return false;
            }
        };

        if !principal.has_access() {
            warn!(principal_id = %principal.id, "Session rejected: principal has no roles");
            self.fail(MSG_ACCESS_DENIED.to_string());
            return false;
        }

        match store.replace_principal(principal) {
            Ok(kept) => kept,
            Err(e) => {
                warn!(error = %e, "Session validated but could not be persisted");
                true
            }
        }
    }

    /// Load the persisted session and validate it.
    ///
    /// Returns false when nothing was stored or the stored token is no
    /// longer accepted.
    pub async fn restore_session(&self) -> bool {
        match self.gateway.credential_store().restore() {
            Ok(true) => self.validate_session().await,
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                log_storage(self.gateway.credential_store().clear(None));
                false
            }
        }
    }

    fn fail(&self, message: String) {
        log_storage(self.gateway.credential_store().clear(Some(message)));
    }
}

fn log_storage<T>(result: Result<T, StorageError>) {
    if let Err(e) = result {
        warn!(error = %e, "Session storage out of sync with memory");
    }
}
