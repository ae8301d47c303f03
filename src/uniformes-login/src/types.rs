//! Type definitions for session data.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A (resource, role) pair granting privilege over a single resource,
/// typically one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScopedRoleWire")]
pub struct ScopedRole {
    /// Identifier of the resource the role applies to.
    pub resource_id: String,
    /// Role name on that resource (e.g. "admin", "seller").
    pub role_name: String,
}

/// Authenticated user's identity and authorization attributes.
///
/// Immutable once fetched; re-validation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PrincipalWire")]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub is_super_admin: bool,
    pub scoped_roles: Vec<ScopedRole>,
}

impl Principal {
    /// Whether this principal may use the back office at all: super-admins
    /// always, everyone else only with at least one scoped role.
    pub fn has_access(&self) -> bool {
        self.is_super_admin || !self.scoped_roles.is_empty()
    }

    /// Role held on the given resource, if any.
    pub fn role_for(&self, resource_id: &str) -> Option<&str> {
        self.scoped_roles
            .iter()
            .find(|r| r.resource_id == resource_id)
            .map(|r| r.role_name.as_str())
    }
}

/// Identifiers arrive as strings or integers depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(s) => s,
            IdValue::Number(n) => n.to_string(),
        }
    }
}

/// Accepts both the server's user shape and the persisted shape.
#[derive(Deserialize)]
struct PrincipalWire {
    id: IdValue,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "is_superuser")]
    is_super_admin: bool,
    #[serde(default, alias = "school_roles")]
    scoped_roles: Vec<ScopedRole>,
}

impl From<PrincipalWire> for Principal {
    fn from(wire: PrincipalWire) -> Self {
        let display_name = wire
            .display_name
            .or(wire.full_name)
            .or(wire.username)
            .unwrap_or_default();
        Self {
            id: wire.id.into(),
            display_name,
            is_super_admin: wire.is_super_admin,
            scoped_roles: wire.scoped_roles,
        }
    }
}

#[derive(Deserialize)]
struct ScopedRoleWire {
    #[serde(alias = "school_id")]
    resource_id: IdValue,
    #[serde(alias = "role")]
    role_name: String,
}

impl From<ScopedRoleWire> for ScopedRole {
    fn from(wire: ScopedRoleWire) -> Self {
        Self {
            resource_id: wire.resource_id.into(),
            role_name: wire.role_name,
        }
    }
}

/// Session state for the running process.
///
/// `is_authenticated` holds only when both principal and token are present
/// and the last validation succeeded. Sessions are replaced as whole values.
#[derive(Clone, Default)]
pub struct Session {
    principal: Option<Principal>,
    token: Option<SecretString>,
    is_authenticated: bool,
    last_error: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("is_authenticated", &self.is_authenticated)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Session {
    /// A validated session.
    pub fn authenticated(token: SecretString, principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            token: Some(token),
            is_authenticated: true,
            last_error: None,
        }
    }

    /// A cleared session carrying a display message.
    pub fn cleared_with_error(message: impl Into<String>) -> Self {
        Self {
            last_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Rebuild a session from its persisted form. The authenticated flag is
    /// only kept when both token and principal survived.
    pub fn from_persisted(persisted: PersistedSession) -> Self {
        let token = persisted.token.filter(|t| !t.is_empty());
        let is_authenticated =
            persisted.is_authenticated && token.is_some() && persisted.principal.is_some();
        Self {
            principal: persisted.principal,
            token: token.map(SecretString::from),
            is_authenticated,
            last_error: None,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Bearer token (exposes the secret - use sparingly).
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose_secret())
    }

    pub(crate) fn secret_token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True when no credential material is held.
    pub fn is_cleared(&self) -> bool {
        self.token.is_none() && self.principal.is_none() && !self.is_authenticated
    }

    pub(crate) fn without_error(&self) -> Self {
        Self {
            last_error: None,
            ..self.clone()
        }
    }

    /// Convert to the durable form.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.token().map(str::to_string),
            principal: self.principal.clone(),
            is_authenticated: self.is_authenticated,
        }
    }
}

/// Durable session blob written under the storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seller() -> Principal {
        Principal {
            id: "u-7".to_string(),
            display_name: "Ana".to_string(),
            is_super_admin: false,
            scoped_roles: vec![ScopedRole {
                resource_id: "school-1".to_string(),
                role_name: "seller".to_string(),
            }],
        }
    }

    #[test]
    fn test_principal_from_server_shape() {
        let json = serde_json::json!({
            "id": 42,
            "username": "admin",
            "full_name": "Admin General",
            "is_superuser": true,
            "school_roles": [{"school_id": "s-1", "role": "admin"}]
        });
        let principal: Principal = serde_json::from_value(json).unwrap();
        assert_eq!(principal.id, "42");
        assert_eq!(principal.display_name, "Admin General");
        assert!(principal.is_super_admin);
        assert_eq!(principal.role_for("s-1"), Some("admin"));
    }

    #[test]
    fn test_principal_display_name_falls_back_to_username() {
        let json = serde_json::json!({"id": "x", "username": "maria"});
        let principal: Principal = serde_json::from_value(json).unwrap();
        assert_eq!(principal.display_name, "maria");
        assert!(principal.scoped_roles.is_empty());
    }

    #[test]
    fn test_has_access() {
        let mut principal = seller();
        assert!(principal.has_access());
        principal.scoped_roles.clear();
        assert!(!principal.has_access());
        principal.is_super_admin = true;
        assert!(principal.has_access());
    }

    #[test]
    fn test_persisted_round_trip_keeps_principal() {
        let session = Session::authenticated(SecretString::from("tok-123".to_string()), seller());
        let json = serde_json::to_string(&session.to_persisted()).unwrap();
        let restored: PersistedSession = serde_json::from_str(&json).unwrap();
        let session = Session::from_persisted(restored);
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("tok-123"));
        assert_eq!(session.principal(), Some(&seller()));
    }

    #[test]
    fn test_from_persisted_without_principal_is_not_authenticated() {
        let session = Session::from_persisted(PersistedSession {
            token: Some("tok".to_string()),
            principal: None,
            is_authenticated: true,
        });
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), Some("tok"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::authenticated(SecretString::from("super-secret".to_string()), seller());
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
