//! Caller identity.
//!
//! [`Identity`] is a closed set of caller kinds. Every request carries exactly
//! one variant; callers that present nothing usable are [`Identity::Anonymous`].
//! The serialized form is tagged by a `type` discriminant whose values are
//! `spiffe`, `user`, `api_key` and `absent`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resolved identity of a caller.
///
/// # Example
///
/// ```
/// use solon_core::Identity;
///
/// let identity = Identity::user("u-123", ["admin"]);
/// assert_eq!(identity.kind(), "user");
/// assert_eq!(identity.log_id(), "user:u-123");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    /// A workload identified by a SPIFFE ID.
    Spiffe {
        /// Trust domain, e.g. `example.org`.
        trust_domain: String,
        /// Workload path, e.g. `/ns/prod/sa/orders`.
        path: String,
    },
    /// An end user.
    User {
        /// Stable user identifier.
        user_id: String,
        /// Roles granted to the user.
        #[serde(default)]
        roles: Vec<String>,
    },
    /// A caller holding an API key.
    ApiKey {
        /// Key identifier (never the secret).
        key_id: String,
    },
    /// No usable credential was presented.
    #[default]
    #[serde(rename = "absent")]
    Anonymous,
}

impl Identity {
    /// Creates a SPIFFE identity.
    #[must_use]
    pub fn spiffe(trust_domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Spiffe {
            trust_domain: trust_domain.into(),
            path: path.into(),
        }
    }

    /// Creates a user identity.
    #[must_use]
    pub fn user<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::User {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an API key identity.
    #[must_use]
    pub fn api_key(key_id: impl Into<String>) -> Self {
        Self::ApiKey {
            key_id: key_id.into(),
        }
    }

    /// Returns the discriminant: `spiffe`, `user`, `api_key` or `absent`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Spiffe { .. } => "spiffe",
            Self::User { .. } => "user",
            Self::ApiKey { .. } => "api_key",
            Self::Anonymous => "absent",
        }
    }

    /// Returns `true` for [`Identity::Anonymous`].
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains secrets.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Spiffe { trust_domain, path } => format!("spiffe://{trust_domain}{path}"),
            Self::User { user_id, .. } => format!("user:{user_id}"),
            Self::ApiKey { key_id } => format!("apikey:{key_id}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }

    /// Returns the roles used for role-based decisions.
    ///
    /// Workloads get `spiffe:<trust_domain>`, API keys get `api_key:<key_id>`.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        match self {
            Self::Spiffe { trust_domain, .. } => vec![format!("spiffe:{trust_domain}")],
            Self::User { roles, .. } => roles.clone(),
            Self::ApiKey { key_id } => vec![format!("api_key:{key_id}")],
            Self::Anonymous => Vec::new(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants() {
        assert_eq!(Identity::spiffe("example.org", "/orders").kind(), "spiffe");
        assert_eq!(Identity::user("u1", Vec::<String>::new()).kind(), "user");
        assert_eq!(Identity::api_key("k1").kind(), "api_key");
        assert_eq!(Identity::Anonymous.kind(), "absent");
    }

    #[test]
    fn test_log_ids() {
        assert_eq!(
            Identity::spiffe("example.org", "/ns/prod/sa/orders").log_id(),
            "spiffe://example.org/ns/prod/sa/orders"
        );
        assert_eq!(Identity::user("u-123", ["admin"]).log_id(), "user:u-123");
        assert_eq!(Identity::api_key("k-9").log_id(), "apikey:k-9");
        assert_eq!(Identity::Anonymous.log_id(), "anonymous");
    }

    #[test]
    fn test_roles() {
        assert_eq!(
            Identity::user("u1", ["admin", "reader"]).roles(),
            vec!["admin", "reader"]
        );
        assert_eq!(
            Identity::spiffe("example.org", "/svc").roles(),
            vec!["spiffe:example.org"]
        );
        assert_eq!(Identity::api_key("k1").roles(), vec!["api_key:k1"]);
        assert!(Identity::Anonymous.roles().is_empty());
    }

    #[test]
    fn test_serialization_uses_type_tag() {
        let identity = Identity::user("u123", ["admin"]);
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("\"type\":\"user\""));
        assert!(json.contains("\"user_id\":\"u123\""));

        let parsed: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);

        let anon = serde_json::to_string(&Identity::Anonymous).unwrap();
        assert_eq!(anon, r#"{"type":"absent"}"#);
    }

    #[test]
    fn test_user_roles_default_to_empty() {
        let parsed: Identity = serde_json::from_str(r#"{"type":"user","user_id":"u1"}"#).unwrap();
        assert_eq!(parsed, Identity::user("u1", Vec::<String>::new()));
    }
}
