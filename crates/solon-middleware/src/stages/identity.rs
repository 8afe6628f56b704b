//! Identity resolution stage.
//!
//! Turns the credential presented with a request into an [`Identity`].
//! Resolution never fails the request: a missing or malformed credential
//! yields [`Identity::Anonymous`], and operations that need a caller reject
//! anonymous requests later, in the authorization stage.
//!
//! ## Sources
//!
//! Checked in order, the first header present wins:
//!
//! 1. `x-caller-identity`: a JSON document discriminated by `type`
//!    (`spiffe`, `user`, `api_key`)
//! 2. `x-spiffe-id`: a `spiffe://<trust-domain>/<path>` URI
//! 3. `x-api-key`: the key identifier

use http::header::{HeaderMap, HeaderValue};
use solon_core::Identity;
use tracing::warn;

/// Header carrying a caller identity token.
pub const CALLER_IDENTITY_HEADER: &str = "x-caller-identity";

/// Header for SPIFFE ID (set by mTLS termination).
pub const SPIFFE_ID_HEADER: &str = "x-spiffe-id";

/// Header for API key identifiers.
pub const API_KEY_HEADER: &str = "x-api-key";

const SPIFFE_SCHEME: &str = "spiffe://";

/// Resolves caller identities from request credentials.
///
/// # Example
///
/// ```
/// use solon_core::Identity;
/// use solon_middleware::stages::identity::IdentityResolver;
///
/// let resolver = IdentityResolver::new();
/// let identity = resolver.resolve(Some(r#"{"type":"user","user_id":"u-1","roles":["admin"]}"#));
/// assert_eq!(identity, Identity::user("u-1", ["admin"]));
///
/// assert_eq!(resolver.resolve(Some("not json")), Identity::Anonymous);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    /// When set, SPIFFE identities from other trust domains are dropped.
    trusted_trust_domain: Option<String>,
}

impl IdentityResolver {
    /// Creates a resolver that accepts any trust domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver that only accepts SPIFFE IDs from `trust_domain`.
    #[must_use]
    pub fn with_trust_domain(trust_domain: impl Into<String>) -> Self {
        Self {
            trusted_trust_domain: Some(trust_domain.into()),
        }
    }

    /// Resolves an identity token.
    ///
    /// An absent or blank token is anonymous. A token that does not decode,
    /// names an unknown kind or carries an empty identifier is logged and
    /// treated as anonymous.
    pub fn resolve(&self, token: Option<&str>) -> Identity {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Identity::Anonymous;
        };

        match serde_json::from_str::<Identity>(token) {
            Ok(identity) => self.accept(identity),
            Err(error) => {
                warn!(
                    header = CALLER_IDENTITY_HEADER,
                    error = %error,
                    "Malformed identity token, treating caller as anonymous"
                );
                Identity::Anonymous
            }
        }
    }

    /// Resolves the caller from request headers.
    pub fn resolve_headers(&self, headers: &HeaderMap) -> Identity {
        if let Some(value) = headers.get(CALLER_IDENTITY_HEADER) {
            return match header_text(value, CALLER_IDENTITY_HEADER) {
                Some(token) => self.resolve(Some(token)),
                None => Identity::Anonymous,
            };
        }

        if let Some(value) = headers.get(SPIFFE_ID_HEADER) {
            return header_text(value, SPIFFE_ID_HEADER)
                .and_then(parse_spiffe_id)
                .map_or(Identity::Anonymous, |identity| self.accept(identity));
        }

        if let Some(value) = headers.get(API_KEY_HEADER) {
            return match header_text(value, API_KEY_HEADER).map(str::trim) {
                Some(key_id) if !key_id.is_empty() => Identity::api_key(key_id),
                _ => Identity::Anonymous,
            };
        }

        Identity::Anonymous
    }

    fn accept(&self, identity: Identity) -> Identity {
        match &identity {
            Identity::Spiffe { trust_domain, .. } => {
                if trust_domain.is_empty() {
                    warn!("SPIFFE identity without trust domain, treating caller as anonymous");
                    return Identity::Anonymous;
                }
                if let Some(trusted) = &self.trusted_trust_domain {
                    if trust_domain != trusted {
                        warn!(
                            trust_domain = %trust_domain,
                            trusted = %trusted,
                            "SPIFFE identity from untrusted domain, treating caller as anonymous"
                        );
                        return Identity::Anonymous;
                    }
                }
            }
            Identity::User { user_id, .. } if user_id.trim().is_empty() => {
                warn!("User identity without user_id, treating caller as anonymous");
                return Identity::Anonymous;
            }
            Identity::ApiKey { key_id } if key_id.trim().is_empty() => {
                warn!("API key identity without key_id, treating caller as anonymous");
                return Identity::Anonymous;
            }
            _ => {}
        }
        identity
    }
}

fn header_text<'a>(value: &'a HeaderValue, header: &'static str) -> Option<&'a str> {
    match value.to_str() {
        Ok(text) => Some(text),
        Err(_) => {
            warn!(header, "Non-ASCII credential header, treating caller as anonymous");
            None
        }
    }
}

/// Splits `spiffe://<trust-domain><path>` into its parts.
fn parse_spiffe_id(raw: &str) -> Option<Identity> {
    let Some(rest) = raw.trim().strip_prefix(SPIFFE_SCHEME) else {
        warn!(header = SPIFFE_ID_HEADER, "Not a spiffe:// URI, treating caller as anonymous");
        return None;
    };

    let (trust_domain, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    if trust_domain.is_empty() {
        warn!(header = SPIFFE_ID_HEADER, "SPIFFE ID without trust domain, treating caller as anonymous");
        return None;
    }

    Some(Identity::spiffe(trust_domain, path))
}
