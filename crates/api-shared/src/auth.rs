//! Bearer-token issuance and verification.
//!
//! Login is passwordless: a username is exchanged for a signed HS256 token
//! carrying `{id, username}`, valid for 30 days. What happens to requests
//! without a valid token is a deployment decision: `permissive` mode
//! degrades them to the anonymous `public` identity (the clinic's shared
//! tablets rely on this), `strict` mode rejects them. The toggle exists so
//! flipping the trust boundary never requires touching handlers.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Token lifetime.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

/// Claims carried by an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
}

/// How requests without a valid bearer token are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Degrade to the anonymous `public` identity.
    #[default]
    Permissive,
    /// Reject with an authentication error.
    Strict,
}

impl AuthMode {
    /// Parse the mode from an optional environment value.
    ///
    /// `None` or empty/whitespace defaults to permissive.
    pub fn from_env_value(value: Option<String>) -> Result<Self, String> {
        let value = value
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        match value.as_deref() {
            None | Some("permissive") => Ok(AuthMode::Permissive),
            Some("strict") => Ok(AuthMode::Strict),
            Some(other) => Err(format!(
                "invalid auth mode {other:?} (expected \"strict\" or \"permissive\")"
            )),
        }
    }
}

/// The resolved identity of a request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Identity {
    pub user_id: Option<i64>,
    pub username: String,
}

impl Identity {
    /// The anonymous fallback identity.
    pub fn public() -> Self {
        Self {
            user_id: None,
            username: "public".into(),
        }
    }

    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: Some(claims.id),
            username: claims.username,
        }
    }
}

/// Token signing/verification configuration, resolved at startup.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub mode: AuthMode,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, mode: AuthMode) -> Self {
        Self {
            secret: secret.into(),
            mode,
        }
    }

    /// Sign a token for a user.
    pub fn issue_token(&self, id: i64, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (chrono::Utc::now() + chrono::Duration::days(TOKEN_VALIDITY_DAYS)).timestamp();
        let claims = Claims {
            id,
            username: username.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Verify a token, returning its claims if valid and unexpired.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .ok()
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let cfg = AuthConfig::new("test-secret", AuthMode::Permissive);
        let token = cfg.issue_token(7, "soklin").expect("token issued");
        let claims = cfg.verify(&token).expect("token verifies");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "soklin");
    }

    #[test]
    fn tampered_tokens_do_not_verify() {
        let cfg = AuthConfig::new("test-secret", AuthMode::Permissive);
        let other = AuthConfig::new("other-secret", AuthMode::Permissive);
        let token = other.issue_token(7, "soklin").unwrap();
        assert!(cfg.verify(&token).is_none());
        assert!(cfg.verify("not-a-token").is_none());
    }

    #[test]
    fn mode_parses_from_env_values() {
        assert_eq!(AuthMode::from_env_value(None).unwrap(), AuthMode::Permissive);
        assert_eq!(
            AuthMode::from_env_value(Some(" STRICT ".into())).unwrap(),
            AuthMode::Strict
        );
        assert!(AuthMode::from_env_value(Some("open".into())).is_err());
    }
}
