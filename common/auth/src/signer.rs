use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Issues HS256 tokens carrying the user id (sub) and username.
#[derive(Clone)]
pub struct TokenSigner {
    config: JwtConfig,
    key: EncodingKey,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
    /// Lifetime as reported to clients, e.g. "24h".
    pub expires_in_label: String,
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    sub: String,
    username: &'a str,
    iss: &'a str,
    iat: i64,
    exp: i64,
}

impl TokenSigner {
    pub fn new(config: JwtConfig) -> Self {
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        Self { config, key }
    }

    pub fn issue(&self, user_id: i64, username: &str) -> AuthResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(self.config.ttl_seconds);
        let claims = TokenClaims {
            sub: user_id.to_string(),
            username,
            iss: &self.config.issuer,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: self.config.ttl_seconds,
            expires_in_label: self.config.ttl_label(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_reports_configured_lifetime() {
        let signer = TokenSigner::new(JwtConfig::new("stock-service", "secret"));
        let before = Utc::now();
        let issued = signer.issue(1, "ada").expect("issue");
        assert_eq!(issued.expires_in, 86_400);
        assert_eq!(issued.expires_in_label, "24h");
        assert!(issued.expires_at >= before + Duration::seconds(86_399));
        assert_eq!(issued.token.split('.').count(), 3);
    }
}
