use std::fmt;

/// Runtime configuration for issuing and verifying bearer tokens.
#[derive(Clone)]
pub struct JwtConfig {
    /// Issuer claim (iss) written on issue and required on verify.
    pub issuer: String,
    /// Shared HMAC secret (HS256).
    pub secret: String,
    /// Fixed lifetime of every issued token.
    pub ttl_seconds: i64,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    /// Construct config with sensible defaults (24 hour tokens, 30 second leeway).
    pub fn new(issuer: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            secret: secret.into(),
            ttl_seconds: 24 * 60 * 60,
            leeway_seconds: 30,
        }
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_ttl(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Human readable lifetime reported to clients ("24h", "30m", "45s").
    pub fn ttl_label(&self) -> String {
        let secs = self.ttl_seconds;
        if secs > 0 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs > 0 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{secs}s")
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_label_prefers_largest_unit() {
        let config = JwtConfig::new("iss", "secret");
        assert_eq!(config.ttl_label(), "24h");
        assert_eq!(config.clone().with_ttl(90 * 60).ttl_label(), "90m");
        assert_eq!(config.with_ttl(45).ttl_label(), "45s");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = JwtConfig::new("iss", "super-secret-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
    }
}
