//! CSRF correlation between the challenge and the callback.

use crate::host::HandshakeHost;
use crate::properties::AuthenticationProperties;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, thread_rng};
use subtle::ConstantTimeEq;

/// Issues a correlation token into the property bag and the host's
/// per-client store, and later checks that both still agree.
#[derive(Debug, Clone)]
pub struct CorrelationGuard {
    cookie_name: String,
}

impl CorrelationGuard {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Generate a fresh token, store it in `properties` and hand it to the host.
    pub fn generate<H>(&self, host: &mut H, properties: &mut AuthenticationProperties) -> String
    where
        H: HandshakeHost + ?Sized,
    {
        let token = Self::new_token();
        properties.correlation_token = Some(token.clone());
        host.store_correlation_token(&self.cookie_name, &token);
        token
    }

    /// True only when both tokens are present, non-empty and identical.
    pub fn validate(&self, properties: &AuthenticationProperties, external: Option<&str>) -> bool {
        match (properties.correlation_token.as_deref(), external) {
            (Some(expected), Some(actual)) if !expected.is_empty() => {
                expected.len() == actual.len()
                    && bool::from(expected.as_bytes().ct_eq(actual.as_bytes()))
            }
            _ => false,
        }
    }

    fn new_token() -> String {
        let mut bytes = [0u8; 32];
        thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::RecordingHost;

    #[test]
    fn test_generate_stores_token_in_both_places() {
        let guard = CorrelationGuard::new("ras.correlation.goto");
        let mut host = RecordingHost::new("https://app.example.com", "/private");
        let mut properties = AuthenticationProperties::new();

        let token = guard.generate(&mut host, &mut properties);

        assert_eq!(properties.correlation_token.as_deref(), Some(token.as_str()));
        assert_eq!(host.cookie("ras.correlation.goto"), Some(token.as_str()));
        // 32 random bytes, base64url without padding
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn test_tokens_are_unique() {
        let guard = CorrelationGuard::new("c");
        let mut host = RecordingHost::new("https://app.example.com", "/");
        let tokens: std::collections::HashSet<String> = (0..50)
            .map(|_| guard.generate(&mut host, &mut AuthenticationProperties::new()))
            .collect();
        assert_eq!(tokens.len(), 50);
    }

    #[test]
    fn test_validate_requires_exact_match() {
        let guard = CorrelationGuard::new("c");
        let mut properties = AuthenticationProperties::new();
        properties.correlation_token = Some("abc123".to_string());

        assert!(guard.validate(&properties, Some("abc123")));
        assert!(!guard.validate(&properties, Some("abc124")));
        assert!(!guard.validate(&properties, Some("abc12")));
        assert!(!guard.validate(&properties, Some("ABC123")));
        assert!(!guard.validate(&properties, Some("")));
        assert!(!guard.validate(&properties, None));
    }

    #[test]
    fn test_validate_fails_without_issued_token() {
        let guard = CorrelationGuard::new("c");
        let mut properties = AuthenticationProperties::new();
        assert!(!guard.validate(&properties, Some("anything")));

        properties.correlation_token = Some(String::new());
        assert!(!guard.validate(&properties, Some("")));
    }
}
