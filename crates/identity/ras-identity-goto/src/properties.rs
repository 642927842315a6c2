//! Per-handshake property bag carried through the `state` parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mutable property bag created when a challenge is issued and handed back
/// to the host when the handshake completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationProperties {
    /// Where the user returns once the handshake completes.
    pub redirect_uri: Option<String>,
    /// Set by the correlation guard when the challenge is issued.
    pub correlation_token: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_persistent: bool,
    /// Host-defined extras.
    pub items: BTreeMap<String, String>,
}

impl AuthenticationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.insert(key.into(), value.into());
        self
    }

    pub fn item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// True when no redirect target has been chosen yet.
    pub fn needs_redirect_uri(&self) -> bool {
        self.redirect_uri.as_deref().is_none_or(str::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_items() {
        let properties = AuthenticationProperties::new()
            .with_redirect_uri("https://app.example.com/dashboard")
            .with_item("tenant", "acme");

        assert_eq!(
            properties.redirect_uri.as_deref(),
            Some("https://app.example.com/dashboard")
        );
        assert_eq!(properties.item("tenant"), Some("acme"));
        assert_eq!(properties.item("missing"), None);
        assert!(!properties.needs_redirect_uri());
    }

    #[test]
    fn test_empty_redirect_counts_as_missing() {
        let properties = AuthenticationProperties::new().with_redirect_uri("");
        assert!(properties.needs_redirect_uri());
        assert!(AuthenticationProperties::new().needs_redirect_uri());
    }

    #[test]
    fn test_deserialize_partial_bag() {
        let properties: AuthenticationProperties =
            serde_json::from_str(r#"{"redirect_uri":"/home"}"#).unwrap();
        assert_eq!(properties.redirect_uri.as_deref(), Some("/home"));
        assert!(properties.items.is_empty());
        assert!(!properties.is_persistent);
    }
}
