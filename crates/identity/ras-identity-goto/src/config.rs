//! GoTo handshake configuration.

use crate::error::{GoToAuthError, GoToAuthResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_AUTHENTICATION_TYPE: &str = "GoTo";
pub const DEFAULT_CALLBACK_PATH: &str = "/signin-goto";
pub const DEFAULT_SIGN_IN_AS: &str = "ExternalCookie";

pub const AUTHORIZATION_ENDPOINT: &str = "https://authentication.logmeininc.com/oauth/authorize";
pub const TOKEN_ENDPOINT: &str = "https://authentication.logmeininc.com/oauth/token";
pub const USERINFO_ENDPOINT: &str = "https://api.getgo.com/identity/v1/Users/me";

/// Configuration for the GoTo authorization code handshake.
///
/// Only `client_id` and `client_secret` are required; everything else has a
/// default suitable for the production GoTo endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoToAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_authentication_type")]
    pub authentication_type: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// Label the identity is signed in under. Falls back to [`DEFAULT_SIGN_IN_AS`].
    #[serde(default)]
    pub sign_in_as_authentication_type: Option<String>,
    #[serde(default = "default_backchannel_timeout")]
    pub backchannel_timeout_seconds: u64,
    /// Secret the state key is derived from. A random key is generated per
    /// process when absent, which invalidates in-flight handshakes on restart.
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_userinfo_endpoint")]
    pub userinfo_endpoint: String,
    #[serde(default)]
    pub correlation_cookie_name: Option<String>,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_authentication_type() -> String {
    DEFAULT_AUTHENTICATION_TYPE.to_string()
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

fn default_backchannel_timeout() -> u64 {
    60
}

fn default_authorization_endpoint() -> String {
    AUTHORIZATION_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_userinfo_endpoint() -> String {
    USERINFO_ENDPOINT.to_string()
}

fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}

impl GoToAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authentication_type: default_authentication_type(),
            callback_path: default_callback_path(),
            sign_in_as_authentication_type: None,
            backchannel_timeout_seconds: default_backchannel_timeout(),
            state_key: None,
            authorization_endpoint: default_authorization_endpoint(),
            token_endpoint: default_token_endpoint(),
            userinfo_endpoint: default_userinfo_endpoint(),
            correlation_cookie_name: None,
            max_response_bytes: default_max_response_bytes(),
        }
    }

    pub fn with_authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = authentication_type.into();
        self
    }

    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    pub fn with_sign_in_as(mut self, authentication_type: impl Into<String>) -> Self {
        self.sign_in_as_authentication_type = Some(authentication_type.into());
        self
    }

    pub fn with_backchannel_timeout(mut self, seconds: u64) -> Self {
        self.backchannel_timeout_seconds = seconds;
        self
    }

    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = Some(key.into());
        self
    }

    /// Point all three provider endpoints at another base URL.
    pub fn with_endpoints(
        mut self,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        userinfo_endpoint: impl Into<String>,
    ) -> Self {
        self.authorization_endpoint = authorization_endpoint.into();
        self.token_endpoint = token_endpoint.into();
        self.userinfo_endpoint = userinfo_endpoint.into();
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn backchannel_timeout(&self) -> Duration {
        Duration::from_secs(self.backchannel_timeout_seconds)
    }

    pub fn sign_in_as(&self) -> &str {
        self.sign_in_as_authentication_type
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(DEFAULT_SIGN_IN_AS)
    }

    pub fn correlation_cookie_name(&self) -> String {
        match &self.correlation_cookie_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("ras.correlation.{}", self.authentication_type.to_lowercase()),
        }
    }

    /// Reject configurations the handshake cannot start with.
    pub fn validate(&self) -> GoToAuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(GoToAuthError::ConfigError(
                "client_id must be provided".to_string(),
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(GoToAuthError::ConfigError(
                "client_secret must be provided".to_string(),
            ));
        }
        if !self.callback_path.starts_with('/') {
            return Err(GoToAuthError::ConfigError(format!(
                "callback_path must start with '/': {}",
                self.callback_path
            )));
        }
        if self.backchannel_timeout_seconds == 0 {
            return Err(GoToAuthError::ConfigError(
                "backchannel_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        for endpoint in [
            &self.authorization_endpoint,
            &self.token_endpoint,
            &self.userinfo_endpoint,
        ] {
            url::Url::parse(endpoint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GoToAuthConfig::new("id", "secret");
        assert_eq!(config.authentication_type, "GoTo");
        assert_eq!(config.callback_path, "/signin-goto");
        assert_eq!(config.sign_in_as(), DEFAULT_SIGN_IN_AS);
        assert_eq!(config.backchannel_timeout(), Duration::from_secs(60));
        assert_eq!(config.correlation_cookie_name(), "ras.correlation.goto");
        assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let result = GoToAuthConfig::new("", "secret").validate();
        assert!(matches!(result, Err(GoToAuthError::ConfigError(msg)) if msg.contains("client_id")));

        let result = GoToAuthConfig::new("id", "   ").validate();
        assert!(
            matches!(result, Err(GoToAuthError::ConfigError(msg)) if msg.contains("client_secret"))
        );
    }

    #[test]
    fn test_invalid_callback_path_and_endpoint() {
        let result = GoToAuthConfig::new("id", "secret")
            .with_callback_path("signin")
            .validate();
        assert!(matches!(result, Err(GoToAuthError::ConfigError(_))));

        let result = GoToAuthConfig::new("id", "secret")
            .with_endpoints("not a url", TOKEN_ENDPOINT, USERINFO_ENDPOINT)
            .validate();
        assert!(matches!(result, Err(GoToAuthError::UrlError(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "client_id": "abc",
            "client_secret": "xyz",
            "sign_in_as_authentication_type": "Cookies"
        }"#;

        let config: GoToAuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.client_id, "abc");
        assert_eq!(config.sign_in_as(), "Cookies");
        assert_eq!(config.token_endpoint, TOKEN_ENDPOINT);
        assert_eq!(config.backchannel_timeout_seconds, 60);
    }

    #[test]
    fn test_builder_methods() {
        let config = GoToAuthConfig::new("id", "secret")
            .with_authentication_type("GoToMeeting")
            .with_callback_path("/auth/goto")
            .with_sign_in_as("Cookies")
            .with_backchannel_timeout(5)
            .with_state_key("k")
            .with_max_response_bytes(1024);

        assert_eq!(config.correlation_cookie_name(), "ras.correlation.gotomeeting");
        assert_eq!(config.callback_path, "/auth/goto");
        assert_eq!(config.sign_in_as(), "Cookies");
        assert_eq!(config.backchannel_timeout(), Duration::from_secs(5));
        assert_eq!(config.state_key.as_deref(), Some("k"));
        assert_eq!(config.max_response_bytes, 1024);
    }
}
