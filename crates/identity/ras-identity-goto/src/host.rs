//! The capabilities the handshake needs from the hosting request pipeline.

use crate::error::GoToAuthResult;
use crate::properties::AuthenticationProperties;
use crate::types::CallbackParams;
use async_trait::async_trait;
use ras_identity_core::ClaimsIdentity;

/// Where the current request arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    /// Host with optional port.
    pub host: String,
    /// Mount point of the application, empty or starting with `/`.
    pub path_base: String,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path_base: String::new(),
            path: path.into(),
            query: None,
        }
    }

    pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
        self.path_base = path_base.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// `scheme://host` followed by the path base.
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path_base)
    }

    /// Absolute URL of `path` under this application.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Absolute URL of the current request, query included.
    pub fn current_url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.absolute(&self.path), query),
            None => self.absolute(&self.path),
        }
    }
}

/// Request-pipeline capabilities consumed by the handshake.
///
/// One value per request. The correlation methods address a short-lived
/// per-client store, typically a cookie.
#[async_trait]
pub trait HandshakeHost: Send {
    fn origin(&self) -> RequestOrigin;

    fn incoming_query(&self) -> CallbackParams;

    fn correlation_token(&self, name: &str) -> Option<String>;

    fn store_correlation_token(&mut self, name: &str, token: &str);

    fn clear_correlation_token(&mut self, name: &str);

    fn issue_redirect(&mut self, location: &str);

    /// Hand the identity to the host's session mechanism.
    async fn sign_in(
        &mut self,
        identity: ClaimsIdentity,
        properties: &AuthenticationProperties,
    ) -> GoToAuthResult<()>;
}
