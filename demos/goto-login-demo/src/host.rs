//! Axum side of the GoTo handshake.
//!
//! [`AxumHost`] adapts one request to [`HandshakeHost`]: the correlation token
//! and the sign-in session live in an encrypted cookie jar, and redirects are
//! collected until the handler builds its response.

use crate::config::SessionConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::Uri;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use ras_identity_goto::{
    AuthenticationProperties, CallbackParams, ClaimType, ClaimsIdentity, GoToAuthError,
    GoToAuthResult, HandshakeHost, RequestOrigin,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use url::Url;

/// Scheme, host and path base every request is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicOrigin {
    scheme: String,
    host: String,
    path_base: String,
}

impl PublicOrigin {
    pub fn parse(public_url: &str) -> Result<Self> {
        let url = Url::parse(public_url)
            .with_context(|| format!("Invalid public URL '{}'", public_url))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Public URL '{}' must use http or https", public_url);
        }
        let Some(host) = url.host_str() else {
            anyhow::bail!("Public URL '{}' has no host", public_url);
        };

        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            path_base: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// Describe a request to the handshake handler.
    pub fn request(&self, uri: &Uri) -> RequestOrigin {
        let origin = RequestOrigin::new(&self.scheme, &self.host, uri.path())
            .with_path_base(&self.path_base);
        match uri.query() {
            Some(query) => origin.with_query(query),
            None => origin,
        }
    }
}

/// Browsers silently drop cookies larger than about 4 KiB.
const MAX_COOKIE_BYTES: usize = 4000;

/// Nonce and tag added by the private jar before base64.
const PRIVATE_COOKIE_OVERHEAD: usize = 12 + 16;

/// What the session cookie holds after a successful sign-in.
///
/// Only claim types and values are kept; value type and issuer are the same
/// for every GoTo claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authentication_type: String,
    pub claims: Vec<SessionClaim>,
    pub signed_in_at: DateTime<Utc>,
    #[serde(default)]
    pub items: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaim {
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub value: String,
}

impl SessionRecord {
    pub fn new(identity: &ClaimsIdentity, items: BTreeMap<String, String>) -> Self {
        Self {
            authentication_type: identity.authentication_type().to_string(),
            claims: identity
                .claims()
                .iter()
                .map(|claim| SessionClaim {
                    claim_type: claim.claim_type,
                    value: claim.value.clone(),
                })
                .collect(),
            signed_in_at: Utc::now(),
            items,
        }
    }

    pub fn value_of(&self, claim_type: ClaimType) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.claim_type == claim_type)
            .map(|claim| claim.value.as_str())
    }

    /// Read and decode the session cookie, if any.
    pub fn from_jar(jar: &PrivateCookieJar, cookie_name: &str) -> Option<Self> {
        let cookie = jar.get(cookie_name)?;
        match serde_json::from_str(cookie.value()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Discarding unreadable session cookie: {}", e);
                None
            }
        }
    }
}

pub struct AxumHost {
    origin: RequestOrigin,
    jar: PrivateCookieJar,
    session_cookie: String,
    secure_cookies: bool,
    redirect: Option<String>,
}

impl AxumHost {
    pub fn new(origin: RequestOrigin, jar: PrivateCookieJar, session: &SessionConfig) -> Self {
        Self {
            origin,
            jar,
            session_cookie: session.cookie_name.clone(),
            secure_cookies: session.secure_cookies,
            redirect: None,
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Finish the request: the collected redirect if there is one, otherwise
    /// `fallback`. Cookie changes are always written.
    pub fn into_response(self, fallback: impl IntoResponse) -> Response {
        match self.redirect {
            Some(location) => (self.jar, Redirect::to(&location)).into_response(),
            None => (self.jar, fallback).into_response(),
        }
    }

    // Lax, not Strict: the callback arrives as a cross-site top-level navigation.
    fn cookie(&self, name: &str, value: String) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }

    fn remove(&mut self, name: &str) {
        let removal = Cookie::build(name.to_string()).path("/");
        self.jar = self.jar.clone().remove(removal);
    }
}

#[async_trait]
impl HandshakeHost for AxumHost {
    fn origin(&self) -> RequestOrigin {
        self.origin.clone()
    }

    fn incoming_query(&self) -> CallbackParams {
        CallbackParams::parse(self.origin.query.as_deref().unwrap_or_default())
    }

    fn correlation_token(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn store_correlation_token(&mut self, name: &str, token: &str) {
        let cookie = self.cookie(name, token.to_string());
        self.jar = self.jar.clone().add(cookie);
    }

    fn clear_correlation_token(&mut self, name: &str) {
        self.remove(name);
    }

    fn issue_redirect(&mut self, location: &str) {
        self.redirect = Some(location.to_string());
    }

    async fn sign_in(
        &mut self,
        identity: ClaimsIdentity,
        properties: &AuthenticationProperties,
    ) -> GoToAuthResult<()> {
        let record = SessionRecord::new(&identity, properties.items.clone());

        let value = serde_json::to_string(&record)
            .map_err(|e| GoToAuthError::SignInFailed(e.to_string()))?;

        let encoded_len = self.session_cookie.len()
            + 1
            + 4 * (value.len() + PRIVATE_COOKIE_OVERHEAD).div_ceil(3);
        if encoded_len > MAX_COOKIE_BYTES {
            return Err(GoToAuthError::SignInFailed(format!(
                "session cookie would be {} bytes, limit is {}",
                encoded_len, MAX_COOKIE_BYTES
            )));
        }

        let cookie = self.cookie(&self.session_cookie, value);
        self.jar = self.jar.clone().add(cookie);

        info!(
            "Signed in {} as {}",
            identity.name().unwrap_or("unknown"),
            record.authentication_type
        );
        Ok(())
    }
}

/// Clear the session cookie.
pub fn sign_out(jar: PrivateCookieJar, cookie_name: &str) -> PrivateCookieJar {
    jar.remove(Cookie::build(cookie_name.to_string()).path("/"))
}
