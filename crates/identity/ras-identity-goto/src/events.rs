//! Hooks letting the host observe and adjust a handshake.

use crate::error::GoToAuthResult;
use crate::properties::AuthenticationProperties;
use crate::types::{TokenResponse, UserProfile};
use async_trait::async_trait;
use ras_identity_core::ClaimsIdentity;
use std::time::Duration;

/// Everything known about the user once the code exchange succeeded.
#[derive(Debug, Clone)]
pub struct AuthenticatedContext {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub profile: Option<UserProfile>,
    /// The mapped identity. Hooks may add, remove or replace claims.
    pub identity: ClaimsIdentity,
    pub properties: AuthenticationProperties,
}

impl AuthenticatedContext {
    pub(crate) fn new(
        token: TokenResponse,
        profile: Option<UserProfile>,
        identity: ClaimsIdentity,
        properties: AuthenticationProperties,
    ) -> Self {
        let expires_in = token.expires_in_duration();
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in,
            email: token.principal,
            user_id: profile.as_ref().and_then(|p| p.id.clone()),
            given_name: profile.as_ref().and_then(|p| p.given_name().map(String::from)),
            surname: profile.as_ref().and_then(|p| p.family_name().map(String::from)),
            profile,
            identity,
            properties,
        }
    }
}

/// State of the callback request just before it is completed.
#[derive(Debug, Clone)]
pub struct ReturnEndpointContext {
    /// Label the identity will be signed in under. `None` skips sign-in.
    pub sign_in_as_authentication_type: Option<String>,
    pub redirect_uri: Option<String>,
    /// `None` when the handshake failed.
    pub identity: Option<ClaimsIdentity>,
    pub properties: AuthenticationProperties,
    request_completed: bool,
}

impl ReturnEndpointContext {
    pub(crate) fn new(
        sign_in_as_authentication_type: Option<String>,
        identity: Option<ClaimsIdentity>,
        properties: AuthenticationProperties,
    ) -> Self {
        Self {
            sign_in_as_authentication_type,
            redirect_uri: properties.redirect_uri.clone(),
            identity,
            properties,
            request_completed: false,
        }
    }

    /// Mark the response as already written; no completion redirect is issued.
    pub fn request_completed(&mut self) {
        self.request_completed = true;
    }

    pub fn is_request_completed(&self) -> bool {
        self.request_completed
    }
}

#[async_trait]
pub trait GoToAuthenticationEvents: Send + Sync {
    /// Called after the identity has been mapped.
    async fn authenticated(&self, _context: &mut AuthenticatedContext) -> GoToAuthResult<()> {
        Ok(())
    }

    /// Called before sign-in and the completion redirect.
    async fn return_endpoint(&self, _context: &mut ReturnEndpointContext) -> GoToAuthResult<()> {
        Ok(())
    }
}

/// Events implementation that leaves every context untouched.
pub struct NoopEvents;

#[async_trait]
impl GoToAuthenticationEvents for NoopEvents {}
