//! GoTo OAuth2 authentication for the identity stack.
//!
//! This crate implements the OAuth2 Authorization Code handshake against GoTo
//! (LogMeIn) accounts: issuing the authorization redirect with CSRF
//! correlation, validating the callback, exchanging the code, fetching the
//! user profile and mapping it onto a [`ClaimsIdentity`]. The request pipeline
//! is reached only through the [`HandshakeHost`] trait.

mod client;
mod config;
mod correlation;
mod error;
mod events;
mod handler;
mod host;
mod mapper;
mod properties;
mod state;
mod types;


pub use client::{BackchannelHook, GoToClient, build_http_client};
pub use config::{
    AUTHORIZATION_ENDPOINT, DEFAULT_AUTHENTICATION_TYPE, DEFAULT_CALLBACK_PATH, DEFAULT_SIGN_IN_AS,
    GoToAuthConfig, TOKEN_ENDPOINT, USERINFO_ENDPOINT,
};
pub use correlation::CorrelationGuard;
pub use error::{ErrorKind, GoToAuthError, GoToAuthResult};
pub use events::{
    AuthenticatedContext, GoToAuthenticationEvents, NoopEvents, ReturnEndpointContext,
};
pub use handler::{
    FinalizeOutcome, GoToAuthHandler, GoToAuthHandlerBuilder, HandshakeResult, ReturnPathOutcome,
};
pub use host::{HandshakeHost, RequestOrigin};
pub use mapper::map_identity;
pub use properties::AuthenticationProperties;
pub use state::{SealedStateFormat, StateDataFormat};
pub use types::{CallbackParams, ProfileName, TokenResponse, UserProfile};

// Re-export common types for convenience
pub use ras_identity_core::{Claim, ClaimType, ClaimsIdentity};
