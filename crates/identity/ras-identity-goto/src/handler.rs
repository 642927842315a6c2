//! The GoTo authorization code handshake.
//!
//! A handshake moves through `Idle -> ChallengeIssued -> CallbackReceived ->
//! Authenticated | Failed -> Completed`. Nothing is stored server side between
//! the challenge and the callback: the sealed `state` parameter carries the
//! property bag and the host keeps the correlation token. A failed handshake
//! is never retried; the host starts a new challenge.

use crate::client::{BackchannelHook, GoToClient, build_http_client};
use crate::config::GoToAuthConfig;
use crate::correlation::CorrelationGuard;
use crate::error::{ErrorKind, GoToAuthError, GoToAuthResult};
use crate::events::{
    AuthenticatedContext, GoToAuthenticationEvents, NoopEvents, ReturnEndpointContext,
};
use crate::host::{HandshakeHost, RequestOrigin};
use crate::mapper::map_identity;
use crate::properties::AuthenticationProperties;
use crate::state::{SealedStateFormat, StateDataFormat};
use crate::types::CallbackParams;
use chrono::Utc;
use ras_identity_core::ClaimsIdentity;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Outcome of a callback whose state could be decoded.
///
/// `properties` is always populated so the host can recover the original
/// redirect target; `identity` is `None` on every failure path.
#[derive(Debug)]
pub struct HandshakeResult {
    pub identity: Option<ClaimsIdentity>,
    pub properties: AuthenticationProperties,
    pub failure: Option<GoToAuthError>,
}

impl HandshakeResult {
    fn authenticated(identity: ClaimsIdentity, properties: AuthenticationProperties) -> Self {
        Self {
            identity: Some(identity),
            properties,
            failure: None,
        }
    }

    fn failed(properties: AuthenticationProperties, failure: GoToAuthError) -> Self {
        Self {
            identity: None,
            properties,
            failure: Some(failure),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// What [`GoToAuthHandler::invoke_return_path`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPathOutcome {
    /// The request does not target the callback path.
    NotCallback,
    /// The state was missing or undecodable. The host should answer with 500.
    InvalidState,
    Handled {
        /// The identity was signed in by the host.
        authenticated: bool,
        /// False when no completion redirect was issued and the host should
        /// continue its own pipeline.
        request_completed: bool,
    },
}

/// What [`GoToAuthHandler::finalize`] did with a handshake result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// The host accepted the sign-in.
    pub signed_in: bool,
    /// A completion redirect was issued or a hook completed the request.
    pub request_completed: bool,
}

/// Runs challenges and callbacks for one configured GoTo client.
///
/// Immutable after construction and cheap to clone; concurrent handshakes
/// share the backchannel client and nothing else.
#[derive(Clone)]
pub struct GoToAuthHandler {
    config: Arc<GoToAuthConfig>,
    client: GoToClient,
    state_format: Arc<dyn StateDataFormat>,
    correlation: CorrelationGuard,
    events: Arc<dyn GoToAuthenticationEvents>,
}

pub struct GoToAuthHandlerBuilder {
    config: GoToAuthConfig,
    http_client: Option<Client>,
    backchannel_hook: Option<BackchannelHook>,
    state_format: Option<Arc<dyn StateDataFormat>>,
    events: Option<Arc<dyn GoToAuthenticationEvents>>,
}

impl GoToAuthHandlerBuilder {
    /// Share an already built backchannel client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Customise the backchannel client built for this handler. Ignored when
    /// a client is supplied with [`Self::with_http_client`].
    pub fn with_backchannel_hook(mut self, hook: BackchannelHook) -> Self {
        self.backchannel_hook = Some(hook);
        self
    }

    pub fn with_state_format(mut self, state_format: Arc<dyn StateDataFormat>) -> Self {
        self.state_format = Some(state_format);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn GoToAuthenticationEvents>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and assemble the handler.
    pub fn build(self) -> GoToAuthResult<GoToAuthHandler> {
        self.config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => build_http_client(&self.config, self.backchannel_hook.as_ref())?,
        };

        let state_format = self.state_format.unwrap_or_else(|| {
            let purpose = SealedStateFormat::purpose_for(&self.config.authentication_type);
            match &self.config.state_key {
                Some(key) if !key.is_empty() => Arc::new(SealedStateFormat::from_secret(key, purpose)),
                _ => Arc::new(SealedStateFormat::random(purpose)),
            }
        });

        let correlation = CorrelationGuard::new(self.config.correlation_cookie_name());
        let client = GoToClient::new(&self.config, http_client);

        info!(
            "Configured GoTo authentication '{}' with callback path {}",
            self.config.authentication_type, self.config.callback_path
        );

        Ok(GoToAuthHandler {
            config: Arc::new(self.config),
            client,
            state_format,
            correlation,
            events: self.events.unwrap_or_else(|| Arc::new(NoopEvents)),
        })
    }
}

impl GoToAuthHandler {
    pub fn builder(config: GoToAuthConfig) -> GoToAuthHandlerBuilder {
        GoToAuthHandlerBuilder {
            config,
            http_client: None,
            backchannel_hook: None,
            state_format: None,
            events: None,
        }
    }

    /// Build a handler with default collaborators.
    pub fn new(config: GoToAuthConfig) -> GoToAuthResult<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GoToAuthConfig {
        &self.config
    }

    pub fn correlation_cookie_name(&self) -> &str {
        self.correlation.cookie_name()
    }

    /// Absolute callback URL registered with GoTo.
    pub fn callback_url(&self, origin: &RequestOrigin) -> String {
        origin.absolute(&self.config.callback_path)
    }

    pub fn is_callback(&self, origin: &RequestOrigin) -> bool {
        origin.path == self.config.callback_path
    }

    /// The provider URL a challenge redirects to.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> GoToAuthResult<String> {
        let mut url = Url::parse(&self.config.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Start a handshake and redirect the user agent to GoTo.
    ///
    /// Defaults the redirect target to the current request URL, issues a
    /// correlation token and seals the properties into `state`. Returns the
    /// authorization URL that was redirected to.
    pub async fn challenge<H>(
        &self,
        host: &mut H,
        mut properties: AuthenticationProperties,
    ) -> GoToAuthResult<String>
    where
        H: HandshakeHost + ?Sized,
    {
        let origin = host.origin();
        if properties.needs_redirect_uri() {
            properties.redirect_uri = Some(origin.current_url());
        }
        if properties.issued_at.is_none() {
            properties.issued_at = Some(Utc::now());
        }

        self.correlation.generate(host, &mut properties);
        let state = self.state_format.protect(&properties)?;
        let authorization_url = self.authorization_url(&self.callback_url(&origin), &state)?;

        debug!(
            "Issuing GoTo challenge from {} for '{}'",
            origin.path, self.config.authentication_type
        );
        host.issue_redirect(&authorization_url);
        Ok(authorization_url)
    }

    /// Validate a provider callback and run the code exchange.
    ///
    /// Returns `None` only when `state` is missing, duplicated or fails to
    /// decode. Every other failure is folded into a [`HandshakeResult`]
    /// without an identity.
    pub async fn process_callback(
        &self,
        params: &CallbackParams,
        correlation_token: Option<&str>,
        redirect_uri: &str,
    ) -> Option<HandshakeResult> {
        let Some(state) = params.state() else {
            warn!("Callback did not carry exactly one state parameter");
            return None;
        };

        let Some(properties) = self.state_format.unprotect(state) else {
            warn!("Callback state could not be decoded");
            return None;
        };

        match self
            .complete_handshake(params, correlation_token, redirect_uri, properties.clone())
            .await
        {
            Ok((identity, properties)) => {
                info!(
                    "GoTo authentication succeeded with {} claims",
                    identity.claims().len()
                );
                Some(HandshakeResult::authenticated(identity, properties))
            }
            Err(e) => {
                self.log_failure(&e);
                Some(HandshakeResult::failed(properties, e))
            }
        }
    }

    async fn complete_handshake(
        &self,
        params: &CallbackParams,
        correlation_token: Option<&str>,
        redirect_uri: &str,
        properties: AuthenticationProperties,
    ) -> GoToAuthResult<(ClaimsIdentity, AuthenticationProperties)> {
        if let Some(error) = params.error() {
            return Err(GoToAuthError::ProviderDenied(error.to_string()));
        }

        let code = params.code();

        // OAuth2 10.12 CSRF
        if !self.correlation.validate(&properties, correlation_token) {
            return Err(GoToAuthError::CorrelationFailed);
        }

        let code = code.ok_or(GoToAuthError::MissingAuthorizationCode)?;

        let token = self.client.exchange_code(code, redirect_uri).await?;
        let profile = self.client.fetch_profile(&token.access_token).await;
        let identity = map_identity(&self.config.authentication_type, &token, profile.as_ref());

        let mut context = AuthenticatedContext::new(token, profile, identity, properties);
        self.events.authenticated(&mut context).await?;

        Ok((context.identity, context.properties))
    }

    /// Sign the identity in and issue the completion redirect.
    ///
    /// Failures of the host's sign-in are logged and turned into a failed
    /// completion, reported as `signed_in: false`.
    pub async fn finalize<H>(&self, host: &mut H, result: HandshakeResult) -> FinalizeOutcome
    where
        H: HandshakeHost + ?Sized,
    {
        let mut context = ReturnEndpointContext::new(
            Some(self.config.sign_in_as().to_string()),
            result.identity,
            result.properties,
        );

        if let Err(e) = self.events.return_endpoint(&mut context).await {
            error!("Return endpoint hook failed: {}", e);
        }

        let mut signed_in = false;
        if let Some(sign_in_as) = context.sign_in_as_authentication_type.clone() {
            if let Some(identity) = context.identity.take() {
                let identity = if identity.authentication_type() != sign_in_as {
                    identity.relabel(sign_in_as.as_str())
                } else {
                    identity
                };

                match host.sign_in(identity.clone(), &context.properties).await {
                    Ok(()) => {
                        context.identity = Some(identity);
                        signed_in = true;
                    }
                    Err(e) => error!("Sign-in as '{}' failed: {}", sign_in_as, e),
                }
            }
        }

        if !context.is_request_completed() {
            if let Some(redirect_uri) = context.redirect_uri.as_deref() {
                let location = if context.identity.is_none() {
                    append_query_param(redirect_uri, "error", "access_denied")
                } else {
                    redirect_uri.to_string()
                };
                host.issue_redirect(&location);
                context.request_completed();
            }
        }

        FinalizeOutcome {
            signed_in,
            request_completed: context.is_request_completed(),
        }
    }

    /// Handle the request if it targets the callback path.
    ///
    /// The correlation token is consumed whatever the outcome.
    pub async fn invoke_return_path<H>(&self, host: &mut H) -> ReturnPathOutcome
    where
        H: HandshakeHost + ?Sized,
    {
        let origin = host.origin();
        if !self.is_callback(&origin) {
            return ReturnPathOutcome::NotCallback;
        }

        let params = host.incoming_query();
        let cookie_name = self.correlation.cookie_name();
        let correlation_token = host.correlation_token(cookie_name);
        host.clear_correlation_token(cookie_name);

        let redirect_uri = self.callback_url(&origin);
        let Some(result) = self
            .process_callback(&params, correlation_token.as_deref(), &redirect_uri)
            .await
        else {
            warn!("Invalid return state, unable to redirect");
            return ReturnPathOutcome::InvalidState;
        };

        let outcome = self.finalize(host, result).await;

        ReturnPathOutcome::Handled {
            authenticated: outcome.signed_in,
            request_completed: outcome.request_completed,
        }
    }

    fn log_failure(&self, err: &GoToAuthError) {
        match err.kind() {
            ErrorKind::Protocol => warn!(
                "GoTo handshake for '{}' rejected: {}",
                self.config.authentication_type, err
            ),
            ErrorKind::ProfileLookup => debug!("GoTo profile lookup failed: {}", err),
            _ => error!(
                "GoTo authentication for '{}' failed: {}",
                self.config.authentication_type, err
            ),
        }
    }
}

/// Append `key=value` to a possibly relative URI, keeping any fragment last.
pub(crate) fn append_query_param(uri: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    let encoded: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();

    match fragment {
        Some(fragment) => format!("{base}{separator}{encoded}#{fragment}"),
        None => format!("{base}{separator}{encoded}"),
    }
}
