//! GoTo handshake error types.

use thiserror::Error;

pub type GoToAuthResult<T> = Result<T, GoToAuthError>;

/// Broad classes of handshake failure. The class decides how a failure is
/// logged and whether it can abort startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration, fatal at construction time.
    Configuration,
    /// Missing or tampered state, correlation mismatch, provider denial.
    Protocol,
    /// Token endpoint failure: transport, status, timeout or bad body.
    Upstream,
    /// Profile endpoint failure. Never fails a handshake.
    ProfileLookup,
    /// Anything else caught at the handshake boundary.
    Unexpected,
}

#[derive(Debug, Error)]
pub enum GoToAuthError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Correlation token mismatch")]
    CorrelationFailed,

    #[error("Provider returned error: {0}")]
    ProviderDenied(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backchannel request timed out")]
    Timeout,

    #[error("Token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Backchannel response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("User profile request failed: {0}")]
    ProfileFailed(String),

    #[error("State protection failed: {0}")]
    StateProtection(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),
}

impl GoToAuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GoToAuthError::ConfigError(_) => ErrorKind::Configuration,
            GoToAuthError::InvalidState
            | GoToAuthError::CorrelationFailed
            | GoToAuthError::ProviderDenied(_) => ErrorKind::Protocol,
            GoToAuthError::MissingAuthorizationCode
            | GoToAuthError::HttpError(_)
            | GoToAuthError::Timeout
            | GoToAuthError::TokenExchangeFailed { .. }
            | GoToAuthError::InvalidTokenResponse(_)
            | GoToAuthError::ResponseTooLarge { .. } => ErrorKind::Upstream,
            GoToAuthError::ProfileFailed(_) => ErrorKind::ProfileLookup,
            GoToAuthError::StateProtection(_)
            | GoToAuthError::SerializationError(_)
            | GoToAuthError::UrlError(_)
            | GoToAuthError::SignInFailed(_) => ErrorKind::Unexpected,
        }
    }

    /// Classify a transport error, folding timeouts into [`GoToAuthError::Timeout`].
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GoToAuthError::Timeout
        } else {
            GoToAuthError::HttpError(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GoToAuthError::ConfigError("missing".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(GoToAuthError::InvalidState.kind(), ErrorKind::Protocol);
        assert_eq!(GoToAuthError::CorrelationFailed.kind(), ErrorKind::Protocol);
        assert_eq!(
            GoToAuthError::ProviderDenied("access_denied".into()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            GoToAuthError::MissingAuthorizationCode.kind(),
            ErrorKind::Upstream
        );
        assert_eq!(GoToAuthError::Timeout.kind(), ErrorKind::Upstream);
        assert_eq!(
            GoToAuthError::TokenExchangeFailed {
                status: 500,
                body: String::new()
            }
            .kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            GoToAuthError::InvalidTokenResponse("missing access_token".into()).kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            GoToAuthError::ProfileFailed("500".into()).kind(),
            ErrorKind::ProfileLookup
        );
        assert_eq!(
            GoToAuthError::SignInFailed("store down".into()).kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_token_exchange_error_message() {
        let err = GoToAuthError::TokenExchangeFailed {
            status: 400,
            body: "invalid_grant".into(),
        };
        assert_eq!(
            err.to_string(),
            "Token exchange failed with status 400: invalid_grant"
        );
    }
}
