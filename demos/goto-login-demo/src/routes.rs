use crate::config::{Config, SessionConfig};
use crate::host::{AxumHost, PublicOrigin, SessionRecord, sign_out};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{FromRef, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use ras_identity_goto::{AuthenticationProperties, GoToAuthHandler, HandshakeHost, ReturnPathOutcome};
use serde::Deserialize;
use sha2::{Digest, Sha512};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: GoToAuthHandler,
    pub origin: PublicOrigin,
    pub session: SessionConfig,
    pub key: Key,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let handler = GoToAuthHandler::new(config.goto.clone())
            .context("Failed to configure GoTo authentication")?;

        let key = match &config.session.cookie_secret {
            Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
            None => Key::generate(),
        };

        Ok(Self {
            handler,
            origin: PublicOrigin::parse(&config.server.public_url)?,
            session: config.session.clone(),
            key,
        })
    }

    fn host(&self, uri: &Uri, jar: PrivateCookieJar) -> AxumHost {
        AxumHost::new(self.origin.request(uri), jar, &self.session)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let callback_path = state.handler.config().callback_path.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/login", get(login_handler))
        .route(&callback_path, get(callback_handler))
        .route("/me", get(me_handler))
        .route("/logout", get(logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    return_url: Option<String>,
}

/// Only local paths are accepted as return targets.
fn local_return_path(return_url: Option<&str>) -> &str {
    match return_url {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/me",
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>GoTo sign-in</title></head>
<body>
    <h1>GoTo sign-in demo</h1>
    <p><a href="/login">Sign in with GoTo</a></p>
    <p><a href="/me">Show current session</a> | <a href="/logout">Sign out</a></p>
</body>
</html>"#,
    )
}

async fn login_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    uri: Uri,
    Query(query): Query<LoginQuery>,
) -> Response {
    let mut host = state.host(&uri, jar);
    let return_path = local_return_path(query.return_url.as_deref());
    let properties =
        AuthenticationProperties::new().with_redirect_uri(host.origin().absolute(return_path));

    match state.handler.challenge(&mut host, properties).await {
        Ok(_) => host.into_response(StatusCode::OK),
        Err(e) => {
            error!("Failed to start GoTo sign-in: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Unable to start GoTo sign-in").into_response()
        }
    }
}

async fn callback_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    uri: Uri,
) -> Response {
    let mut host = state.host(&uri, jar);

    match state.handler.invoke_return_path(&mut host).await {
        ReturnPathOutcome::NotCallback => host.into_response(StatusCode::NOT_FOUND),
        ReturnPathOutcome::InvalidState => {
            host.into_response((StatusCode::INTERNAL_SERVER_ERROR, "Invalid return state"))
        }
        ReturnPathOutcome::Handled {
            authenticated,
            request_completed,
        } => {
            info!(
                "GoTo callback handled (authenticated: {}, redirect: {:?})",
                authenticated,
                host.redirect()
            );
            match (request_completed, authenticated) {
                (true, _) => host.into_response(StatusCode::OK),
                (false, true) => host.into_response(Redirect::to("/me")),
                (false, false) => host.into_response((StatusCode::FORBIDDEN, "Access denied")),
            }
        }
    }
}

async fn me_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Json<SessionRecord>, StatusCode> {
    SessionRecord::from_jar(&jar, &state.session.cookie_name)
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn logout_handler(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    (sign_out(jar, &state.session.cookie_name), Redirect::to("/")).into_response()
}
