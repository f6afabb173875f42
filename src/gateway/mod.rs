//! Axum-based HTTP gateway for the auth flow.
//!
//! Routes mirror the classic register → login → dashboard → logout shape:
//! server-rendered form pages, redirects on success, and re-rendered forms
//! with inline messages on failure. The session token travels in an
//! `HttpOnly` cookie; only its SHA-256 hash is stored server-side.
//!
//! Handlers receive the account store through [`AppState`] — there is no
//! global session facade and no hidden clock: login evaluation time is read
//! once per request and injected into the store call.

pub mod pages;

use crate::account::{password, store, AccountError, AccountStore, LoginOutcome, Session};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (16KB) — these are small login/register forms.
pub const MAX_BODY_SIZE: usize = 16 * 1024;
/// Request timeout (30s).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "gatelock_session";

// User-facing login messages. "Invalid Email" vs "Wrong Password" reveals
// whether an email is registered; kept intentionally to match the original
// behavior (see DESIGN.md).
const MSG_INVALID_EMAIL: &str = "Invalid Email";
const MSG_WRONG_PASSWORD: &str = "Wrong Password";
const MSG_LOCKED: &str = "Your account has been locked after 3 failed login attempts. \
                          Please try again after 10 minutes.";
const MSG_ACCOUNT_CREATED: &str = "Account Created Successfully";

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AccountStore>,
}

/// Run the HTTP gateway.
pub async fn run_gateway(host: &str, port: u16, store: Arc<AccountStore>) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("gateway listening on {}", listener.local_addr()?);

    let state = AppState { store };

    let app = Router::new()
        .route("/", get(handle_welcome))
        .route("/health", get(handle_health))
        .route("/register", get(handle_register_page))
        .route("/register", post(handle_register_submit))
        .route("/login", get(handle_login_page))
        .route("/login", post(handle_login_submit))
        .route("/dashboard", get(handle_dashboard))
        .route("/logout", get(handle_logout))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)));

    axum::serve(listener, app).await?;

    Ok(())
}

// ── Forms ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Per-field registration errors, re-rendered inline on the form.
#[derive(Debug, Default)]
pub struct RegisterErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl RegisterErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

fn validate_registration(name: &str, email: &str, password: &str) -> RegisterErrors {
    let mut errors = RegisterErrors::default();
    if name.trim().is_empty() {
        errors.name = Some("Name is required.");
    }
    if !is_well_formed_email(email.trim()) {
        errors.email = Some("Enter a valid email address.");
    }
    if password.chars().count() < 6 {
        errors.password = Some("Password must be at least 6 characters.");
    }
    errors
}

/// Shape check only: one `@`, non-empty local part, dotted domain, no spaces.
fn is_well_formed_email(email: &str) -> bool {
    if email.matches('@').count() != 1 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

// ── Session cookie helpers ──────────────────────────────────────────

/// Pull the session token out of the Cookie header, if present.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == SESSION_COOKIE && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Resolve the current session from request headers, if any.
fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = session_token(headers)?;
    state.store.validate_session(&token)
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET / — landing page with links to register/login.
async fn handle_welcome() -> Html<String> {
    Html(pages::render_welcome())
}

/// GET /health — liveness probe (no secrets leaked).
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let accounts = state.store.account_count().unwrap_or(0);
    axum::Json(serde_json::json!({
        "status": "ok",
        "accounts": accounts,
    }))
}

/// GET /register — registration form.
async fn handle_register_page() -> Html<String> {
    Html(pages::render_register_page("", "", &RegisterErrors::default()))
}

/// POST /register — validate, create the account, redirect to login.
async fn handle_register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let errors = validate_registration(&form.name, &form.email, &form.password);
    if !errors.is_empty() {
        return Html(pages::render_register_page(&form.name, &form.email, &errors))
            .into_response();
    }

    match state
        .store
        .create_account(&form.name, &form.email, &form.password)
    {
        Ok(account) => {
            tracing::info!(account_id = %account.id, "account created");
            Redirect::to("/login?created=1").into_response()
        }
        Err(AccountError::DuplicateEmail) => {
            let errors = RegisterErrors {
                email: Some("This email is already registered."),
                ..RegisterErrors::default()
            };
            Html(pages::render_register_page(&form.name, &form.email, &errors)).into_response()
        }
        Err(e) => {
            tracing::error!("registration failed: {e}");
            server_error()
        }
    }
}

/// GET /login — login form; shows a notice right after registration.
async fn handle_login_page(Query(query): Query<HashMap<String, String>>) -> Html<String> {
    let notice = query.contains_key("created").then_some(MSG_ACCOUNT_CREATED);
    Html(pages::render_login_page(None, notice))
}

/// POST /login — evaluate the attempt and establish a session on success.
async fn handle_login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let now = store::epoch_secs();

    match state.store.login(&form.email, &form.password, now) {
        Ok((LoginOutcome::Success, account)) => match state.store.create_session(&account.id) {
            Ok(token) => {
                tracing::info!(account_id = %account.id, "login succeeded");
                (
                    AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]),
                    Redirect::to("/dashboard"),
                )
                    .into_response()
            }
            Err(e) => {
                tracing::error!("session creation failed: {e}");
                server_error()
            }
        },
        Ok((LoginOutcome::WrongPassword, _)) => {
            Html(pages::render_login_page(Some(MSG_WRONG_PASSWORD), None)).into_response()
        }
        Ok((LoginOutcome::Locked, _)) => {
            Html(pages::render_login_page(Some(MSG_LOCKED), None)).into_response()
        }
        Err(AccountError::AccountNotFound) => {
            // Burn a dummy verification so this path costs about as much as
            // a wrong-password check.
            password::burn_verification(&form.password);
            Html(pages::render_login_page(Some(MSG_INVALID_EMAIL), None)).into_response()
        }
        Err(e) => {
            tracing::error!("login failed: {e}");
            server_error()
        }
    }
}

/// GET /dashboard — session-gated.
async fn handle_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session) = current_session(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    match state.store.get_account(&session.account_id) {
        Ok(Some(account)) => Html(pages::render_dashboard(&account.name)).into_response(),
        Ok(None) => Redirect::to("/login").into_response(),
        Err(e) => {
            tracing::error!("dashboard lookup failed: {e}");
            server_error()
        }
    }
}

/// GET /logout — revoke the session and expire the cookie.
async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.store.revoke_session(&token) {
            tracing::warn!("session revocation failed: {e}");
        }
    }
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/login"),
    )
        .into_response()
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::render_server_error())).into_response()
}

// ── Tests ───────────────────────────────────────────────────────────
