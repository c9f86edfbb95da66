//! Login, registration, logout, and the cross-cutting request checks
//! (auth gate and per-route rate limits) they share.

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_sessions::Session;

use super::{
    AppState, MSG_LOGIN_FAILED, MSG_RATE_LIMITED, MSG_REGISTERED, SESSION_USER_KEY, WebError,
    flash::{self, Level},
    forms::{FieldErrors, LoginForm, RegistrationForm},
    pages,
};
use crate::db::NewUser;
use crate::db::repositories::user::hash_password_blocking;
use crate::phone;
use crate::ratelimit::{Decision, Quota};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub(crate) async fn current_user_id(session: &Session) -> Result<Option<i32>, WebError> {
    Ok(session.get::<i32>(SESSION_USER_KEY).await?)
}

// ============================================================================
// Middleware
// ============================================================================

/// Redirects unauthenticated requests to the login page, carrying the
/// original path in `?next=`.
pub async fn require_login(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if current_user_id(&session).await?.is_some() {
        return Ok(next.run(request).await);
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    Ok(Redirect::to(&format!("/login?next={}", urlencoding::encode(target))).into_response())
}

pub async fn limit_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let (quota, trusted_proxies) = {
        let config = state.config().read().await;
        (
            Quota::new(
                config.rate_limit.login_max_requests,
                Duration::from_secs(config.rate_limit.login_window_seconds),
            ),
            config.server.trusted_proxy_ips.clone(),
        )
    };

    enforce_quota(&state, &session, "/login", quota, &trusted_proxies, request, next).await
}

pub async fn limit_register(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let (quota, trusted_proxies) = {
        let config = state.config().read().await;
        (
            Quota::new(
                config.rate_limit.register_max_requests,
                Duration::from_secs(config.rate_limit.register_window_seconds),
            ),
            config.server.trusted_proxy_ips.clone(),
        )
    };

    enforce_quota(&state, &session, "/register", quota, &trusted_proxies, request, next).await
}

/// Over-quota requests never see a raw 429: they get a flash and a
/// redirect to the landing page.
async fn enforce_quota(
    state: &AppState,
    session: &Session,
    route: &str,
    quota: Quota,
    trusted_proxies: &[String],
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let client = client_identity(&request, trusted_proxies);

    match state.limiter().check(route, &client, quota) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Limited(retry_after) => {
            tracing::warn!(
                "Rate limit exceeded on {} by {} (retry in {}s)",
                route,
                client,
                retry_after.as_secs()
            );
            flash::push(session, Level::Danger, MSG_RATE_LIMITED).await?;
            Ok(Redirect::to("/").into_response())
        }
    }
}

/// Rate-limiting identity: the first forwarded hop when the socket peer is
/// a trusted proxy, otherwise the peer itself.
fn client_identity(request: &Request, trusted_proxies: &[String]) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());

    if let Some(peer_ip) = peer.as_deref()
        && trusted_proxies.iter().any(|p| p == peer_ip)
        && let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_string();
    }

    peer.unwrap_or_else(|| "local".to_string())
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn login_page(
    session: Session,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    if current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let flashes = flash::take(&session).await?;
    Ok(pages::login_page(
        &flashes,
        query.next.as_deref(),
        &LoginForm::default(),
        &FieldErrors::default(),
    )
    .into_response())
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
    axum::Form(form): axum::Form<LoginForm>,
) -> Result<Response, WebError> {
    if current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = form.validate();
    if !errors.is_empty() {
        let flashes = flash::take(&session).await?;
        return Ok(pages::login_page(&flashes, query.next.as_deref(), &form, &errors).into_response());
    }

    let verified = state
        .store()
        .verify_user_password(&form.username, &form.password)
        .await?;

    if verified
        && let Some(user) = state.store().get_user_by_username(&form.username).await?
    {
        session.insert(SESSION_USER_KEY, user.id).await?;
        tracing::info!("User '{}' logged in", form.username);

        let target = query.next.as_deref().unwrap_or("/");
        return Ok(Redirect::to(target).into_response());
    }

    // One message for both unknown user and bad password.
    flash::push(&session, Level::Danger, MSG_LOGIN_FAILED).await?;
    let flashes = flash::take(&session).await?;
    Ok(pages::login_page(
        &flashes,
        query.next.as_deref(),
        &form,
        &FieldErrors::default(),
    )
    .into_response())
}

pub async fn register_page(session: Session) -> Result<Response, WebError> {
    if current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let flashes = flash::take(&session).await?;
    Ok(pages::register_page(&flashes, &RegistrationForm::default(), &FieldErrors::default())
        .into_response())
}

pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    axum::Form(form): axum::Form<RegistrationForm>,
) -> Result<Response, WebError> {
    if current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = form.validate();
    if !errors.is_empty() {
        let flashes = flash::take(&session).await?;
        return Ok(pages::register_page(&flashes, &form, &errors).into_response());
    }

    let (security, region, default_accounts) = {
        let config = state.config().read().await;
        (
            config.security.clone(),
            config.phone.region.clone(),
            config.accounts.defaults.clone(),
        )
    };

    let password_hash = hash_password_blocking(&form.password, &security).await?;
    let phone = phone::normalize(&form.phone, &region)?;

    let user = state
        .store()
        .create_user(NewUser {
            username: Some(form.username.clone()),
            email: form.email.clone(),
            password_hash: Some(password_hash),
            phone,
            address: form.address.clone(),
        })
        .await?;

    // Second commit, after the user row is already durable.
    state
        .store()
        .create_default_accounts(user.id, &default_accounts)
        .await?;

    tracing::info!("Registered user '{}' (id {})", form.username, user.id);

    flash::push(&session, Level::Success, MSG_REGISTERED).await?;
    Ok(Redirect::to("/login").into_response())
}

pub async fn logout(session: Session) -> Result<Response, WebError> {
    session.flush().await?;
    Ok(Redirect::to("/").into_response())
}
