use axum::{
    Router, middleware,
    routing::get,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::db::Store;
use crate::ratelimit::RateLimiter;
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod flash;
pub mod forms;
mod pages;
mod profile;

pub use error::WebError;

/// Session key holding the authenticated user's id.
pub(crate) const SESSION_USER_KEY: &str = "user_id";

pub(crate) const MSG_LOGIN_FAILED: &str = "Feil brukernavn eller passord, vennligst prøv på nytt";
pub(crate) const MSG_REGISTERED: &str = "Brukeren din har blitt registert, du kan nå logge inn!";
pub(crate) const MSG_PROFILE_UPDATED: &str = "Dine personlige opplysninger har blitt oppdatert";
pub(crate) const MSG_RATE_LIMITED: &str =
    "Du har brukt for mange usuksessfulle login forsøk, prøv på nytt om 5 minutter";

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.shared.limiter
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState { shared }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (secure_cookies, session_minutes) = {
        let config = state.config().read().await;
        (
            config.server.secure_cookies,
            config.server.session_minutes,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(i64::from(
            session_minutes,
        ))));

    let login_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::limit_login,
        ));

    let register_routes = Router::new()
        .route(
            "/register",
            get(auth::register_page).post(auth::register_submit),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::limit_register,
        ));

    let gated_routes = Router::new()
        .route(
            "/editprofile",
            get(profile::edit_page).post(profile::edit_submit),
        )
        .route("/account", get(profile::account_page))
        .route("/myaccs", get(profile::accounts_page))
        .route_layer(middleware::from_fn(auth::require_login));

    Router::new()
        .route("/", get(pages::index))
        .route("/logout", get(auth::logout))
        .merge(login_routes)
        .merge(register_routes)
        .merge(gated_routes)
        .layer(session_layer)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
