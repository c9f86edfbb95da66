//! Pages behind the login gate: profile view, linked accounts, and the
//! profile-edit form.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{
    AppState, MSG_PROFILE_UPDATED, WebError,
    auth::current_user_id,
    flash::{self, Level},
    forms::{FieldErrors, ProfileForm},
    pages,
};
use crate::db::{NewUser, User};
use crate::phone;

/// The session id can outlive its user row; treat that as logged out.
async fn load_session_user(
    state: &AppState,
    session: &Session,
) -> Result<Option<User>, WebError> {
    let Some(user_id) = current_user_id(session).await? else {
        return Ok(None);
    };

    Ok(state.store().get_user_by_id(user_id).await?)
}

pub async fn account_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, WebError> {
    let Some(user) = load_session_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let flashes = flash::take(&session).await?;
    Ok(pages::account_page(&flashes, &user).into_response())
}

pub async fn accounts_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, WebError> {
    let Some(user) = load_session_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let accounts = state.store().accounts_for_user(user.id).await?;
    let flashes = flash::take(&session).await?;
    Ok(pages::accounts_page(&flashes, &accounts).into_response())
}

pub async fn edit_page(session: Session) -> Result<Response, WebError> {
    let flashes = flash::take(&session).await?;
    Ok(
        pages::edit_profile_page(&flashes, &ProfileForm::default(), &FieldErrors::default())
            .into_response(),
    )
}

pub async fn edit_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    axum::Form(form): axum::Form<ProfileForm>,
) -> Result<Response, WebError> {
    let errors = form.validate();
    if !errors.is_empty() {
        let flashes = flash::take(&session).await?;
        return Ok(pages::edit_profile_page(&flashes, &form, &errors).into_response());
    }

    let region = state.config().read().await.phone.region.clone();
    let phone = phone::normalize(&form.phone, &region)?;

    // Inserts a fresh row with no username or password; the session
    // user's own row is not updated.
    state
        .store()
        .create_user(NewUser {
            username: None,
            email: form.email.clone(),
            password_hash: None,
            phone,
            address: form.address.clone(),
        })
        .await?;

    flash::push(&session, Level::Success, MSG_PROFILE_UPDATED).await?;
    Ok(Redirect::to("/account").into_response())
}
