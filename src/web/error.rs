use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::phone::PhoneError;

#[derive(Debug)]
pub enum WebError {
    DatabaseError(String),

    SessionError(String),

    PhoneError(PhoneError),

    InternalError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            WebError::SessionError(msg) => write!(f, "Session error: {}", msg),
            WebError::PhoneError(err) => write!(f, "Phone error: {}", err),
            WebError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, super::pages::error_page()).into_response()
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        WebError::InternalError(err.to_string())
    }
}

impl From<sea_orm::DbErr> for WebError {
    fn from(err: sea_orm::DbErr) -> Self {
        WebError::DatabaseError(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for WebError {
    fn from(err: tower_sessions::session::Error) -> Self {
        WebError::SessionError(err.to_string())
    }
}

impl From<PhoneError> for WebError {
    fn from(err: PhoneError) -> Self {
        WebError::PhoneError(err)
    }
}
