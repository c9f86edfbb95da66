//! One-time notifications carried in the session and drained on the next
//! rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::WebError;

const SESSION_FLASH_KEY: &str = "flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Danger,
}

impl Level {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Level::Success => "flash-success",
            Level::Danger => "flash-danger",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

pub async fn push(
    session: &Session,
    level: Level,
    message: impl Into<String>,
) -> Result<(), WebError> {
    let mut flashes: Vec<Flash> = session.get(SESSION_FLASH_KEY).await?.unwrap_or_default();
    flashes.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(SESSION_FLASH_KEY, &flashes).await?;
    Ok(())
}

/// Drain all pending flashes. Rendering a page consumes them.
pub async fn take(session: &Session) -> Result<Vec<Flash>, WebError> {
    Ok(session
        .remove::<Vec<Flash>>(SESSION_FLASH_KEY)
        .await?
        .unwrap_or_default())
}
