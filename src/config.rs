//! Session configuration
//!
//! A small serde-default config: where the token endpoint lives and which
//! room to join. The room name normally comes from the page URL's `room`
//! query parameter; a missing parameter leaves the join control disabled.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

fn default_token_url() -> String {
    "http://127.0.0.1:3000/token".to_string()
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token endpoint URL
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Room to join; `None` disables the join control
    #[serde(default)]
    pub room: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            room: None,
        }
    }
}

impl SessionConfig {
    /// Build a config from a page URL, taking the room from its `?room=`
    /// parameter
    pub fn from_page_url(page_url: &str) -> Result<Self> {
        Ok(Self {
            token_url: default_token_url(),
            room: room_from_url(page_url)?,
        })
    }
}

/// Extract the `room` query parameter from a page URL
///
/// Returns `Ok(None)` when the parameter is absent or empty; the caller
/// surfaces the error to the user and keeps join disabled.
pub fn room_from_url(page_url: &str) -> Result<Option<String>> {
    let url = Url::parse(page_url).map_err(|e| AppError::InvalidUrl(e.to_string()))?;
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "room")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}
