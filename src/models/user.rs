//! Signed-in user model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::auth::AuthUser;

/// Display name used when the account carries no `name` metadata.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// The identity behind the active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    pub id: String,
    /// Empty when the backend did not share one
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AuthUser> for User {
    fn from(auth: &AuthUser) -> Self {
        let name = auth
            .user_metadata
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_string();

        Self {
            id: auth.id.clone(),
            email: auth.email.clone().unwrap_or_default(),
            name,
            created_at: auth.created_at,
        }
    }
}
