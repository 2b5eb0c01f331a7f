use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::{AppError, Error};

pub const USER_ID: &str = "user_id";
pub const ACCESS_TOKEN: &str = "access_token";

/// The caller of a request, as stored in the session at login.
///
/// Operations receive the user id explicitly from here; nothing looks the
/// current user up on its own.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub access_token: Option<String>,
}

impl CurrentUser {
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| AppError(anyhow::anyhow!(reason)))?;

        let Some(user_id) = session.get::<String>(USER_ID).await? else {
            return Err(Error::Unauthenticated)?;
        };
        let access_token = session.get::<String>(ACCESS_TOKEN).await?;

        Ok(CurrentUser { user_id, access_token })
    }
}
