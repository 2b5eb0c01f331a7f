use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    gateway::{Backend, Gateway},
    session::{ACCESS_TOKEN, USER_ID},
    AppResult, Error,
};

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    access_token: String,
}

#[derive(Serialize)]
pub(crate) struct LoggedIn {
    user_id: String,
}

#[debug_handler(state = crate::AppState)]
pub async fn login(
    State(gateway): State<Backend>,
    session: Session,
    Json(LoginRequest { access_token }): Json<LoginRequest>,
) -> AppResult<Json<LoggedIn>> {
    let Some(user_id) = gateway.user_for_token(&access_token).await? else {
        return Err(Error::Unauthenticated)?;
    };

    session.cycle_id().await?;
    session.insert(USER_ID, &user_id).await?;
    session.insert(ACCESS_TOKEN, &access_token).await?;

    tracing::info!("welcome u/{user_id}");
    Ok(Json(LoggedIn { user_id }))
}
