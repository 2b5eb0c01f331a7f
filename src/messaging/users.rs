use axum::{debug_handler, extract::{Query, State}, Json};
use serde::Deserialize;

use crate::{
    gateway::{Backend, Gateway, UserRecord},
    session::CurrentUser,
    AppResult, Error, Result,
};

use super::Messenger;

impl<G: Gateway> Messenger<'_, G> {
    /// Finds a recipient by address rather than by id.
    pub async fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> Result<Option<UserRecord>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::invalid("e-mail address is empty"));
        }

        self.gateway.search_user_by_email(email, requesting_user_id).await
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    email: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn search(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Query(SearchQuery { email }): Query<SearchQuery>,
) -> AppResult<Json<Option<UserRecord>>> {
    let gateway = gateway.authorized(user.token());
    let found = Messenger::new(&gateway)
        .search_user_by_email(&email, &user.user_id)
        .await?;

    Ok(Json(found))
}
