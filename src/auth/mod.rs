//! Session glue. Tokens are issued by the external auth provider; this
//! module only checks with the gateway who a token belongs to and keeps
//! the answer in the session.

mod login;
mod logout;

use axum::{routing::post, Router};

use crate::AppState;

pub use login::login;
pub use logout::logout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
