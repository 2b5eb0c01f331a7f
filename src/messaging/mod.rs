//! Direct messages between two users.
//!
//! A conversation is the canonical record for an unordered pair of users;
//! messages do not point at it and belong to it by their sender/recipient
//! pair alone.

mod conversations;
mod messages;
mod unread;
mod users;

use axum::{routing::{get, post}, Router};

use crate::{gateway::Gateway, AppState};

pub use messages::{SentMessage, Touch, MAX_MESSAGE_CHARS};

/// Messaging operations over one gateway.
pub struct Messenger<'a, G> {
    gateway: &'a G,
}

impl<'a, G: Gateway> Messenger<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(conversations::list).post(conversations::open))
        .route("/conversations/{id}/messages", get(messages::history))
        .route("/conversations/{id}/read", post(unread::mark_read))
        .route("/messages", post(messages::send))
        .route("/users", get(users::search))
}
