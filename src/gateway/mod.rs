//! Access to the hosted relational store.
//!
//! Everything the rest of the crate knows about persistence goes through
//! [`Gateway`]. Rows come back decoded into the typed records below; a
//! payload that does not fit them is an [`Error::Decode`](crate::Error::Decode).

mod rest;
mod sqlite;

use std::future::Future;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{config::Config, Result};

pub use rest::RestGateway;
pub use sqlite::SqliteGateway;

pub type UserId = String;
pub type ConversationId = Uuid;
pub type CourseId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant1_id: UserId,
    pub participant2_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }

    /// The participant that is not `user_id`, if `user_id` takes part at all.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if self.participant1_id == user_id {
            Some(&self.participant2_id)
        } else if self.participant2_id == user_id {
            Some(&self.participant1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

/// Insert payload for the messages table; the store fills in the rest.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

impl NewMessage {
    pub fn unread(sender_id: &str, recipient_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender_id: sender_id.to_owned(),
            recipient_id: recipient_id.to_owned(),
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
            is_read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The operations this crate needs from the store.
///
/// Each call is one round trip. Implementations must make
/// [`get_or_create_conversation`](Gateway::get_or_create_conversation)
/// atomic for an unordered pair; callers have no transaction of their own.
pub trait Gateway: Send + Sync {
    /// Conversations where `user_id` is either participant, most recently
    /// active first.
    fn conversations_for(&self, user_id: &str) -> impl Future<Output = Result<Vec<Conversation>>> + Send;

    /// Resolve-or-insert the conversation for `{user1_id, user2_id}`.
    fn get_or_create_conversation(&self, user1_id: &str, user2_id: &str) -> impl Future<Output = Result<ConversationId>> + Send;

    fn touch_conversation(&self, id: ConversationId, at: OffsetDateTime) -> impl Future<Output = Result<()>> + Send;

    /// Messages exchanged between `a` and `b` in either direction, oldest first.
    fn messages_between(&self, a: &str, b: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn insert_message(&self, message: &NewMessage) -> impl Future<Output = Result<Message>> + Send;

    /// Count-only read of unread messages from `sender_id` to `recipient_id`.
    fn count_unread(&self, sender_id: &str, recipient_id: &str) -> impl Future<Output = Result<u64>> + Send;

    fn mark_read(&self, sender_id: &str, recipient_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> impl Future<Output = Result<Option<UserRecord>>> + Send;

    fn course(&self, id: CourseId) -> impl Future<Output = Result<Option<Course>>> + Send;

    fn courses(&self) -> impl Future<Output = Result<Vec<Course>>> + Send;

    /// Inserts the enrollment unless it already exists.
    fn enroll(&self, course_id: CourseId, user_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn enrolled_courses(&self, user_id: &str) -> impl Future<Output = Result<Vec<Course>>> + Send;

    /// Who an access token issued by the auth provider belongs to.
    fn user_for_token(&self, token: &str) -> impl Future<Output = Result<Option<UserId>>> + Send;
}

/// The gateway the server was configured with.
#[derive(Clone)]
pub enum Backend {
    Rest(RestGateway),
    Sqlite(SqliteGateway),
}

impl Backend {
    pub async fn connect(config: &Config) -> Result<Backend> {
        match (&config.gateway_url, &config.database_url) {
            (Some(url), _) => {
                tracing::info!("using hosted gateway at {url}");
                Ok(Backend::Rest(RestGateway::new(url, config.gateway_key.as_deref().unwrap_or_default())))
            }
            (None, Some(url)) => {
                tracing::info!("using sqlite gateway at {url}");
                Ok(Backend::Sqlite(SqliteGateway::connect(url).await?))
            }
            (None, None) => {
                tracing::warn!("no gateway configured, falling back to an in-memory sqlite store");
                Ok(Backend::Sqlite(SqliteGateway::in_memory().await?))
            }
        }
    }

    /// The same backend acting with the caller's access token, so the hosted
    /// store applies that user's row policies.
    pub fn authorized(&self, token: Option<&str>) -> Backend {
        match self {
            Backend::Rest(rest) => Backend::Rest(rest.with_token(token)),
            Backend::Sqlite(sqlite) => Backend::Sqlite(sqlite.clone()),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $g:ident => $call:expr) => {
        match $self {
            Backend::Rest($g) => $call.await,
            Backend::Sqlite($g) => $call.await,
        }
    };
}

impl Gateway for Backend {
    async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        delegate!(self, g => g.conversations_for(user_id))
    }

    async fn get_or_create_conversation(&self, user1_id: &str, user2_id: &str) -> Result<ConversationId> {
        delegate!(self, g => g.get_or_create_conversation(user1_id, user2_id))
    }

    async fn touch_conversation(&self, id: ConversationId, at: OffsetDateTime) -> Result<()> {
        delegate!(self, g => g.touch_conversation(id, at))
    }

    async fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        delegate!(self, g => g.messages_between(a, b))
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        delegate!(self, g => g.insert_message(message))
    }

    async fn count_unread(&self, sender_id: &str, recipient_id: &str) -> Result<u64> {
        delegate!(self, g => g.count_unread(sender_id, recipient_id))
    }

    async fn mark_read(&self, sender_id: &str, recipient_id: &str) -> Result<()> {
        delegate!(self, g => g.mark_read(sender_id, recipient_id))
    }

    async fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> Result<Option<UserRecord>> {
        delegate!(self, g => g.search_user_by_email(email, requesting_user_id))
    }

    async fn course(&self, id: CourseId) -> Result<Option<Course>> {
        delegate!(self, g => g.course(id))
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        delegate!(self, g => g.courses())
    }

    async fn enroll(&self, course_id: CourseId, user_id: &str) -> Result<()> {
        delegate!(self, g => g.enroll(course_id, user_id))
    }

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        delegate!(self, g => g.enrolled_courses(user_id))
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>> {
        delegate!(self, g => g.user_for_token(token))
    }
}
