#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use coursechat::{
    gateway::{Conversation, ConversationId, Course, CourseId, Gateway, Message, NewMessage, Role, SqliteGateway, UserId, UserRecord},
    Error, Result,
};
use time::OffsetDateTime;

pub async fn gateway() -> SqliteGateway {
    SqliteGateway::in_memory().await.unwrap()
}

pub fn user(id: &str, email: &str, role: Role) -> UserRecord {
    UserRecord {
        id: id.to_owned(),
        email: email.to_owned(),
        first_name: Some(id.to_uppercase()),
        last_name: None,
        department: None,
        role,
    }
}

fn injected(op: &str) -> Error {
    Error::Gateway(format!("injected failure in {op}").into())
}

/// A sqlite gateway that can be told to fail single operations.
pub struct FlakyGateway {
    pub inner: SqliteGateway,
    pub fail_insert: AtomicBool,
    pub fail_touch: AtomicBool,
    pub resolves: AtomicUsize,
}

impl FlakyGateway {
    pub async fn new() -> Self {
        FlakyGateway {
            inner: gateway().await,
            fail_insert: AtomicBool::new(false),
            fail_touch: AtomicBool::new(false),
            resolves: AtomicUsize::new(0),
        }
    }
}

impl Gateway for FlakyGateway {
    async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.inner.conversations_for(user_id).await
    }

    async fn get_or_create_conversation(&self, user1_id: &str, user2_id: &str) -> Result<ConversationId> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.get_or_create_conversation(user1_id, user2_id).await
    }

    async fn touch_conversation(&self, id: ConversationId, at: OffsetDateTime) -> Result<()> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(injected("touch_conversation"));
        }
        self.inner.touch_conversation(id, at).await
    }

    async fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        self.inner.messages_between(a, b).await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected("insert_message"));
        }
        self.inner.insert_message(message).await
    }

    async fn count_unread(&self, sender_id: &str, recipient_id: &str) -> Result<u64> {
        self.inner.count_unread(sender_id, recipient_id).await
    }

    async fn mark_read(&self, sender_id: &str, recipient_id: &str) -> Result<()> {
        self.inner.mark_read(sender_id, recipient_id).await
    }

    async fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> Result<Option<UserRecord>> {
        self.inner.search_user_by_email(email, requesting_user_id).await
    }

    async fn course(&self, id: CourseId) -> Result<Option<Course>> {
        self.inner.course(id).await
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        self.inner.courses().await
    }

    async fn enroll(&self, course_id: CourseId, user_id: &str) -> Result<()> {
        self.inner.enroll(course_id, user_id).await
    }

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        self.inner.enrolled_courses(user_id).await
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>> {
        self.inner.user_for_token(token).await
    }
}
