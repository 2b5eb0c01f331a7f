use std::str::FromStr;

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::Result;

use super::{Conversation, ConversationId, Course, CourseId, Gateway, Message, NewMessage, Role, UserId, UserRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    first_name TEXT,
    last_name TEXT,
    department TEXT,
    role TEXT NOT NULL DEFAULT 'student'
);

CREATE TABLE IF NOT EXISTS access_tokens (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS courses (
    id BLOB PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    instructor_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    course_id BLOB NOT NULL REFERENCES courses(id),
    user_id TEXT NOT NULL,
    enrolled_at TEXT NOT NULL,
    PRIMARY KEY (course_id, user_id)
);

CREATE TABLE IF NOT EXISTS conversations (
    id BLOB PRIMARY KEY,
    participant1_id TEXT NOT NULL,
    participant2_id TEXT NOT NULL,
    last_message_at TEXT NOT NULL,
    CHECK (participant1_id < participant2_id),
    UNIQUE (participant1_id, participant2_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id BLOB PRIMARY KEY,
    sender_id TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS messages_pair ON messages (sender_id, recipient_id, is_read);
"#;

/// The store on a local SQLite database, same schema and contract as the
/// hosted one.
#[derive(Clone)]
pub struct SqliteGateway {
    db_pool: SqlitePool,
}

impl SqliteGateway {
    pub async fn connect(url: &str) -> Result<SqliteGateway> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        Self::with_pool(db_pool).await
    }

    /// A private database that lives as long as the gateway.
    pub async fn in_memory() -> Result<SqliteGateway> {
        // every connection to :memory: is its own database
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(db_pool).await
    }

    pub async fn with_pool(db_pool: SqlitePool) -> Result<SqliteGateway> {
        sqlx::raw_sql(SCHEMA).execute(&db_pool).await?;
        Ok(SqliteGateway { db_pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    pub async fn add_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query("INSERT INTO users (id,email,first_name,last_name,department,role) VALUES (?,?,?,?,?,?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.department)
            .bind(user.role)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn add_access_token(&self, token: &str, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO access_tokens (token,user_id) VALUES (?,?)")
            .bind(token)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn add_course(&self, title: &str, description: Option<&str>, instructor_id: &str) -> Result<Course> {
        let course = Course {
            id: Uuid::now_v7(),
            title: title.to_owned(),
            description: description.map(str::to_owned),
            instructor_id: instructor_id.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };

        sqlx::query("INSERT INTO courses (id,title,description,instructor_id,created_at) VALUES (?,?,?,?,?)")
            .bind(course.id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(&course.instructor_id)
            .bind(sortable(course.created_at))
            .execute(&self.db_pool)
            .await?;

        Ok(course)
    }
}

/// Fixed-width UTC text with all nine fraction digits, so that comparing the
/// stored strings compares the instants.
fn sortable(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.nanosecond(),
    )
}

fn canonical<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Gateway for SqliteGateway {
    async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        Ok(
            sqlx::query_as(
                "SELECT id,participant1_id,participant2_id,last_message_at FROM conversations \
                 WHERE participant1_id=? OR participant2_id=? ORDER BY last_message_at DESC",
            )
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?
        )
    }

    async fn get_or_create_conversation(&self, user1_id: &str, user2_id: &str) -> Result<ConversationId> {
        let (low, high) = canonical(user1_id, user2_id);

        let mut tx = self.db_pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO conversations (id,participant1_id,participant2_id,last_message_at) VALUES (?,?,?,?) \
             ON CONFLICT (participant1_id,participant2_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(low)
        .bind(high)
        .bind(sortable(OffsetDateTime::now_utc()))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM conversations WHERE participant1_id=? AND participant2_id=?")
            .bind(low)
            .bind(high)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        if inserted > 0 {
            tracing::debug!(%id, "created conversation {low} <-> {high}");
        }
        Ok(id)
    }

    async fn touch_conversation(&self, id: ConversationId, at: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE conversations SET last_message_at=? WHERE id=?")
            .bind(sortable(at))
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        Ok(
            sqlx::query_as(
                "SELECT id,sender_id,recipient_id,content,created_at,is_read FROM messages \
                 WHERE (sender_id=? AND recipient_id=?) OR (sender_id=? AND recipient_id=?) \
                 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .fetch_all(&self.db_pool)
            .await?
        )
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        sqlx::query("INSERT INTO messages (id,sender_id,recipient_id,content,created_at,is_read) VALUES (?,?,?,?,?,?)")
            .bind(message.id)
            .bind(&message.sender_id)
            .bind(&message.recipient_id)
            .bind(&message.content)
            .bind(sortable(message.created_at))
            .bind(message.is_read)
            .execute(&self.db_pool)
            .await?;

        Ok(Message {
            id: message.id,
            sender_id: message.sender_id.clone(),
            recipient_id: message.recipient_id.clone(),
            content: message.content.clone(),
            created_at: message.created_at,
            is_read: message.is_read,
        })
    }

    async fn count_unread(&self, sender_id: &str, recipient_id: &str) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE sender_id=? AND recipient_id=? AND is_read=0")
            .bind(sender_id)
            .bind(recipient_id)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn mark_read(&self, sender_id: &str, recipient_id: &str) -> Result<()> {
        sqlx::query("UPDATE messages SET is_read=1 WHERE sender_id=? AND recipient_id=? AND is_read=0")
            .bind(sender_id)
            .bind(recipient_id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> Result<Option<UserRecord>> {
        Ok(
            sqlx::query_as(
                "SELECT id,email,first_name,last_name,department,role FROM users WHERE email=? AND id<>?",
            )
            .bind(email.trim())
            .bind(requesting_user_id)
            .fetch_optional(&self.db_pool)
            .await?
        )
    }

    async fn course(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(
            sqlx::query_as("SELECT id,title,description,instructor_id,created_at FROM courses WHERE id=?")
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?
        )
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        Ok(
            sqlx::query_as("SELECT id,title,description,instructor_id,created_at FROM courses ORDER BY title ASC")
                .fetch_all(&self.db_pool)
                .await?
        )
    }

    async fn enroll(&self, course_id: CourseId, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO enrollments (course_id,user_id,enrolled_at) VALUES (?,?,?) ON CONFLICT DO NOTHING")
            .bind(course_id)
            .bind(user_id)
            .bind(sortable(OffsetDateTime::now_utc()))
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        Ok(
            sqlx::query_as(
                "SELECT c.id,c.title,c.description,c.instructor_id,c.created_at FROM courses c \
                 JOIN enrollments e ON e.course_id=c.id WHERE e.user_id=? ORDER BY c.title ASC",
            )
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?
        )
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT user_id FROM access_tokens WHERE token=?")
            .bind(token)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(row.map(|(user_id,)| user_id))
    }
}
