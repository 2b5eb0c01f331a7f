use reqwest::{header::{HeaderMap, CONTENT_RANGE}, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{Error, Result};

use super::{Conversation, ConversationId, Course, CourseId, Gateway, Message, NewMessage, UserId, UserRecord};

/// The hosted store, spoken to over its REST interface: tables under
/// `/rest/v1/<table>`, procedures under `/rest/v1/rpc/<name>` and token
/// introspection under `/auth/v1/user`.
#[derive(Clone)]
pub struct RestGateway {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenOwner {
    id: UserId,
}

#[derive(Deserialize)]
struct CourseRef {
    courses: Option<Course>,
}

#[derive(Serialize)]
struct Enrollment<'a> {
    course_id: CourseId,
    user_id: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    enrolled_at: OffsetDateTime,
}

#[derive(Serialize)]
struct Touched {
    #[serde(with = "time::serde::rfc3339")]
    last_message_at: OffsetDateTime,
}

/// Quotes a value for use inside a PostgREST `or=(...)` filter.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Total row count out of a `Content-Range` header such as `0-4/5` or `*/0`.
fn total_from_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.parse().ok()
}

impl RestGateway {
    pub fn new(base_url: &str, api_key: &str) -> RestGateway {
        RestGateway {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            access_token: None,
        }
    }

    /// Same endpoint, authenticated as the holder of `token` instead of the
    /// anonymous key.
    pub fn with_token(&self, token: Option<&str>) -> RestGateway {
        RestGateway {
            access_token: token.map(str::to_owned),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http_client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"))
    }

    fn rpc(&self, name: &str) -> RequestBuilder {
        self.request(Method::POST, &format!("/rest/v1/rpc/{name}"))
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "gateway refused request: {body}");
        Err(Error::GatewayStatus { status: status.as_u16(), body })
    }

    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>> {
        let body = Self::send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn first<T: DeserializeOwned>(request: RequestBuilder) -> Result<Option<T>> {
        Ok(Self::rows(request).await?.into_iter().next())
    }

    fn headers_count(headers: &HeaderMap) -> Result<u64> {
        headers
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(total_from_content_range)
            .ok_or_else(|| Error::Decode("count request answered without a Content-Range total".to_owned()))
    }
}

impl Gateway for RestGateway {
    async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let user = quoted(user_id);
        Self::rows(
            self.table(Method::GET, "conversations")
                .query(&[
                    ("select", "*".to_owned()),
                    ("or", format!("(participant1_id.eq.{user},participant2_id.eq.{user})")),
                    ("order", "last_message_at.desc".to_owned()),
                ])
        ).await
    }

    async fn get_or_create_conversation(&self, user1_id: &str, user2_id: &str) -> Result<ConversationId> {
        let body = Self::send(
            self.rpc("get_or_create_conversation")
                .json(&json!({ "user1_id": user1_id, "user2_id": user2_id }))
        ).await?.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn touch_conversation(&self, id: ConversationId, at: OffsetDateTime) -> Result<()> {
        Self::send(
            self.table(Method::PATCH, "conversations")
                .query(&[("id", format!("eq.{id}"))])
                .json(&Touched { last_message_at: at })
        ).await?;
        Ok(())
    }

    async fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        let (a, b) = (quoted(a), quoted(b));
        Self::rows(
            self.table(Method::GET, "messages")
                .query(&[
                    ("select", "*".to_owned()),
                    ("or", format!(
                        "(and(sender_id.eq.{a},recipient_id.eq.{b}),and(sender_id.eq.{b},recipient_id.eq.{a}))"
                    )),
                    ("order", "created_at.asc".to_owned()),
                ])
        ).await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        Self::first(
            self.table(Method::POST, "messages")
                .header("Prefer", "return=representation")
                .json(message)
        )
        .await?
        .ok_or_else(|| Error::Decode("insert into messages returned no row".to_owned()))
    }

    async fn count_unread(&self, sender_id: &str, recipient_id: &str) -> Result<u64> {
        let response = Self::send(
            self.table(Method::HEAD, "messages")
                .header("Prefer", "count=exact")
                .query(&[
                    ("select", "id".to_owned()),
                    ("sender_id", format!("eq.{sender_id}")),
                    ("recipient_id", format!("eq.{recipient_id}")),
                    ("is_read", "eq.false".to_owned()),
                ])
        ).await?;

        Self::headers_count(response.headers())
    }

    async fn mark_read(&self, sender_id: &str, recipient_id: &str) -> Result<()> {
        Self::send(
            self.table(Method::PATCH, "messages")
                .query(&[
                    ("sender_id", format!("eq.{sender_id}")),
                    ("recipient_id", format!("eq.{recipient_id}")),
                    ("is_read", "eq.false".to_owned()),
                ])
                .json(&json!({ "is_read": true }))
        ).await?;
        Ok(())
    }

    async fn search_user_by_email(&self, email: &str, requesting_user_id: &str) -> Result<Option<UserRecord>> {
        Self::first(
            self.rpc("search_user_by_email")
                .json(&json!({ "search_email": email, "requesting_user_id": requesting_user_id }))
        ).await
    }

    async fn course(&self, id: CourseId) -> Result<Option<Course>> {
        Self::first(
            self.table(Method::GET, "courses")
                .query(&[("select", "*".to_owned()), ("id", format!("eq.{id}"))])
        ).await
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        Self::rows(
            self.table(Method::GET, "courses")
                .query(&[("select", "*"), ("order", "title.asc")])
        ).await
    }

    async fn enroll(&self, course_id: CourseId, user_id: &str) -> Result<()> {
        Self::send(
            self.table(Method::POST, "enrollments")
                .header("Prefer", "resolution=ignore-duplicates")
                .json(&Enrollment { course_id, user_id, enrolled_at: OffsetDateTime::now_utc() })
        ).await?;
        Ok(())
    }

    async fn enrolled_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let rows: Vec<CourseRef> = Self::rows(
            self.table(Method::GET, "enrollments")
                .query(&[
                    ("select", "courses(*)".to_owned()),
                    ("user_id", format!("eq.{user_id}")),
                ])
        ).await?;

        let mut courses: Vec<Course> = rows.into_iter().filter_map(|row| row.courses).collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>> {
        let response = self.http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(Error::GatewayStatus { status, body: response.text().await.unwrap_or_default() });
        }

        let owner: TokenOwner = serde_json::from_slice(&response.bytes().await?)?;
        Ok(Some(owner.id))
    }
}
