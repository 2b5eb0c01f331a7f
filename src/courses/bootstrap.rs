use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;

use crate::{
    gateway::{Backend, ConversationId, Course, CourseId, Gateway},
    messaging::{Messenger, SentMessage},
    session::CurrentUser,
    AppResult, Error, Result,
};

use super::Courses;

/// The first message a student sends when contacting an instructor.
pub fn introduction(course_title: &str) -> String {
    format!("Hi! I'm interested in your course \"{course_title}\". Could you tell me more about it?")
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedOutcome {
    Sent(SentMessage),
    /// The conversation exists but the introduction did not go out.
    Failed { reason: String },
}

/// How far contacting an instructor got.
///
/// Reaching this report means the course was found and the conversation
/// exists; only the introduction can still be missing.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub course: Course,
    pub user_id: String,
    pub conversation_id: ConversationId,
    pub seed: SeedOutcome,
}

impl BootstrapReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.seed, SeedOutcome::Sent(_))
    }

    /// Sends the introduction again if it failed before. A no-op once it went out.
    pub async fn retry_seed<G: Gateway>(&mut self, gateway: &G) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }

        let sent = Messenger::new(gateway)
            .send_message(&self.user_id, &self.course.instructor_id, &introduction(&self.course.title))
            .await?;
        self.seed = SeedOutcome::Sent(sent);
        Ok(())
    }
}

impl<G: Gateway> Courses<'_, G> {
    /// Opens (or reuses) the conversation between `user_id` and the course's
    /// instructor and sends the introduction into it.
    pub async fn start_course_conversation(&self, course_id: CourseId, user_id: &str) -> Result<BootstrapReport> {
        let course = self.course(course_id).await?;
        if course.instructor_id == user_id {
            return Err(Error::invalid("cannot start a conversation about your own course"));
        }

        let messenger = Messenger::new(self.gateway);
        let conversation_id = messenger
            .get_or_create_conversation(user_id, &course.instructor_id)
            .await?;

        let seed = match messenger
            .send_message(user_id, &course.instructor_id, &introduction(&course.title))
            .await
        {
            Ok(sent) => SeedOutcome::Sent(sent),
            Err(err) => {
                tracing::warn!(%course_id, %conversation_id, "introduction from {user_id} not sent: {err}");
                SeedOutcome::Failed { reason: err.to_string() }
            }
        };

        Ok(BootstrapReport {
            course,
            user_id: user_id.to_owned(),
            conversation_id,
            seed,
        })
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn contact(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Path(course_id): Path<CourseId>,
) -> AppResult<Json<BootstrapReport>> {
    let gateway = gateway.authorized(user.token());
    let report = Courses::new(&gateway)
        .start_course_conversation(course_id, &user.user_id)
        .await?;

    Ok(Json(report))
}
