use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};

use crate::{
    gateway::{Backend, Course, CourseId, Gateway},
    session::CurrentUser,
    AppResult, Error, Result,
};

use super::Courses;

impl<G: Gateway> Courses<'_, G> {
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.gateway.courses().await
    }

    pub async fn course(&self, course_id: CourseId) -> Result<Course> {
        self.gateway
            .course(course_id)
            .await?
            .ok_or_else(|| Error::not_found("course", course_id))
    }

    /// Enrolls `user_id`; enrolling again changes nothing.
    pub async fn enroll(&self, course_id: CourseId, user_id: &str) -> Result<()> {
        let course = self.course(course_id).await?;
        if course.instructor_id == user_id {
            return Err(Error::invalid("instructors cannot enroll in their own course"));
        }

        self.gateway.enroll(course_id, user_id).await?;
        tracing::info!(%course_id, "{user_id} enrolled in {:?}", course.title);
        Ok(())
    }

    pub async fn enrollments(&self, user_id: &str) -> Result<Vec<Course>> {
        self.gateway.enrolled_courses(user_id).await
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(gateway): State<Backend>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Course>>> {
    let gateway = gateway.authorized(user.token());
    Ok(Json(Courses::new(&gateway).list_courses().await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mine(
    State(gateway): State<Backend>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Course>>> {
    let gateway = gateway.authorized(user.token());
    Ok(Json(Courses::new(&gateway).enrollments(&user.user_id).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn show(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Path(course_id): Path<CourseId>,
) -> AppResult<Json<Course>> {
    let gateway = gateway.authorized(user.token());
    Ok(Json(Courses::new(&gateway).course(course_id).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn enroll(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Path(course_id): Path<CourseId>,
) -> AppResult<StatusCode> {
    let gateway = gateway.authorized(user.token());
    Courses::new(&gateway).enroll(course_id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
