mod common;

use std::sync::atomic::Ordering;

use coursechat::{
    courses::{Courses, SeedOutcome},
    gateway::Gateway,
    messaging::Messenger,
    Error,
};
use uuid::Uuid;

use common::{gateway, FlakyGateway};

#[tokio::test]
async fn contacting_an_instructor_opens_and_seeds_a_conversation() {
    let gateway = gateway().await;
    let course = gateway.add_course("Intro to Biology", None, "prof").await.unwrap();

    let report = Courses::new(&gateway)
        .start_course_conversation(course.id, "student")
        .await
        .unwrap();
    assert!(report.is_complete());

    let conversations = gateway.conversations_for("student").await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, report.conversation_id);

    let history = Messenger::new(&gateway)
        .fetch_messages(report.conversation_id, &conversations)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender_id, "student");
    assert_eq!(history[0].recipient_id, "prof");
    assert!(history[0].content.contains("interested in your course \"Intro to Biology\""));
}

#[tokio::test]
async fn contacting_again_reuses_the_conversation() {
    let gateway = gateway().await;
    let course = gateway.add_course("Organic Chemistry", None, "prof").await.unwrap();
    let messenger = Messenger::new(&gateway);
    let existing = messenger.get_or_create_conversation("prof", "student").await.unwrap();

    let report = Courses::new(&gateway)
        .start_course_conversation(course.id, "student")
        .await
        .unwrap();

    assert_eq!(report.conversation_id, existing);
    assert_eq!(gateway.conversations_for("prof").await.unwrap().len(), 1);
    assert_eq!(gateway.messages_between("prof", "student").await.unwrap().len(), 1);
}

#[tokio::test]
async fn instructors_cannot_contact_themselves() {
    let gateway = gateway().await;
    let course = gateway.add_course("Genetics", None, "prof").await.unwrap();

    let err = Courses::new(&gateway)
        .start_course_conversation(course.id, "prof")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidOperation(_)));
    assert!(gateway.conversations_for("prof").await.unwrap().is_empty());
    assert_eq!(gateway.count_unread("prof", "prof").await.unwrap(), 0);
}

#[tokio::test]
async fn missing_course_is_not_found() {
    let gateway = gateway().await;

    let err = Courses::new(&gateway)
        .start_course_conversation(Uuid::now_v7(), "student")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound { entity: "course", .. }));
    assert!(gateway.conversations_for("student").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_introduction_is_reported_and_can_be_retried() {
    let gateway = FlakyGateway::new().await;
    let course = gateway.inner.add_course("Ecology", None, "prof").await.unwrap();
    gateway.fail_insert.store(true, Ordering::SeqCst);

    let mut report = Courses::new(&gateway)
        .start_course_conversation(course.id, "student")
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert!(matches!(report.seed, SeedOutcome::Failed { .. }));
    assert_eq!(gateway.conversations_for("student").await.unwrap().len(), 1);
    assert!(gateway.messages_between("student", "prof").await.unwrap().is_empty());

    gateway.fail_insert.store(false, Ordering::SeqCst);
    report.retry_seed(&gateway).await.unwrap();
    assert!(report.is_complete());

    // a completed report does not send twice
    report.retry_seed(&gateway).await.unwrap();
    let history = gateway.messages_between("student", "prof").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].content.contains("\"Ecology\""));
}

#[tokio::test]
async fn catalog_lists_and_enrolls() {
    let gateway = gateway().await;
    let zoology = gateway.add_course("Zoology", Some("Animals"), "prof").await.unwrap();
    let botany = gateway.add_course("Botany", None, "prof").await.unwrap();
    let courses = Courses::new(&gateway);

    let titles: Vec<_> = courses.list_courses().await.unwrap().into_iter().map(|c| c.title).collect();
    assert_eq!(titles, ["Botany", "Zoology"]);
    assert_eq!(courses.course(zoology.id).await.unwrap().description.as_deref(), Some("Animals"));

    courses.enroll(zoology.id, "student").await.unwrap();
    courses.enroll(botany.id, "student").await.unwrap();
    courses.enroll(botany.id, "student").await.unwrap();

    let mine: Vec<_> = courses.enrollments("student").await.unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(mine, [botany.id, zoology.id]);
}

#[tokio::test]
async fn enrollment_checks_course_and_instructor() {
    let gateway = gateway().await;
    let course = gateway.add_course("Anatomy", None, "prof").await.unwrap();
    let courses = Courses::new(&gateway);

    assert!(matches!(
        courses.enroll(course.id, "prof").await.unwrap_err(),
        Error::InvalidOperation(_)
    ));
    assert!(matches!(
        courses.enroll(Uuid::now_v7(), "student").await.unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(courses.enrollments("prof").await.unwrap().is_empty());
}
