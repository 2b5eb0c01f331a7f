mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use coursechat::{
    app,
    gateway::{Role, SqliteGateway},
    AppState, Backend, Config,
};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{gateway, user};

async fn seeded() -> SqliteGateway {
    let gateway = gateway().await;
    gateway.add_user(&user("student", "student@uni.edu", Role::Student)).await.unwrap();
    gateway.add_user(&user("prof", "prof@uni.edu", Role::Teacher)).await.unwrap();
    gateway.add_access_token("student-token", "student").await.unwrap();
    gateway.add_access_token("prof-token", "prof").await.unwrap();
    gateway
}

fn server(gateway: &SqliteGateway) -> TestServer {
    let state = AppState { gateway: Backend::Sqlite(gateway.clone()) };
    let app = app(state, &Config::default()).unwrap();
    TestServer::builder().save_cookies().build(app).unwrap()
}

async fn logged_in(gateway: &SqliteGateway, token: &str) -> TestServer {
    let server = server(gateway);
    server
        .post("/login")
        .json(&json!({ "access_token": token }))
        .await
        .assert_status_ok();
    server
}

#[tokio::test]
async fn requests_without_login_are_refused() {
    let gateway = seeded().await;
    let server = server(&gateway);

    server.get("/m/conversations").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/login")
        .json(&json!({ "access_token": "forged" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_logout() {
    let gateway = seeded().await;
    let server = server(&gateway);

    let response = server.post("/login").json(&json!({ "access_token": "student-token" })).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["user_id"], "student");
    server.get("/m/conversations").await.assert_status_ok();

    server.post("/logout").await.assert_status(StatusCode::NO_CONTENT);
    server.get("/m/conversations").await.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contacting_an_instructor_end_to_end() {
    let gateway = seeded().await;
    let course = gateway.add_course("Intro to Biology", None, "prof").await.unwrap();

    let student = logged_in(&gateway, "student-token").await;
    let response = student.post(&format!("/c/{}/contact", course.id)).await;
    response.assert_status_ok();
    let report = response.json::<Value>();
    assert_eq!(report["seed"]["status"], "sent");
    let conversation_id = report["conversation_id"].as_str().unwrap().to_owned();

    let prof = logged_in(&gateway, "prof-token").await;
    let listed = prof.get("/m/conversations").await.json::<Value>();
    assert_eq!(listed[0]["id"], conversation_id.as_str());
    assert_eq!(listed[0]["other_user_id"], "student");
    assert_eq!(listed[0]["unread"], 1);

    let history = prof.get(&format!("/m/conversations/{conversation_id}/messages")).await.json::<Value>();
    let content = history[0]["content"].as_str().unwrap();
    assert!(content.contains("interested in your course \"Intro to Biology\""));

    prof.post(&format!("/m/conversations/{conversation_id}/read"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let listed = prof.get("/m/conversations").await.json::<Value>();
    assert_eq!(listed[0]["unread"], 0);

    student
        .post(&format!("/c/{}/contact", Uuid::now_v7()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    prof.post(&format!("/c/{}/contact", course.id))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sending_and_searching() {
    let gateway = seeded().await;
    let student = logged_in(&gateway, "student-token").await;

    let found = student.get("/m/users").add_query_param("email", "prof@uni.edu").await.json::<Value>();
    assert_eq!(found["id"], "prof");
    assert_eq!(found["role"], "teacher");

    let response = student
        .post("/m/messages")
        .json(&json!({ "recipient_id": "prof", "content": "office hours?" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["conversation"]["status"], "updated");

    student
        .post("/m/messages")
        .json(&json!({ "recipient_id": "prof", "content": "  " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let opened = student.post("/m/conversations").json(&json!({ "user_id": "prof" })).await.json::<Value>();
    let listed = student.get("/m/conversations").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], opened["id"]);

    let unknown = student.get(&format!("/m/conversations/{}/messages", Uuid::now_v7())).await.json::<Value>();
    assert_eq!(unknown, json!([]));
}

#[tokio::test]
async fn enrolling_through_the_catalog() {
    let gateway = seeded().await;
    let course = gateway.add_course("Botany", None, "prof").await.unwrap();
    let student = logged_in(&gateway, "student-token").await;

    let catalog = student.get("/c").await.json::<Value>();
    assert_eq!(catalog[0]["title"], "Botany");

    student.post(&format!("/c/{}/enroll", course.id)).await.assert_status(StatusCode::NO_CONTENT);
    let mine = student.get("/c/mine").await.json::<Value>();
    assert_eq!(mine[0]["id"], course.id.to_string());

    student.get(&format!("/c/{}", Uuid::now_v7())).await.assert_status(StatusCode::NOT_FOUND);
}
