//! End-to-end tests for the HTTP surface, run against the in-memory store.

use api_lib::adapters::MemoryAdapter;
use api_lib::config::Config;
use api_lib::web::{api_router, token::TokenKeys, AppState};
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn test_config() -> Config {
    let vars = HashMap::from([
        ("DATABASE_URL".to_string(), "memory://".to_string()),
        ("TOKEN_SECRET".to_string(), SECRET.to_string()),
    ]);
    Config::from_vars(&vars).unwrap()
}

fn create_test_server() -> TestServer {
    let state = AppState::new(Arc::new(MemoryAdapter::new()), Arc::new(test_config()));
    TestServer::new(api_router(Arc::new(state))).unwrap()
}

async fn register(server: &TestServer, username: &str, email: &str, password: &str) {
    server
        .post("/user/register")
        .json(&json!({
            "username": username,
            "password": password,
            "email": email,
            "country": "NZ",
            "phone": 5550100,
            "city": "Wellington"
        }))
        .await
        .assert_status_ok();
}

/// Logs in and returns the value of the `token` cookie.
async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/user/login")
        .json(&json!({ "username": username, "password": password }))
        .await;
    response.assert_status_ok();
    response.cookie("token").value().to_string()
}

fn cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("token={}", token)).unwrap()
}

/// bob has asked "Why Go?"; returns (bob's token, alice's token).
async fn seed(server: &TestServer) -> (String, String) {
    register(server, "bob", "b@x.com", "bob-password").await;
    register(server, "alice", "a@x.com", "alice-password").await;
    let bob = login(server, "bob", "bob-password").await;
    let alice = login(server, "alice", "alice-password").await;

    server
        .post("/user/question")
        .add_header(header::COOKIE, cookie(&bob))
        .json(&json!({
            "username": "bob",
            "email": "b@x.com",
            "title": "Why Go?",
            "content": "Convince me"
        }))
        .await
        .assert_status_ok();

    (bob, alice)
}

fn vote_body(votetype: &str) -> Value {
    json!({
        "username": "bob",
        "email": "b@x.com",
        "title": "Why Go?",
        "content": "Convince me",
        "voteusername": "alice",
        "voteemail": "a@x.com",
        "votetype": votetype
    })
}

async fn all_questions(server: &TestServer) -> Value {
    let response = server.get("/user/questions/all").await;
    response.assert_status_ok();
    response.json::<Value>()
}

// ============ Auth ============

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let server = create_test_server();
    register(&server, "bob", "b@x.com", "pw").await;

    let response = server
        .post("/user/register")
        .json(&json!({ "username": "bob", "password": "pw", "email": "new@x.com" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Username already taken");
}

#[tokio::test]
async fn login_by_email_sets_token_cookie() {
    let server = create_test_server();
    register(&server, "bob", "b@x.com", "pw").await;

    let response = server
        .post("/user/login")
        .json(&json!({ "email": "b@x.com", "password": "pw" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": false, "message": "A-OK" }));

    let token = response.cookie("token");
    let claims = TokenKeys::new(SECRET.as_bytes(), std::time::Duration::from_secs(1200))
        .verify(Some(token.value()))
        .unwrap();
    assert_eq!(claims.username, "bob");
    assert_eq!(claims.email, "b@x.com");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = create_test_server();
    register(&server, "bob", "b@x.com", "pw").await;

    let response = server
        .post("/user/login")
        .json(&json!({ "username": "bob", "password": "nope" }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(response.json::<Value>()["message"], "Invalid credentials");
}

#[tokio::test]
async fn malformed_body_is_bad_request_with_envelope() {
    let server = create_test_server();
    let response = server
        .post("/user/register")
        .json(&json!({ "username": "bob" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["error"], true);
}

// ============ Credential gate ============

#[tokio::test]
async fn protected_routes_require_a_token() {
    let server = create_test_server();
    seed(&server).await;

    let response = server
        .post("/user/question/vote")
        .json(&vote_body("upvote"))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(response.json::<Value>()["error"], true);
}

#[tokio::test]
async fn garbage_token_is_bad_request() {
    let server = create_test_server();
    seed(&server).await;

    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie("garbage"))
        .json(&vote_body("upvote"))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = create_test_server();
    seed(&server).await;

    let keys = TokenKeys::new(SECRET.as_bytes(), std::time::Duration::from_secs(1200));
    let (expired, _) = keys
        .issue_at("alice", "a@x.com", Utc::now() - Duration::hours(2))
        .unwrap();

    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&expired))
        .json(&vote_body("upvote"))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn token_must_belong_to_the_voter() {
    let server = create_test_server();
    let (bob, _) = seed(&server).await;

    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&bob))
        .json(&vote_body("upvote"))
        .await
        .assert_status_unauthorized();
}

// ============ Voting ============

#[tokio::test]
async fn upvote_then_repeat_is_rejected() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    let first = server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&vote_body("upvote"))
        .await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body["error"], false);
    assert_eq!(body["data"]["votes"], 1);
    assert_eq!(all_questions(&server).await["data"][0]["votes"], 1);

    let second = server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&vote_body("upvote"))
        .await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["error"], true);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("User already cast the upvote"));
    assert_eq!(all_questions(&server).await["data"][0]["votes"], 1);
}

#[tokio::test]
async fn downvote_after_upvote_is_allowed() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    for votetype in ["upvote", "downvote"] {
        server
            .post("/user/question/vote")
            .add_header(header::COOKIE, cookie(&alice))
            .json(&vote_body(votetype))
            .await
            .assert_status_ok();
    }
    assert_eq!(all_questions(&server).await["data"][0]["votes"], 0);
}

#[tokio::test]
async fn vote_matches_on_title_alone() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    let mut body = vote_body("upvote");
    body["content"] = json!("edited content");
    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&body)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn unknown_vote_type_and_question_are_rejected() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&vote_body("sideways"))
        .await
        .assert_status_bad_request();

    let mut body = vote_body("upvote");
    body["title"] = json!("Why Perl?");
    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&body)
        .await
        .assert_status_not_found();
}

// ============ Answers and listings ============

#[tokio::test]
async fn answers_are_listed_in_posting_order() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    for text in ["t1", "t2", "t3"] {
        server
            .post("/user/question/answer")
            .add_header(header::COOKIE, cookie(&alice))
            .json(&json!({
                "answerusername": "alice",
                "answeremail": "a@x.com",
                "questionusername": "bob",
                "questionemail": "b@x.com",
                "answer": text,
                "title": "Why Go?"
            }))
            .await
            .assert_status_ok();
    }

    let questions = all_questions(&server).await;
    let answers = questions["data"][0]["answers"].as_array().unwrap();
    let texts: Vec<_> = answers.iter().map(|a| a["answer"].as_str().unwrap()).collect();
    assert_eq!(texts, ["t1", "t2", "t3"]);
    assert_eq!(answers[0]["username"], "alice");
    assert_eq!(answers[0]["isselected"], false);
}

#[tokio::test]
async fn answer_to_missing_question_is_not_found() {
    let server = create_test_server();
    let (_, alice) = seed(&server).await;

    server
        .post("/user/question/answer")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&json!({
            "answerusername": "alice",
            "answeremail": "a@x.com",
            "questionusername": "bob",
            "answer": "hi",
            "title": "Why Perl?"
        }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn duplicate_question_title_conflicts() {
    let server = create_test_server();
    let (bob, _) = seed(&server).await;

    server
        .post("/user/question")
        .add_header(header::COOKIE, cookie(&bob))
        .json(&json!({
            "username": "bob",
            "email": "b@x.com",
            "title": "Why Go?",
            "content": "again"
        }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn top_sort_orders_by_votes_and_requires_sort() {
    let server = create_test_server();
    let (bob, alice) = seed(&server).await;

    server
        .post("/user/question")
        .add_header(header::COOKIE, cookie(&alice))
        .json(&json!({
            "username": "alice",
            "email": "a@x.com",
            "title": "Why Rust?",
            "content": ""
        }))
        .await
        .assert_status_ok();
    server
        .post("/user/question/vote")
        .add_header(header::COOKIE, cookie(&bob))
        .json(&json!({
            "title": "Why Rust?",
            "voteusername": "bob",
            "voteemail": "b@x.com",
            "votetype": "upvote"
        }))
        .await
        .assert_status_ok();

    let response = server
        .get("/user/questions/order")
        .add_query_param("sort", "top")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"][0]["title"], "Why Rust?");
    assert_eq!(body["data"][1]["title"], "Why Go?");

    server
        .get("/user/questions/order")
        .await
        .assert_status_bad_request();
}
