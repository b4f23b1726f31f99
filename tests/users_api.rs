use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use user_service::app::user::memory::MemoryUserRepository;
use user_service::app::user::model::User;
use user_service::infrastructure::config::{Backend, Config};
use user_service::{app_with_repository, build_app};

fn test_server() -> TestServer {
    let app = app_with_repository(
        Arc::new(MemoryUserRepository::new()),
        "proxysql:6033".to_string(),
    );
    TestServer::new(app).unwrap()
}

async fn create(server: &TestServer, name: &str, email: &str, age: Option<i32>) -> User {
    let response = server
        .post("/users")
        .json(&json!({ "name": name, "email": email, "age": age }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<User>()
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let server = test_server();
    let response = server.get("/").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["health"], "/health");
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["proxysql_host"], "proxysql:6033");
}

#[tokio::test]
async fn test_create_returns_populated_record() {
    let server = test_server();
    let user = create(&server, "Alice Johnson", "alice@example.com", Some(28)).await;

    assert!(user.id > 0);
    assert_eq!(user.name, "Alice Johnson");
    assert_eq!(user.age, Some(28));
    assert_eq!(user.updated_at.unwrap_or(user.created_at), user.created_at);

    let other = create(&server, "Bob Smith", "bob@example.com", None).await;
    assert_ne!(other.id, user.id);
    assert_eq!(other.age, None);
}

#[tokio::test]
async fn test_create_duplicate_email_is_rejected() {
    let server = test_server();
    create(&server, "Alice", "alice@example.com", None).await;

    let response = server
        .post("/users")
        .json(&json!({ "name": "Alice Again", "email": "alice@example.com" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Email already exists");

    let users: Vec<User> = server.get("/users").await.json();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let server = test_server();

    // 缺少 email
    let response = server.post("/users").json(&json!({ "name": "Alice" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/users")
        .json(&json!({ "name": "", "email": "invalid-email" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_unknown_id_is_not_found() {
    let server = test_server();
    let user = create(&server, "Alice", "alice@example.com", None).await;

    for id in [0, user.id + 1, 999_999] {
        server
            .get(&format!("/users/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
    server
        .get(&format!("/users/{}", user.id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() {
    let server = test_server();
    let user = create(&server, "Alice", "alice@example.com", Some(28)).await;

    let response = server
        .put(&format!("/users/{}", user.id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "No fields to update");

    let unchanged: User = server.get(&format!("/users/{}", user.id)).await.json();
    assert_eq!(unchanged, user);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let server = test_server();
    server
        .put("/users/42")
        .json(&json!({ "name": "Nobody" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_name_only() {
    let server = test_server();
    let user = create(&server, "Alice", "alice@example.com", Some(28)).await;

    tokio::time::sleep(Duration::from_millis(5)).await;

    let response = server
        .put(&format!("/users/{}", user.id))
        .json(&json!({ "name": "Alice Cooper" }))
        .await;
    response.assert_status_ok();
    let updated: User = response.json();

    assert_eq!(updated.name, "Alice Cooper");
    assert_eq!(updated.email, user.email);
    assert_eq!(updated.age, user.age);
    assert_eq!(updated.created_at, user.created_at);
    assert!(updated.updated_at.unwrap() > user.updated_at.unwrap());
}

#[tokio::test]
async fn test_update_email_conflict() {
    let server = test_server();
    let alice = create(&server, "Alice", "alice@example.com", None).await;
    create(&server, "Bob", "bob@example.com", None).await;

    server
        .put(&format!("/users/{}", alice.id))
        .json(&json!({ "email": "bob@example.com" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_then_get_and_delete_again() {
    let server = test_server();
    let user = create(&server, "Alice", "alice@example.com", None).await;
    let path = format!("/users/{}", user.id);

    let response = server.delete(&path).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        format!("User {} deleted successfully", user.id)
    );

    server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_returns_most_recent_page() {
    let server = test_server();
    let mut created = Vec::new();
    for i in 0..5 {
        created.push(create(&server, &format!("User {}", i), &format!("user{}@example.com", i), None).await);
    }

    let response = server
        .get("/users")
        .add_query_param("limit", 2)
        .add_query_param("skip", 0)
        .await;
    response.assert_status_ok();
    let page: Vec<User> = response.json();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, created[4].id);
    assert_eq!(page[1].id, created[3].id);

    let page: Vec<User> = server
        .get("/users")
        .add_query_param("limit", 2)
        .add_query_param("skip", 4)
        .await
        .json();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, created[0].id);
}

#[tokio::test]
async fn test_list_rejects_negative_paging() {
    let server = test_server();
    let response = server.get("/users").add_query_param("skip", -1).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_non_numeric_id_is_a_json_bad_request() {
    let server = test_server();
    for response in [
        server.get("/users/abc").await,
        server.delete("/users/abc").await,
        server.put("/users/abc").json(&json!({ "name": "X" })).await,
    ] {
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

/// 指向无人监听的端口，模拟数据库不可达
async fn unreachable_backend_server() -> TestServer {
    let mut config = Config::default();
    config.database.backend = Backend::Mysql;
    config.database.host = "127.0.0.1".to_string();
    config.database.port = 1;
    config.database.acquire_timeout_secs = 1;
    config.database.init_schema = false;

    let app = build_app(&config).await.unwrap();
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_reports_unavailable_backend() {
    let server = unreachable_backend_server().await;

    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["error"], "Database connection failed");
}

#[tokio::test]
async fn test_backend_failure_is_a_generic_server_error() {
    let server = unreachable_backend_server().await;

    let response = server.get("/users").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["message"], "Database connection failed");
    assert_eq!(body["code"], 500);
    assert!(!body.to_string().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_search_by_name_or_email() {
    let server = test_server();
    let alice = create(&server, "Alice Johnson", "alice@example.com", Some(28)).await;
    create(&server, "Bob Smith", "bob@example.com", Some(35)).await;

    let results: Vec<User> = server.get("/users/search/alice").await.json();
    assert_eq!(results, vec![alice]);

    let response = server.get("/users/search/nobody").await;
    response.assert_status_ok();
    let results: Vec<User> = response.json();
    assert!(results.is_empty());

    let results: Vec<User> = server.get("/users/search/example.com").await.json();
    assert_eq!(results.len(), 2);
    assert!(results[0].id < results[1].id);
}

#[tokio::test]
async fn test_sample_users_are_seeded_once() {
    let server = test_server();

    let body: Value = server.post("/users/sample").await.json();
    assert_eq!(body["message"], "Created 5 sample users");
    assert_eq!(body["users"].as_array().unwrap().len(), 5);

    let body: Value = server.post("/users/sample").await.json();
    assert_eq!(body["message"], "Created 0 sample users");
}

#[tokio::test]
async fn test_routing_stats() {
    let server = test_server();
    let response = server.get("/proxysql/stats").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["server_role"], "master");
    assert!(body["current_connection"]["hostname"].is_string());
}

#[tokio::test]
async fn test_request_id_header_is_set() {
    let server = test_server();
    let response = server.get("/").await;
    assert!(response.headers().get("x-request-id").is_some());
}
