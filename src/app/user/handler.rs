//! 用户处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use super::model::{
    CreateUserRequest, HealthReport, ListUsersQuery, MessageResponse, RoutingStats,
    SampleUsersResponse, UpdateUserRequest, User,
};
use super::service::UserService;
use crate::core::error::CoreError;
use crate::core::extract::{ValidPath, ValidQuery, ValidatedJson};
use crate::core::service::Service;

#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
}

/// 服务信息
pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": state.user_service.name(),
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "users": "/users",
            "create_user": "POST /users",
            "get_user": "/users/{id}",
            "update_user": "PUT /users/{id}",
            "delete_user": "DELETE /users/{id}",
            "search_users": "/users/search/{query}",
            "sample_users": "POST /users/sample",
            "proxysql_stats": "/proxysql/stats"
        }
    }))
}

/// 健康检查：数据库不可达时返回 503
pub async fn health_check(State(state): State<AppState>) -> Response {
    match state.user_service.health().await {
        Ok(report) => Json::<HealthReport>(report).into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.public_message(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListUsersQuery>,
) -> Result<Json<Vec<User>>, CoreError> {
    let users = state.user_service.list_users(query).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<User>, CoreError> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(user))
}

pub async fn search_users(
    State(state): State<AppState>,
    ValidPath(query): ValidPath<String>,
) -> Result<Json<Vec<User>>, CoreError> {
    let users = state.user_service.search_users(&query).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), CoreError> {
    let user = state.user_service.create_user(&payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, CoreError> {
    let user = state.user_service.update_user(id, payload).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<MessageResponse>, CoreError> {
    let message = state.user_service.delete_user(id).await?;
    Ok(Json(MessageResponse { message }))
}

pub async fn routing_stats(
    State(state): State<AppState>,
) -> Result<Json<RoutingStats>, CoreError> {
    let stats = state.user_service.routing_stats().await?;
    Ok(Json(stats))
}

pub async fn create_sample_users(
    State(state): State<AppState>,
) -> Result<Json<SampleUsersResponse>, CoreError> {
    let users = state.user_service.seed_samples().await?;
    Ok(Json(SampleUsersResponse {
        message: format!("Created {} sample users", users.len()),
        users,
    }))
}
