//! 用户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// 创建用户请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 150, message = "Email must be at most 150 characters")
    )]
    pub email: String,

    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
}

// 更新用户请求，所有字段可选
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 150, message = "Email must be at most 150 characters")
    )]
    pub email: Option<String>,

    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
}

// 分页参数
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListUsersQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

/// 后端报告的连接身份，仅供展示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendIdentity {
    pub connection_id: u64,
    pub user: String,
    pub server: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub database: String,
    pub connection_id: u64,
    pub user: String,
    pub server: String,
    pub proxysql_host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConnection {
    pub connection_id: u64,
    pub user: String,
    pub hostname: String,
    pub port: i64,
}

/// `/proxysql/stats` 的响应：代理分配到的后端节点信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingStats {
    pub current_connection: CurrentConnection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_role: Option<String>,
}

impl RoutingStats {
    /// `read_only = ON` 的节点是从库
    pub fn role_for(read_only: &str) -> &'static str {
        if read_only.eq_ignore_ascii_case("ON") {
            "replica"
        } else {
            "master"
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleUsersResponse {
    pub message: String,
    pub users: Vec<User>,
}
