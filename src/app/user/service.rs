//! 用户业务服务

use std::sync::Arc;
use tracing::{info, warn};

use super::model::{
    CreateUserRequest, HealthReport, ListUsersQuery, RoutingStats, UpdateUserRequest, User,
};
use super::repository::{UserRepository, USER_NOT_FOUND};
use crate::core::error::{CoreError, CoreResult};
use crate::core::service::Service;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    /// ProxySQL 的 `host:port`，只用于健康检查展示
    proxy_endpoint: String,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, proxy_endpoint: impl Into<String>) -> Self {
        Self {
            repo,
            proxy_endpoint: proxy_endpoint.into(),
        }
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> CoreResult<User> {
        self.repo.create(req).await
    }

    pub async fn get_user(&self, id: i64) -> CoreResult<User> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))
    }

    pub async fn list_users(&self, query: ListUsersQuery) -> CoreResult<Vec<User>> {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        self.repo.list(skip, limit).await
    }

    pub async fn search_users(&self, query: &str) -> CoreResult<Vec<User>> {
        self.repo.search(query).await
    }

    pub async fn update_user(&self, id: i64, req: UpdateUserRequest) -> CoreResult<User> {
        self.repo.update(id, &req.into()).await
    }

    pub async fn delete_user(&self, id: i64) -> CoreResult<String> {
        self.repo.delete(id).await?;
        Ok(format!("User {} deleted successfully", id))
    }

    pub async fn health(&self) -> CoreResult<HealthReport> {
        let identity = self.repo.health().await?;
        Ok(HealthReport {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            connection_id: identity.connection_id,
            user: identity.user,
            server: identity.server,
            proxysql_host: self.proxy_endpoint.clone(),
        })
    }

    pub async fn routing_stats(&self) -> CoreResult<RoutingStats> {
        self.repo.routing_stats().await
    }

    /// 写入示例用户，已存在的邮箱跳过
    pub async fn seed_samples(&self) -> CoreResult<Vec<User>> {
        let mut created = Vec::new();
        for (name, email, age) in SAMPLE_USERS {
            let req = CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                age: Some(*age),
            };
            match self.repo.create(&req).await {
                Ok(user) => created.push(user),
                Err(CoreError::Conflict(_)) => {
                    warn!("Sample user {} already exists, skipping", email);
                }
                Err(e) => return Err(e),
            }
        }
        info!("Created {} sample users", created.len());
        Ok(created)
    }
}

impl Service for UserService {
    fn name(&self) -> &'static str {
        "ProxySQL CRUD Demo API"
    }
}

const SAMPLE_USERS: &[(&str, &str, i32)] = &[
    ("Alice Johnson", "alice@example.com", 28),
    ("Bob Smith", "bob@example.com", 35),
    ("Carol Davis", "carol@example.com", 31),
    ("David Wilson", "david@example.com", 42),
    ("Eve Brown", "eve@example.com", 29),
];
