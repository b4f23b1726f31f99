//! 内存存储实现
//!
//! 与 MySQL 后端保持相同的约束：邮箱唯一、id 递增且不复用、
//! 搜索不区分大小写（对应 MySQL 默认排序规则）。

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::model::{BackendIdentity, CreateUserRequest, CurrentConnection, RoutingStats, User};
use super::repository::{UserRepository, USER_NOT_FOUND};
use super::update::UserChanges;
use crate::core::error::{CoreError, CoreResult};

const DUPLICATE_EMAIL: &str = "Email already exists";

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    last_id: i64,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    state: Mutex<MemoryState>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| CoreError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &CreateUserRequest) -> CoreResult<User> {
        let mut state = self.lock()?;
        if state.email_taken(&user.email, None) {
            return Err(CoreError::conflict(DUPLICATE_EMAIL));
        }

        state.last_id += 1;
        let now = Utc::now();
        let created = User {
            id: state.last_id,
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            created_at: now,
            updated_at: Some(now),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> CoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn list(&self, skip: u32, limit: u32) -> CoreResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn search(&self, query: &str) -> CoreResult<Vec<User>> {
        let needle = query.to_lowercase();
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> CoreResult<User> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&id) {
            return Err(CoreError::not_found(USER_NOT_FOUND));
        }
        changes.ensure_not_empty()?;
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(CoreError::conflict(DUPLICATE_EMAIL));
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))?;
        changes.apply_to(user);
        user.updated_at = Some(Utc::now());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> CoreResult<()> {
        self.lock()?
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))
    }

    async fn health(&self) -> CoreResult<BackendIdentity> {
        Ok(BackendIdentity {
            connection_id: 0,
            user: "memory".to_string(),
            server: "memory".to_string(),
        })
    }

    async fn routing_stats(&self) -> CoreResult<RoutingStats> {
        Ok(RoutingStats {
            current_connection: CurrentConnection {
                connection_id: 0,
                user: "memory".to_string(),
                hostname: "memory".to_string(),
                port: 0,
            },
            server_id: None,
            read_only: Some("OFF".to_string()),
            server_role: Some(RoutingStats::role_for("OFF").to_string()),
        })
    }
}
