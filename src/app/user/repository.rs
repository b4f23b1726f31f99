//! 用户数据访问层
//!
//! 每个操作从连接池获取一个连接，`PoolConnection` 在离开作用域时归还，
//! 无论成功、出错还是提前返回。读写分离由 ProxySQL 按 SQL 类型完成。

use async_trait::async_trait;
use sqlx::{mysql::MySqlPool, MySqlConnection};
use tracing::{debug, info, instrument};

use super::model::{BackendIdentity, CreateUserRequest, CurrentConnection, RoutingStats, User};
use super::update::{build_update, UserChanges};
use crate::core::error::{CoreError, CoreResult};

pub const USER_NOT_FOUND: &str = "User not found";

const SELECT_USER: &str = "SELECT id, name, email, age, created_at, updated_at FROM users";

/// 存储接口：MySQL 实现用于生产，内存实现用于测试和本地演示
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &CreateUserRequest) -> CoreResult<User>;

    async fn get(&self, id: i64) -> CoreResult<Option<User>>;

    /// 按创建时间倒序分页
    async fn list(&self, skip: u32, limit: u32) -> CoreResult<Vec<User>>;

    /// name 或 email 包含 `query` 的记录，按 id 排序
    async fn search(&self, query: &str) -> CoreResult<Vec<User>>;

    /// 先检查存在性，再拒绝空变更
    async fn update(&self, id: i64, changes: &UserChanges) -> CoreResult<User>;

    async fn delete(&self, id: i64) -> CoreResult<()>;

    async fn health(&self) -> CoreResult<BackendIdentity>;

    async fn routing_stats(&self) -> CoreResult<RoutingStats>;
}

/// 转义 LIKE 通配符，让搜索词按字面匹配
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone)]
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(conn: &mut MySqlConnection, id: i64) -> CoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }

    async fn exists(conn: &mut MySqlConnection, id: i64) -> CoreResult<bool> {
        let row = sqlx::query("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: &CreateUserRequest) -> CoreResult<User> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("INSERT INTO users (name, email, age) VALUES (?, ?, ?)")
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.age)
            .execute(&mut *conn)
            .await?;
        let id = i64::try_from(result.last_insert_id())
            .map_err(|_| CoreError::Internal("insert id out of range".to_string()))?;

        info!("Created user with ID: {} (write routed to primary)", id);

        Self::fetch_by_id(&mut conn, id).await?.ok_or_else(|| {
            CoreError::Internal(format!("created user {} could not be read back", id))
        })
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> CoreResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    #[instrument(skip(self))]
    async fn list(&self, skip: u32, limit: u32) -> CoreResult<Vec<User>> {
        let mut conn = self.pool.acquire().await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_USER
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *conn)
        .await?;

        debug!("Fetched {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> CoreResult<Vec<User>> {
        let mut conn = self.pool.acquire().await?;
        let pattern = escape_like(query);

        let users = sqlx::query_as::<_, User>(&format!(
            "{} WHERE name LIKE ? OR email LIKE ? ORDER BY id",
            SELECT_USER
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&mut *conn)
        .await?;

        info!("Found {} users matching query: {}", users.len(), query);
        Ok(users)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: i64, changes: &UserChanges) -> CoreResult<User> {
        let mut conn = self.pool.acquire().await?;

        if !Self::exists(&mut conn, id).await? {
            return Err(CoreError::not_found(USER_NOT_FOUND));
        }

        let mut statement = build_update(id, changes)?;
        statement.build().execute(&mut *conn).await?;

        info!("Updated user {} (write routed to primary)", id);

        Self::fetch_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> CoreResult<()> {
        let mut conn = self.pool.acquire().await?;

        if !Self::exists(&mut conn, id).await? {
            return Err(CoreError::not_found(USER_NOT_FOUND));
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        info!("Deleted user {} (write routed to primary)", id);
        Ok(())
    }

    async fn health(&self) -> CoreResult<BackendIdentity> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query("SELECT 1").execute(&mut *conn).await?;

        let (connection_id, user, server): (u64, String, String) =
            sqlx::query_as("SELECT CONNECTION_ID(), USER(), @@hostname")
                .fetch_one(&mut *conn)
                .await?;

        Ok(BackendIdentity {
            connection_id,
            user,
            server,
        })
    }

    async fn routing_stats(&self) -> CoreResult<RoutingStats> {
        let mut conn = self.pool.acquire().await?;

        let (connection_id, user, hostname, port): (u64, String, String, i64) = sqlx::query_as(
            "SELECT CONNECTION_ID(), USER(), @@hostname, CAST(@@port AS SIGNED)",
        )
        .fetch_one(&mut *conn)
        .await?;

        let server_id: Option<(String, String)> = sqlx::query_as("SHOW VARIABLES LIKE 'server_id'")
            .fetch_optional(&mut *conn)
            .await?;
        let read_only: Option<(String, String)> = sqlx::query_as("SHOW VARIABLES LIKE 'read_only'")
            .fetch_optional(&mut *conn)
            .await?;

        let read_only = read_only.map(|(_, value)| value);
        let server_role = read_only
            .as_deref()
            .map(|value| RoutingStats::role_for(value).to_string());

        Ok(RoutingStats {
            current_connection: CurrentConnection {
                connection_id,
                user,
                hostname,
                port,
            },
            server_id: server_id.map(|(_, value)| value),
            read_only,
            server_role,
        })
    }
}
