//! 数据库基础设施
//!
//! 连接的是 ProxySQL 而不是 MySQL 本身；读写分离完全由代理负责。

use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions},
    Error,
};
use tracing::info;

use super::config::DatabaseConfig;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    email VARCHAR(150) UNIQUE NOT NULL,
    age INT NULL,
    created_at TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6),
    updated_at TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6) ON UPDATE CURRENT_TIMESTAMP(6)
)
"#;

pub struct DatabaseManager {
    pool: MySqlPool,
}

impl DatabaseManager {
    /// 惰性建立连接池：数据库暂时不可达时服务仍可启动，由 `/health` 报告 503
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy_with(options);

        info!(
            "Database pool configured for ProxySQL at {} (db: {}, user: {})",
            config.endpoint(),
            config.name,
            config.user
        );

        Self { pool }
    }

    /// 创建 users 表
    pub async fn init_schema(&self) -> Result<(), Error> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        info!("Database and table initialized successfully");
        Ok(())
    }

    pub fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }
}
