//! # ProxySQL 用户 CRUD 服务
//!
//! 通过 ProxySQL 访问 MySQL 的 `users` 表，提供创建、查询、列表、搜索、
//! 更新、删除接口。读写分离由代理按 SQL 类型完成，本服务只负责：
//! - 校验请求体
//! - 每个请求获取一个作用域连接并执行参数化 SQL
//! - 将结果映射为 JSON

pub mod app;
pub mod core;
pub mod infrastructure;

use std::sync::Arc;

use axum::Router;

use app::routes::create_router;
use app::user::{
    handler::AppState, memory::MemoryUserRepository, repository::MySqlUserRepository,
    repository::UserRepository, service::UserService,
};
use infrastructure::config::{Backend, Config};
use infrastructure::database::DatabaseManager;

/// 根据配置选择存储后端并组装路由
pub async fn build_app(config: &Config) -> Result<Router, sqlx::Error> {
    let repo: Arc<dyn UserRepository> = match config.database.backend {
        Backend::Mysql => {
            let db = DatabaseManager::new(&config.database);
            if config.database.init_schema {
                db.init_schema().await?;
            }
            Arc::new(MySqlUserRepository::new(db.get_pool().clone()))
        }
        Backend::Memory => Arc::new(MemoryUserRepository::new()),
    };

    Ok(app_with_repository(repo, config.database.endpoint()))
}

/// 用给定的存储构建应用，测试直接注入内存实现
pub fn app_with_repository(repo: Arc<dyn UserRepository>, proxy_endpoint: String) -> Router {
    let state = AppState {
        user_service: UserService::new(repo, proxy_endpoint),
    };
    create_router(state)
}
