//! 用户资源：模型、更新语句构建、存储、服务、处理器

pub mod handler;
pub mod memory;
pub mod model;
pub mod repository;
pub mod service;
pub mod update;
