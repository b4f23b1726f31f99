//! 核心模块：错误、提取器、中间件、服务 trait

pub mod error;
pub mod extract;
pub mod middleware;
pub mod service;
