//! 核心服务层模块

/// 服务层 trait
pub trait Service: Send + Sync {
    /// 服务名称，用于日志与 `/` 信息端点
    fn name(&self) -> &'static str;
}
