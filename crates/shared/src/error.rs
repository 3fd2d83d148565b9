//! 统一错误处理模块
//!
//! 定义基础设施层共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum CourseError {
    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 序列化错误 ====================
    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== 投递错误 ====================
    #[error("事件投递失败: {0}")]
    Delivery(String),

    // ==================== 系统错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 共享库 Result 类型别名
pub type Result<T> = std::result::Result<T, CourseError>;

impl CourseError {
    /// 检查是否为可重试的错误
    ///
    /// 只有投递类瞬时故障值得重试；配置与序列化错误对同一输入是确定性的
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}
