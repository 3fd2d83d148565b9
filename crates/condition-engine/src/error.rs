//! 条件引擎错误类型
//!
//! 定义写入期校验错误和系统错误。校验错误同步返回给授课端的
//! 编辑表单，以结构化错误码而非人类可读文案的形式暴露。

use thiserror::Error;
use uuid::Uuid;

use crate::models::ObjectRef;

/// 条件引擎错误类型
#[derive(Debug, Error)]
pub enum ConditionError {
    // === 条件边校验错误 ===
    #[error("前置对象与被约束对象相同: {object}")]
    SelfReference { object: ObjectRef },

    #[error("重复的条件边: conditional={conditional}, prerequisite={prerequisite}")]
    DuplicateEdge {
        conditional: ObjectRef,
        prerequisite: ObjectRef,
    },

    #[error("新增条件边会构成循环依赖: conditional={conditional}, prerequisite={prerequisite}")]
    CyclicDependency {
        conditional: ObjectRef,
        prerequisite: ObjectRef,
    },

    #[error("对象不属于课程 {expected_course}: {object} 属于课程 {actual_course}")]
    CrossCourse {
        object: ObjectRef,
        expected_course: i64,
        actual_course: i64,
    },

    #[error("课程 {course_id} 的条件边数量已达上限 {limit}")]
    EdgeLimitReached { course_id: i64, limit: usize },

    // === 查询错误 ===
    #[error("条件边不存在: {0}")]
    EdgeNotFound(Uuid),

    #[error("对象未登记课程归属: {0}")]
    UnknownObject(ObjectRef),

    // === 系统错误 ===
    #[error("解锁通知投递失败: {0}")]
    NotificationDelivery(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 条件引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, ConditionError>;

impl ConditionError {
    /// 检查是否为写入期校验错误（返回给授课端表单展示）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SelfReference { .. }
                | Self::DuplicateEdge { .. }
                | Self::CyclicDependency { .. }
                | Self::CrossCourse { .. }
                | Self::EdgeLimitReached { .. }
        )
    }

    /// 检查是否为可重试的错误
    ///
    /// 校验错误对同一输入是确定性的，重试没有意义；
    /// 只有通知投递这类下游瞬时故障值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotificationDelivery(_))
    }

    /// 获取错误码（用于表单错误展示）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SelfReference { .. } => "SELF_REFERENCE",
            Self::DuplicateEdge { .. } => "DUPLICATE_EDGE",
            Self::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            Self::CrossCourse { .. } => "CROSS_COURSE",
            Self::EdgeLimitReached { .. } => "EDGE_LIMIT_REACHED",
            Self::EdgeNotFound(_) => "EDGE_NOT_FOUND",
            Self::UnknownObject(_) => "UNKNOWN_OBJECT",
            Self::NotificationDelivery(_) => "NOTIFICATION_DELIVERY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
