//! 条件进阶领域模型

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use course_shared::events::WorkflowState;

/// 课程对象类型
///
/// 封闭集合：新增类型时必须同步提供对应的满足度评估器，
/// `EvaluatorRegistry` 的穷尽匹配会在编译期暴露缺失的实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// 测验 - 可被约束，也可作为前置（按提交/得分判定）
    Assessment,
    /// 成就 - 可被约束，也可作为前置（按是否已获得判定）
    Achievement,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assessment => "assessment",
            Self::Achievement => "achievement",
        };
        write!(f, "{s}")
    }
}

/// 课程对象引用
///
/// 对象身份是 (kind, id) 二元组；不同类型的对象即使数值 ID 相同
/// 也互不冲突，图中永远不会被混同为同一节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: i64,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn assessment(id: i64) -> Self {
        Self::new(ObjectKind::Assessment, id)
    }

    pub fn achievement(id: i64) -> Self {
        Self::new(ObjectKind::Achievement, id)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// 条件边：conditional 依赖 prerequisite
///
/// 方向约定为「前置 → 被约束对象」；同一课程内的全部条件边
/// 构成一张必须保持无环的有向图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: Uuid,
    /// 两个端点必须同属此课程
    pub course_id: i64,
    /// 被约束对象
    pub conditional: ObjectRef,
    /// 前置对象，kind 同时是满足度评估器的选择器
    pub prerequisite: ObjectRef,
    /// 最低得分百分比；None 表示任意完成即满足
    pub threshold: Option<f64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Condition {
    /// 由新增请求构建条件边，自动分配边 ID 并记录时间
    pub fn from_spec(spec: &EdgeSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id: spec.course_id,
            conditional: spec.conditional,
            prerequisite: spec.prerequisite,
            threshold: spec.threshold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// 新增条件边请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub course_id: i64,
    pub conditional: ObjectRef,
    pub prerequisite: ObjectRef,
    pub threshold: Option<f64>,
}

impl EdgeSpec {
    pub fn new(course_id: i64, conditional: ObjectRef, prerequisite: ObjectRef) -> Self {
        Self {
            course_id,
            conditional,
            prerequisite,
            threshold: None,
        }
    }

    /// 附带最低得分百分比
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// 提交记录只读投影
///
/// 提交实体由外部提交子系统拥有，引擎只读取判定所需的字段，
/// 从不修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub assessment_id: i64,
    pub user_id: String,
    pub workflow_state: WorkflowState,
    pub grade: Option<f64>,
    pub max_grade: f64,
}

impl SubmissionRecord {
    /// 得分百分比
    ///
    /// 未评分或满分非正时返回 None
    pub fn percentage(&self) -> Option<f64> {
        if self.max_grade <= 0.0 {
            return None;
        }
        self.grade.map(|g| g / self.max_grade * 100.0)
    }
}
