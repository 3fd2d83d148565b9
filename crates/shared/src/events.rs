//! 提交生命周期事件模型
//!
//! 定义提交工作流状态与状态转换事件的统一信封格式。提交子系统在每次
//! 工作流转换时发出 `SubmissionEvent`，条件进阶引擎据此决定是否对受影响
//! 的用户做解锁重评估。"仅在真实转换时触发、同状态重存不触发"这一规则
//! 以显式方法的形式建模在事件上，而不是埋在保存钩子的前后对比里。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// WorkflowState — 提交工作流状态
// ---------------------------------------------------------------------------

/// 提交工作流状态
///
/// 提交从作答中开始，定稿后进入已提交，评分发布后进入已评分。
/// 引擎只消费这三个状态，不拥有状态机本身。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// 作答中 - 学生仍在编辑，不计入任何前置条件
    Attempting,
    /// 已提交 - 学生已定稿，等待评分
    Submitted,
    /// 已评分 - 评分已发布，带最终得分
    Graded,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Attempting => "attempting",
            Self::Submitted => "submitted",
            Self::Graded => "graded",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// SubmissionEvent — 提交状态转换事件
// ---------------------------------------------------------------------------

/// 提交状态转换事件
///
/// 所有进入引擎的提交转换都包装在此信封中：
/// - `event_id`（UUID v7）时间有序，可作幂等性校验键
/// - `trace_id` 串联分布式追踪上下文
/// - `grade`/`max_grade` 仅在评分发布事件中携带
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    /// 事件唯一标识（UUID v7）
    pub event_id: String,
    /// 提交所属用户
    pub user_id: String,
    /// 提交所属课程
    pub course_id: i64,
    /// 提交对应的测验
    pub assessment_id: i64,
    /// 转换前状态
    pub from_state: WorkflowState,
    /// 转换后状态
    pub to_state: WorkflowState,
    /// 得分（已评分时存在）
    pub grade: Option<f64>,
    /// 满分（已评分时存在）
    pub max_grade: Option<f64>,
    /// 事件发生时间
    pub timestamp: DateTime<Utc>,
    /// 事件来源系统
    pub source: String,
    /// 追踪 ID
    pub trace_id: Option<String>,
}

impl SubmissionEvent {
    /// 构建新事件，自动生成 UUID v7 作为 event_id 并记录当前时间
    pub fn new(
        user_id: impl Into<String>,
        course_id: i64,
        assessment_id: i64,
        from_state: WorkflowState,
        to_state: WorkflowState,
        source: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            course_id,
            assessment_id,
            from_state,
            to_state,
            grade: None,
            max_grade: None,
            timestamp: Utc::now(),
            source: source.into(),
            trace_id: None,
        }
    }

    /// 附带评分信息
    pub fn with_grade(mut self, grade: f64, max_grade: f64) -> Self {
        self.grade = Some(grade);
        self.max_grade = Some(max_grade);
        self
    }

    /// 附带追踪 ID
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// 是否为真实的状态转换（同状态重存不算）
    pub fn is_state_transition(&self) -> bool {
        self.from_state != self.to_state
    }

    /// 是否触发解锁重评估
    ///
    /// 仅定稿（作答中 → 已提交）与评分发布（已提交 → 已评分）触发；
    /// 同状态重存与作答期间的普通保存不触发
    pub fn triggers_reevaluation(&self) -> bool {
        self.is_state_transition()
            && matches!(
                self.to_state,
                WorkflowState::Submitted | WorkflowState::Graded
            )
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
