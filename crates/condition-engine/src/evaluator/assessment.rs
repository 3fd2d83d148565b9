//! 测验前置条件评估器
//!
//! 实现「必须完成测验 X / 必须在测验 X 得到不低于 N% 的成绩」的判定。

use std::sync::Arc;

use async_trait::async_trait;

use course_shared::events::WorkflowState;

use crate::error::Result;
use crate::evaluator::SatisfactionEvaluator;
use crate::models::{Condition, SubmissionRecord};

#[cfg(test)]
use mockall::automock;

/// 浮点得分比较容差
///
/// 6/10 对 60% 阈值这类恰好落在边界上的得分必须判定通过，
/// 不能因浮点舍入而失败
const GRADE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// SubmissionStore — 提交记录读取接口
// ---------------------------------------------------------------------------

/// 提交记录读取接口
///
/// 由外部提交子系统实现。引擎只读取，从不修改提交。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// 用户在某测验下的全部提交
    ///
    /// 测验允许多次作答，判定纳入全部历史提交而非仅最近一次
    async fn submissions_for(
        &self,
        user_id: &str,
        assessment_id: i64,
    ) -> Result<Vec<SubmissionRecord>>;
}

// ---------------------------------------------------------------------------
// AssessmentEvaluator — 测验前置条件评估器
// ---------------------------------------------------------------------------

/// 测验前置条件评估器
///
/// - 无阈值：任意一次提交进入已提交或已评分即满足，作答中不算
/// - 有阈值：必须存在一次已评分提交，且得分百分比不低于阈值；
///   已提交未评分的提交即使将来可能达标也不满足
pub struct AssessmentEvaluator {
    submissions: Arc<dyn SubmissionStore>,
}

impl AssessmentEvaluator {
    pub fn new(submissions: Arc<dyn SubmissionStore>) -> Self {
        Self { submissions }
    }
}

#[async_trait]
impl SatisfactionEvaluator for AssessmentEvaluator {
    async fn is_satisfied(&self, condition: &Condition, user_id: &str) -> Result<bool> {
        let submissions = self
            .submissions
            .submissions_for(user_id, condition.prerequisite.id)
            .await?;

        let satisfied = match condition.threshold {
            None => submissions.iter().any(|s| {
                matches!(
                    s.workflow_state,
                    WorkflowState::Submitted | WorkflowState::Graded
                )
            }),
            Some(threshold) => submissions.iter().any(|s| {
                s.workflow_state == WorkflowState::Graded
                    && s.percentage()
                        .is_some_and(|p| p + GRADE_EPSILON >= threshold)
            }),
        };
        Ok(satisfied)
    }
}
