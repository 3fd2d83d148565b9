//! 满足度评估
//!
//! 每种前置类型对应一个 `SatisfactionEvaluator` 实现，注册表在构造时
//! 强制覆盖全部类型——缺失的评估器在编译期就会暴露，而不是在求值时
//! 才以运行时错误的形式出现。

mod achievement;
mod assessment;

pub use achievement::{AchievementEvaluator, AchievementStore};
pub use assessment::{AssessmentEvaluator, SubmissionStore};

#[cfg(test)]
pub(crate) use assessment::MockSubmissionStore;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::graph::ConditionGraph;
use crate::models::{Condition, ObjectKind, ObjectRef};

// ---------------------------------------------------------------------------
// SatisfactionEvaluator — 单条条件边的满足度判定
// ---------------------------------------------------------------------------

/// 单条条件边的满足度判定
///
/// 实现按前置类型多态：assessment 前置读取提交历史，
/// achievement 前置读取成就获得记录
#[async_trait]
pub trait SatisfactionEvaluator: Send + Sync {
    /// 判定条件边对指定用户是否已满足
    async fn is_satisfied(&self, condition: &Condition, user_id: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// EvaluatorRegistry — 前置类型 → 评估器注册表
// ---------------------------------------------------------------------------

/// 前置类型 → 评估器注册表
///
/// 构造函数要求每种 `ObjectKind` 各提供一个评估器；
/// 新增类型时 `evaluator_for` 的穷尽匹配无法编译通过，
/// 从根上杜绝「求值时才发现类型未注册」
pub struct EvaluatorRegistry {
    assessment: Arc<dyn SatisfactionEvaluator>,
    achievement: Arc<dyn SatisfactionEvaluator>,
}

impl EvaluatorRegistry {
    pub fn new(
        assessment: Arc<dyn SatisfactionEvaluator>,
        achievement: Arc<dyn SatisfactionEvaluator>,
    ) -> Self {
        Self {
            assessment,
            achievement,
        }
    }

    /// 按前置类型取评估器
    pub fn evaluator_for(&self, kind: ObjectKind) -> &dyn SatisfactionEvaluator {
        match kind {
            ObjectKind::Assessment => self.assessment.as_ref(),
            ObjectKind::Achievement => self.achievement.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// UnlockEvaluator — 解锁状态求值
// ---------------------------------------------------------------------------

/// 解锁状态求值器
///
/// 对象的解锁状态是其全部入边满足度的合取：任一前置未满足即锁定，
/// 没有任何入边时无条件解锁。求值只读取图与外部数据，可对不同用户
/// 并发执行。
pub struct UnlockEvaluator {
    graph: Arc<ConditionGraph>,
    registry: Arc<EvaluatorRegistry>,
}

impl UnlockEvaluator {
    pub fn new(graph: Arc<ConditionGraph>, registry: Arc<EvaluatorRegistry>) -> Self {
        Self { graph, registry }
    }

    /// 判定对象对用户是否解锁
    #[instrument(skip(self))]
    pub async fn is_unlocked(&self, conditional: ObjectRef, user_id: &str) -> Result<bool> {
        let edges = self.graph.edges_into(conditional);
        for edge in &edges {
            let evaluator = self.registry.evaluator_for(edge.prerequisite.kind);
            if !evaluator.is_satisfied(edge, user_id).await? {
                debug!(
                    conditional = %conditional,
                    prerequisite = %edge.prerequisite,
                    user_id,
                    "前置条件未满足"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
