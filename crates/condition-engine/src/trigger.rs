//! 解锁重评估触发器
//!
//! 订阅提交工作流转换事件，计算受影响的被约束对象并重算其解锁状态，
//! 将状态翻转通过 `UnlockSink` 投递给负责落实的外部协作方
//! （成就授予、测验可见性）。
//!
//! ## 触发规则
//!
//! - 定稿（作答中 → 已提交）与评分发布（已提交 → 已评分）触发重评估
//! - 同状态重存不触发，评估器一次都不会被调用
//! - 解锁本身不作为触发事件继续传播，单跳传播之外的级联由
//!   外部系统显式地把解锁再发布为事件来完成

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use course_shared::events::SubmissionEvent;
use course_shared::retry::{RetryPolicy, retry_with_policy};

use crate::error::{ConditionError, Result};
use crate::evaluator::UnlockEvaluator;
use crate::graph::ConditionGraph;
use crate::models::ObjectRef;

#[cfg(test)]
use mockall::automock;

// ---------------------------------------------------------------------------
// UnlockSink — 解锁通知接收端
// ---------------------------------------------------------------------------

/// 解锁通知接收端
///
/// 投递失败不会回滚触发它的提交转换；触发器会按重试策略重试，
/// 耗尽后记录错误并继续处理剩余对象。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UnlockSink: Send + Sync {
    /// 投递一次解锁状态变更
    async fn deliver(&self, change: UnlockChange) -> Result<()>;
}

/// 解锁状态变更
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockChange {
    pub user_id: String,
    pub course_id: i64,
    /// 状态发生翻转的被约束对象
    pub conditional: ObjectRef,
    /// true 表示解锁，false 表示重新锁定
    pub unlocked: bool,
    /// 触发本次重评估的前置对象
    pub triggered_by: ObjectRef,
}

/// 一次重评估的完整结果
///
/// `errors` 收集投递失败信息而非立即失败：一个事件可能影响多个对象，
/// 单个对象的投递失败不应阻止其余对象的评估
#[derive(Debug, Default, Serialize)]
pub struct ReevaluationOutcome {
    /// 本次重算解锁状态的对象数
    pub evaluated: usize,
    /// 发生翻转并已尝试投递的变更
    pub changes: Vec<UnlockChange>,
    /// 重试耗尽仍投递失败的错误信息
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// ReevaluationTrigger — 重评估触发器
// ---------------------------------------------------------------------------

/// 解锁重评估触发器
///
/// 解锁状态是派生数据，引擎不单独持久化；这里用内存缓存记住每个
/// (用户, 对象) 组合最近一次算出的值，用于识别翻转。首次见到的组合
/// 视为此前锁定——对象在被证明解锁之前从未以解锁状态示人。
pub struct ReevaluationTrigger {
    graph: Arc<ConditionGraph>,
    evaluator: Arc<UnlockEvaluator>,
    sink: Arc<dyn UnlockSink>,
    retry_policy: RetryPolicy,
    unlock_states: DashMap<(String, ObjectRef), bool>,
}

impl ReevaluationTrigger {
    pub fn new(
        graph: Arc<ConditionGraph>,
        evaluator: Arc<UnlockEvaluator>,
        sink: Arc<dyn UnlockSink>,
    ) -> Self {
        Self {
            graph,
            evaluator,
            sink,
            retry_policy: RetryPolicy::default(),
            unlock_states: DashMap::new(),
        }
    }

    /// 覆盖通知投递的重试策略
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// 主入口：提交工作流转换事件到达时调用
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    pub async fn handle_submission_event(
        &self,
        event: &SubmissionEvent,
    ) -> Result<ReevaluationOutcome> {
        let mut outcome = ReevaluationOutcome::default();

        if !event.triggers_reevaluation() {
            debug!(
                from = %event.from_state,
                to = %event.to_state,
                "非触发性状态变更，跳过重评估"
            );
            return Ok(outcome);
        }

        let assessment = ObjectRef::assessment(event.assessment_id);
        let dependents = self.graph.edges_from(assessment);
        if dependents.is_empty() {
            debug!(assessment = %assessment, "无对象依赖此测验");
            return Ok(outcome);
        }

        info!(
            user_id = %event.user_id,
            assessment = %assessment,
            candidate_count = dependents.len(),
            "开始解锁重评估"
        );

        // 同一对象可能有多条来自该测验的入边，按被约束对象去重
        let mut seen: HashSet<ObjectRef> = HashSet::new();
        for edge in &dependents {
            if !seen.insert(edge.conditional) {
                continue;
            }
            outcome.evaluated += 1;

            let unlocked = self
                .evaluator
                .is_unlocked(edge.conditional, &event.user_id)
                .await?;

            let key = (event.user_id.clone(), edge.conditional);
            let previous = self.unlock_states.insert(key, unlocked).unwrap_or(false);
            if previous == unlocked {
                continue;
            }

            let change = UnlockChange {
                user_id: event.user_id.clone(),
                course_id: edge.course_id,
                conditional: edge.conditional,
                unlocked,
                triggered_by: assessment,
            };
            info!(
                conditional = %change.conditional,
                unlocked,
                "解锁状态翻转"
            );
            outcome.changes.push(change.clone());

            // 投递失败不回滚提交转换：重试耗尽后记录并继续
            if let Err(e) = self.deliver_with_retry(&change).await {
                warn!(
                    conditional = %change.conditional,
                    error = %e,
                    "解锁通知投递最终失败"
                );
                outcome.errors.push(e.to_string());
            }
        }

        info!(
            evaluated = outcome.evaluated,
            changes = outcome.changes.len(),
            errors = outcome.errors.len(),
            "解锁重评估完成"
        );
        Ok(outcome)
    }

    /// 查询缓存中某 (用户, 对象) 组合最近一次算出的解锁状态
    pub fn unlock_state(&self, user_id: &str, conditional: ObjectRef) -> Option<bool> {
        self.unlock_states
            .get(&(user_id.to_string(), conditional))
            .map(|v| *v)
    }

    async fn deliver_with_retry(&self, change: &UnlockChange) -> Result<()> {
        retry_with_policy(
            &self.retry_policy,
            "unlock_notification",
            ConditionError::is_retryable,
            || self.sink.deliver(change.clone()),
        )
        .await
    }
}
