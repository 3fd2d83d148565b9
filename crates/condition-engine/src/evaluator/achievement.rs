//! 成就前置条件评估器

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::evaluator::SatisfactionEvaluator;
use crate::models::Condition;

#[cfg(test)]
use mockall::automock;

/// 成就获得记录读取接口
///
/// 由外部成就子系统实现，引擎只读取
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AchievementStore: Send + Sync {
    /// 用户是否已获得指定成就
    async fn has_achievement(&self, user_id: &str, achievement_id: i64) -> Result<bool>;
}

/// 成就前置条件评估器
///
/// 满足当且仅当用户已获得前置成就。阈值对成就前置没有语义，忽略。
pub struct AchievementEvaluator {
    achievements: Arc<dyn AchievementStore>,
}

impl AchievementEvaluator {
    pub fn new(achievements: Arc<dyn AchievementStore>) -> Self {
        Self { achievements }
    }
}

#[async_trait]
impl SatisfactionEvaluator for AchievementEvaluator {
    async fn is_satisfied(&self, condition: &Condition, user_id: &str) -> Result<bool> {
        self.achievements
            .has_achievement(user_id, condition.prerequisite.id)
            .await
    }
}
