//! 内存版协作方适配器
//!
//! 课程目录、提交存储、成就存储与解锁通知接收端的内存实现，
//! 供集成测试与端到端验证替代真实的外部子系统。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use course_shared::events::WorkflowState;

use crate::error::{ConditionError, Result};
use crate::evaluator::{AchievementStore, SubmissionStore};
use crate::graph::CourseDirectory;
use crate::models::{ObjectRef, SubmissionRecord};
use crate::trigger::{UnlockChange, UnlockSink};

// ---------------------------------------------------------------------------
// InMemoryCourseDirectory
// ---------------------------------------------------------------------------

/// 内存课程目录
#[derive(Debug, Default)]
pub struct InMemoryCourseDirectory {
    membership: RwLock<HashMap<ObjectRef, i64>>,
}

impl InMemoryCourseDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记对象归属的课程
    pub fn register(&self, object: ObjectRef, course_id: i64) {
        self.membership.write().insert(object, course_id);
    }
}

#[async_trait]
impl CourseDirectory for InMemoryCourseDirectory {
    async fn course_of(&self, object: ObjectRef) -> Result<Option<i64>> {
        Ok(self.membership.read().get(&object).copied())
    }
}

// ---------------------------------------------------------------------------
// InMemorySubmissionStore
// ---------------------------------------------------------------------------

/// 内存提交存储
///
/// 带查询计数器，测试用它断言「不该发生的重评估确实没有发生」
#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    submissions: RwLock<Vec<SubmissionRecord>>,
    query_count: AtomicU32,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: SubmissionRecord) {
        self.submissions.write().push(record);
    }

    /// 推进某条提交的工作流状态，可同时写入评分
    pub fn transition(&self, submission_id: i64, state: WorkflowState, grade: Option<f64>) {
        let mut guard = self.submissions.write();
        if let Some(submission) = guard.iter_mut().find(|s| s.id == submission_id) {
            submission.workflow_state = state;
            if grade.is_some() {
                submission.grade = grade;
            }
        }
    }

    /// 累计被查询的次数
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn submissions_for(
        &self,
        user_id: &str,
        assessment_id: i64,
    ) -> Result<Vec<SubmissionRecord>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .submissions
            .read()
            .iter()
            .filter(|s| s.user_id == user_id && s.assessment_id == assessment_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// InMemoryAchievementStore
// ---------------------------------------------------------------------------

/// 内存成就存储
#[derive(Debug, Default)]
pub struct InMemoryAchievementStore {
    awarded: RwLock<HashSet<(String, i64)>>,
}

impl InMemoryAchievementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为用户记录一个已获得的成就
    pub fn award(&self, user_id: &str, achievement_id: i64) {
        self.awarded
            .write()
            .insert((user_id.to_string(), achievement_id));
    }
}

#[async_trait]
impl AchievementStore for InMemoryAchievementStore {
    async fn has_achievement(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        Ok(self
            .awarded
            .read()
            .contains(&(user_id.to_string(), achievement_id)))
    }
}

// ---------------------------------------------------------------------------
// CollectingSink
// ---------------------------------------------------------------------------

/// 记录式解锁通知接收端
///
/// 收集全部成功投递的变更；可注入若干次失败以驱动重试路径
#[derive(Debug, Default)]
pub struct CollectingSink {
    delivered: RwLock<Vec<UnlockChange>>,
    fail_remaining: AtomicU32,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的 `times` 次投递失败
    pub fn fail_next(&self, times: u32) {
        self.fail_remaining.store(times, Ordering::SeqCst);
    }

    /// 已成功投递的变更快照
    pub fn delivered(&self) -> Vec<UnlockChange> {
        self.delivered.read().clone()
    }
}

#[async_trait]
impl UnlockSink for CollectingSink {
    async fn deliver(&self, change: UnlockChange) -> Result<()> {
        if self.fail_remaining.load(Ordering::SeqCst) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(ConditionError::NotificationDelivery(
                "注入的投递失败".to_string(),
            ));
        }
        self.delivered.write().push(change);
        Ok(())
    }
}
