//! 条件进阶图引擎
//!
//! 课程对象（成就、测验）可以被其他对象上的前置条件约束，
//! 例如「测验 A 得分不低于 60% 后才解锁成就 B」。本引擎提供：
//! - 条件边的写入期不变量校验（自引用、唯一性、无环、同课程）
//! - 按前置类型多态的满足度判定
//! - 由提交工作流转换驱动的解锁状态增量重评估

pub mod error;
pub mod evaluator;
pub mod graph;
pub mod memory;
pub mod models;
pub mod trigger;

pub use error::{ConditionError, Result};
pub use evaluator::{
    AchievementEvaluator, AchievementStore, AssessmentEvaluator, EvaluatorRegistry,
    SatisfactionEvaluator, SubmissionStore, UnlockEvaluator,
};
pub use graph::{ConditionGraph, CourseDirectory};
pub use models::{Condition, EdgeSpec, ObjectKind, ObjectRef, SubmissionRecord};
pub use trigger::{ReevaluationOutcome, ReevaluationTrigger, UnlockChange, UnlockSink};
