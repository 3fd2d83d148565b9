//! 端到端测试：从配置加载到解锁通知的完整链路
//!
//! 模拟授课端编辑条件图、学生提交测验、评分发布的全过程，
//! 验证解锁通知按预期到达外部协作方。

use std::sync::Arc;

use condition_engine::memory::{
    CollectingSink, InMemoryAchievementStore, InMemoryCourseDirectory, InMemorySubmissionStore,
};
use condition_engine::{
    AchievementEvaluator, AssessmentEvaluator, ConditionError, ConditionGraph, EdgeSpec,
    EvaluatorRegistry, ObjectRef, ReevaluationTrigger, SubmissionRecord, UnlockEvaluator,
};
use course_shared::config::AppConfig;
use course_shared::events::{SubmissionEvent, WorkflowState};

const COURSE: i64 = 1;
const ASSESSMENT_X: i64 = 10;
const ASSESSMENT_Z: i64 = 20;
const ACHIEVEMENT_Y: i64 = 30;

struct System {
    directory: Arc<InMemoryCourseDirectory>,
    graph: Arc<ConditionGraph>,
    submissions: Arc<InMemorySubmissionStore>,
    sink: Arc<CollectingSink>,
    trigger: ReevaluationTrigger,
}

/// 按生产装配方式从配置搭建整个系统
fn build_system() -> System {
    let config = AppConfig::load("condition-graph-engine").expect("配置加载失败");

    let directory = Arc::new(InMemoryCourseDirectory::new());
    directory.register(ObjectRef::assessment(ASSESSMENT_X), COURSE);
    directory.register(ObjectRef::assessment(ASSESSMENT_Z), COURSE);
    directory.register(ObjectRef::achievement(ACHIEVEMENT_Y), COURSE);

    let graph = Arc::new(
        ConditionGraph::new(directory.clone())
            .with_max_edges(config.engine.max_edges_per_course),
    );
    let submissions = Arc::new(InMemorySubmissionStore::new());
    let achievements = Arc::new(InMemoryAchievementStore::new());
    let sink = Arc::new(CollectingSink::new());

    let registry = Arc::new(EvaluatorRegistry::new(
        Arc::new(AssessmentEvaluator::new(submissions.clone())),
        Arc::new(AchievementEvaluator::new(achievements)),
    ));
    let evaluator = Arc::new(UnlockEvaluator::new(graph.clone(), registry));
    let trigger = ReevaluationTrigger::new(graph.clone(), evaluator, sink.clone())
        .with_retry_policy(course_shared::retry::RetryPolicy {
            max_retries: config.retry.max_retries,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
            multiplier: config.retry.multiplier,
        });

    System {
        directory,
        graph,
        submissions,
        sink,
        trigger,
    }
}

fn submission(id: i64, assessment_id: i64, state: WorkflowState) -> SubmissionRecord {
    SubmissionRecord {
        id,
        assessment_id,
        user_id: "student-001".to_string(),
        workflow_state: state,
        grade: None,
        max_grade: 10.0,
    }
}

fn event(assessment_id: i64, from: WorkflowState, to: WorkflowState) -> SubmissionEvent {
    SubmissionEvent::new(
        "student-001",
        COURSE,
        assessment_id,
        from,
        to,
        "submission-service",
    )
}

#[tokio::test]
async fn full_progression_flow() {
    let system = build_system();

    // 授课端配置：测验 X 解锁成就 Y（任意完成）；测验 X 得分 ≥60% 解锁测验 Z
    system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::achievement(ACHIEVEMENT_Y),
            ObjectRef::assessment(ASSESSMENT_X),
        ))
        .await
        .unwrap();
    system
        .graph
        .add_edge(
            EdgeSpec::new(
                COURSE,
                ObjectRef::assessment(ASSESSMENT_Z),
                ObjectRef::assessment(ASSESSMENT_X),
            )
            .with_threshold(60.0),
        )
        .await
        .unwrap();

    // 学生开始作答：普通保存不触发任何评估
    system
        .submissions
        .insert(submission(1, ASSESSMENT_X, WorkflowState::Attempting));
    let outcome = system
        .trigger
        .handle_submission_event(&event(
            ASSESSMENT_X,
            WorkflowState::Attempting,
            WorkflowState::Attempting,
        ))
        .await
        .unwrap();
    assert_eq!(outcome.evaluated, 0);
    assert_eq!(system.submissions.query_count(), 0);

    // 定稿：成就 Y 解锁，测验 Z 仍锁定（阈值前置需要评分）
    system
        .submissions
        .transition(1, WorkflowState::Submitted, None);
    let outcome = system
        .trigger
        .handle_submission_event(&event(
            ASSESSMENT_X,
            WorkflowState::Attempting,
            WorkflowState::Submitted,
        ))
        .await
        .unwrap();
    assert_eq!(outcome.evaluated, 2);
    assert_eq!(outcome.changes.len(), 1);

    let delivered = system.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].unlocked);
    assert_eq!(
        delivered[0].conditional,
        ObjectRef::achievement(ACHIEVEMENT_Y)
    );

    // 第一次评分 5/10：不达标，无新通知
    system
        .submissions
        .transition(1, WorkflowState::Graded, Some(5.0));
    let outcome = system
        .trigger
        .handle_submission_event(
            &event(
                ASSESSMENT_X,
                WorkflowState::Submitted,
                WorkflowState::Graded,
            )
            .with_grade(5.0, 10.0),
        )
        .await
        .unwrap();
    assert!(outcome.changes.is_empty());
    assert_eq!(system.sink.delivered().len(), 1);

    // 再次作答并评为 6/10：恰好达到阈值，测验 Z 解锁
    system
        .submissions
        .insert(submission(2, ASSESSMENT_X, WorkflowState::Submitted));
    system
        .submissions
        .transition(2, WorkflowState::Graded, Some(6.0));
    let outcome = system
        .trigger
        .handle_submission_event(
            &event(
                ASSESSMENT_X,
                WorkflowState::Submitted,
                WorkflowState::Graded,
            )
            .with_grade(6.0, 10.0),
        )
        .await
        .unwrap();
    assert_eq!(outcome.changes.len(), 1);

    let delivered = system.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(
        delivered[1].conditional,
        ObjectRef::assessment(ASSESSMENT_Z)
    );
    assert_eq!(
        delivered[1].triggered_by,
        ObjectRef::assessment(ASSESSMENT_X)
    );
}

#[tokio::test]
async fn authoring_errors_surface_as_structured_codes() {
    let system = build_system();
    system.directory.register(ObjectRef::assessment(99), 2);

    // 自引用
    let err = system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::assessment(ASSESSMENT_X),
            ObjectRef::assessment(ASSESSMENT_X),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "SELF_REFERENCE");
    assert!(err.is_validation());

    // 跨课程
    let err = system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::achievement(ACHIEVEMENT_Y),
            ObjectRef::assessment(99),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CROSS_COURSE");

    // 互为反向的环
    system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::assessment(ASSESSMENT_Z),
            ObjectRef::assessment(ASSESSMENT_X),
        ))
        .await
        .unwrap();
    let err = system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::assessment(ASSESSMENT_X),
            ObjectRef::assessment(ASSESSMENT_Z),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ConditionError::CyclicDependency { .. }));
    assert_eq!(err.error_code(), "CYCLIC_DEPENDENCY");
    assert_eq!(system.graph.course_edge_count(COURSE), 1);
}

#[tokio::test]
async fn notification_outage_does_not_block_submission_flow() {
    let system = build_system();
    system
        .graph
        .add_edge(EdgeSpec::new(
            COURSE,
            ObjectRef::achievement(ACHIEVEMENT_Y),
            ObjectRef::assessment(ASSESSMENT_X),
        ))
        .await
        .unwrap();
    system
        .submissions
        .insert(submission(1, ASSESSMENT_X, WorkflowState::Submitted));

    // 下游通知端持续不可用
    system.sink.fail_next(100);
    let outcome = system
        .trigger
        .handle_submission_event(&event(
            ASSESSMENT_X,
            WorkflowState::Attempting,
            WorkflowState::Submitted,
        ))
        .await
        .unwrap();

    // 提交转换不受影响：事件处理成功，失败只记录在结果里
    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
}
