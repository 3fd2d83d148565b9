//! 条件图存储
//!
//! 以「边集合 + 查询索引」的形式维护各课程的条件依赖图。
//! 写入路径在单个写锁内完成校验与插入，保证两条各自无环的并发新边
//! 不会在双双提交后合成一个环；读取路径在读锁内整体拷贝，
//! 返回的始终是一致的图快照。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ConditionError, Result};
use crate::graph::validator;
use crate::models::{Condition, EdgeSpec, ObjectRef};

/// 默认单课程条件边数量上限，与 EngineConfig 的默认值一致
const DEFAULT_MAX_EDGES_PER_COURSE: usize = 256;

// ---------------------------------------------------------------------------
// CourseDirectory — 课程归属目录
// ---------------------------------------------------------------------------

/// 课程归属目录
///
/// 对象 → 课程的映射由外部领域维护，图存储只读取。对象在其生命周期内
/// 不会更换课程，因此目录查询可以在图锁之外完成。
#[async_trait]
pub trait CourseDirectory: Send + Sync {
    /// 查询对象归属的课程；未知对象返回 None
    async fn course_of(&self, object: ObjectRef) -> Result<Option<i64>>;
}

// ---------------------------------------------------------------------------
// GraphInner — 内部状态
// ---------------------------------------------------------------------------

/// 图内部状态：边主存储 + 三个查询索引
#[derive(Debug, Default)]
struct GraphInner {
    edges: HashMap<Uuid, Condition>,
    /// conditional → 入边（该对象的全部前置条件）
    by_conditional: HashMap<ObjectRef, Vec<Uuid>>,
    /// prerequisite → 出边（直接依赖该对象的全部被约束对象）
    by_prerequisite: HashMap<ObjectRef, Vec<Uuid>>,
    /// course → 课程内全部边，循环检测的搜索范围
    by_course: HashMap<i64, HashSet<Uuid>>,
}

impl GraphInner {
    fn course_edges(&self, course_id: i64) -> Vec<&Condition> {
        self.by_course
            .get(&course_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    fn insert(&mut self, condition: Condition) {
        let id = condition.id;
        self.by_conditional
            .entry(condition.conditional)
            .or_default()
            .push(id);
        self.by_prerequisite
            .entry(condition.prerequisite)
            .or_default()
            .push(id);
        self.by_course
            .entry(condition.course_id)
            .or_default()
            .insert(id);
        self.edges.insert(id, condition);
    }

    /// 摘除一条边并同步清理全部索引
    fn detach(&mut self, id: Uuid) -> Option<Condition> {
        let condition = self.edges.remove(&id)?;

        if let Some(ids) = self.by_conditional.get_mut(&condition.conditional) {
            ids.retain(|e| *e != id);
            if ids.is_empty() {
                self.by_conditional.remove(&condition.conditional);
            }
        }
        if let Some(ids) = self.by_prerequisite.get_mut(&condition.prerequisite) {
            ids.retain(|e| *e != id);
            if ids.is_empty() {
                self.by_prerequisite.remove(&condition.prerequisite);
            }
        }
        if let Some(ids) = self.by_course.get_mut(&condition.course_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_course.remove(&condition.course_id);
            }
        }

        Some(condition)
    }
}

// ---------------------------------------------------------------------------
// ConditionGraph — 条件图存储
// ---------------------------------------------------------------------------

/// 条件图存储
///
/// 持有各课程的条件边并负责写入期不变量。满足度评估与解锁重评估
/// 只通过 `edges_into` / `edges_from` 读取，不会修改图。
pub struct ConditionGraph {
    directory: Arc<dyn CourseDirectory>,
    max_edges_per_course: usize,
    inner: RwLock<GraphInner>,
}

impl ConditionGraph {
    pub fn new(directory: Arc<dyn CourseDirectory>) -> Self {
        Self {
            directory,
            max_edges_per_course: DEFAULT_MAX_EDGES_PER_COURSE,
            inner: RwLock::new(GraphInner::default()),
        }
    }

    /// 覆盖单课程条件边数量上限
    pub fn with_max_edges(mut self, max_edges_per_course: usize) -> Self {
        self.max_edges_per_course = max_edges_per_course;
        self
    }

    /// 新增条件边
    ///
    /// 先经课程目录确认两个端点同属请求课程，再在写锁内对
    /// 「当前边集合 + 候选边」执行完整校验并插入。任一不变量被违反时
    /// 返回对应错误且图保持不变。
    #[instrument(skip(self), fields(course_id = spec.course_id))]
    pub async fn add_edge(&self, spec: EdgeSpec) -> Result<Uuid> {
        self.require_in_course(spec.conditional, spec.course_id)
            .await?;
        self.require_in_course(spec.prerequisite, spec.course_id)
            .await?;

        let mut inner = self.inner.write();
        {
            let course_edges = inner.course_edges(spec.course_id);
            if course_edges.len() >= self.max_edges_per_course {
                return Err(ConditionError::EdgeLimitReached {
                    course_id: spec.course_id,
                    limit: self.max_edges_per_course,
                });
            }
            validator::validate_candidate(&course_edges, spec.conditional, spec.prerequisite)?;
        }

        let condition = Condition::from_spec(&spec);
        let id = condition.id;
        inner.insert(condition);

        info!(
            course_id = spec.course_id,
            conditional = %spec.conditional,
            prerequisite = %spec.prerequisite,
            edge_id = %id,
            "条件边已创建"
        );
        Ok(id)
    }

    /// 修改条件边的前置对象或阈值
    ///
    /// 视同删除后重新插入：对修改后的边完整重跑全部写入期校验
    #[instrument(skip(self))]
    pub async fn update_edge(
        &self,
        edge_id: Uuid,
        prerequisite: ObjectRef,
        threshold: Option<f64>,
    ) -> Result<()> {
        // 目录查询在锁外完成；归属关系在编辑期间不变
        let (course_id, conditional) = {
            let inner = self.inner.read();
            let edge = inner
                .edges
                .get(&edge_id)
                .ok_or(ConditionError::EdgeNotFound(edge_id))?;
            (edge.course_id, edge.conditional)
        };
        self.require_in_course(prerequisite, course_id).await?;

        let mut inner = self.inner.write();
        // 锁外等待期间边可能已被并发删除，重新确认
        if !inner.edges.contains_key(&edge_id) {
            return Err(ConditionError::EdgeNotFound(edge_id));
        }
        {
            let course_edges: Vec<&Condition> = inner
                .course_edges(course_id)
                .into_iter()
                .filter(|e| e.id != edge_id)
                .collect();
            validator::validate_candidate(&course_edges, conditional, prerequisite)?;
        }

        let mut edge = inner
            .detach(edge_id)
            .ok_or_else(|| ConditionError::Internal("边在写锁内消失".to_string()))?;
        edge.prerequisite = prerequisite;
        edge.threshold = threshold;
        edge.updated_at = Utc::now();
        inner.insert(edge);

        info!(edge_id = %edge_id, prerequisite = %prerequisite, "条件边已更新");
        Ok(())
    }

    /// 删除条件边
    ///
    /// 删除不会产生自引用、重复或环，无需重校验
    pub fn remove_edge(&self, edge_id: Uuid) -> Option<Condition> {
        let removed = self.inner.write().detach(edge_id);
        if let Some(ref condition) = removed {
            info!(
                edge_id = %edge_id,
                conditional = %condition.conditional,
                "条件边已删除"
            );
        }
        removed
    }

    /// 级联删除：移除以该对象为任一端点的全部条件边
    ///
    /// 在被约束对象或前置对象本身被外部领域删除时调用
    pub fn remove_edges_for(&self, object: ObjectRef) -> Vec<Condition> {
        let mut inner = self.inner.write();
        let mut ids: Vec<Uuid> = inner
            .by_conditional
            .get(&object)
            .cloned()
            .unwrap_or_default();
        ids.extend(
            inner
                .by_prerequisite
                .get(&object)
                .cloned()
                .unwrap_or_default(),
        );
        ids.sort();
        ids.dedup();

        let removed: Vec<Condition> = ids.into_iter().filter_map(|id| inner.detach(id)).collect();
        if !removed.is_empty() {
            info!(object = %object, count = removed.len(), "对象删除，级联移除条件边");
        }
        removed
    }

    /// 查询约束某对象的全部入边（满足度评估的输入）
    pub fn edges_into(&self, conditional: ObjectRef) -> Vec<Condition> {
        let inner = self.inner.read();
        inner
            .by_conditional
            .get(&conditional)
            .map(|ids| ids.iter().filter_map(|id| inner.edges.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// 查询直接依赖某前置对象的全部出边（重评估影响范围的输入）
    pub fn edges_from(&self, prerequisite: ObjectRef) -> Vec<Condition> {
        let inner = self.inner.read();
        inner
            .by_prerequisite
            .get(&prerequisite)
            .map(|ids| ids.iter().filter_map(|id| inner.edges.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// 按 ID 查询条件边
    pub fn get_edge(&self, edge_id: Uuid) -> Option<Condition> {
        self.inner.read().edges.get(&edge_id).cloned()
    }

    /// 课程内条件边数量
    pub fn course_edge_count(&self, course_id: i64) -> usize {
        self.inner
            .read()
            .by_course
            .get(&course_id)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    async fn require_in_course(&self, object: ObjectRef, course_id: i64) -> Result<()> {
        match self.directory.course_of(object).await? {
            None => Err(ConditionError::UnknownObject(object)),
            Some(actual) if actual != course_id => Err(ConditionError::CrossCourse {
                object,
                expected_course: course_id,
                actual_course: actual,
            }),
            Some(_) => Ok(()),
        }
    }
}
