//! 循环与唯一性校验器
//!
//! 在每次条件边写入前对课程范围的边集合执行不变量校验。
//! 图以边集合上的邻接查询抽象表示，循环检测是一次有界的可达性搜索，
//! 无需在存储中维护任何回指或可变图节点。

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{ConditionError, Result};
use crate::models::{Condition, ObjectRef};

/// 对候选边执行全部写入期不变量校验
///
/// `existing` 是课程内当前全部条件边。按自引用、唯一性、无环的顺序
/// 检查，返回第一个被违反的不变量；全部通过时返回 Ok。
pub(crate) fn validate_candidate(
    existing: &[&Condition],
    conditional: ObjectRef,
    prerequisite: ObjectRef,
) -> Result<()> {
    // 1. 自引用：身份是 (kind, id)，跨类型的同数值 ID 不算自引用
    if prerequisite == conditional {
        return Err(ConditionError::SelfReference {
            object: conditional,
        });
    }

    // 2. 唯一性：同一 (conditional, prerequisite) 组合只允许一条边
    if existing
        .iter()
        .any(|e| e.conditional == conditional && e.prerequisite == prerequisite)
    {
        return Err(ConditionError::DuplicateEdge {
            conditional,
            prerequisite,
        });
    }

    // 3. 无环：若已存在路径 conditional ⟶ … ⟶ prerequisite，
    //    新边 prerequisite → conditional 会将其闭合成环
    if reachable(existing, conditional, prerequisite) {
        return Err(ConditionError::CyclicDependency {
            conditional,
            prerequisite,
        });
    }

    Ok(())
}

/// 沿边方向（前置 → 被约束对象）做广度优先搜索，判断 from 是否可达 to
///
/// 搜索范围被课程边集合约束，成本以课程内边数为上界
fn reachable(edges: &[&Condition], from: ObjectRef, to: ObjectRef) -> bool {
    let mut adjacency: HashMap<ObjectRef, Vec<ObjectRef>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.prerequisite)
            .or_default()
            .push(edge.conditional);
    }

    let mut visited: HashSet<ObjectRef> = HashSet::new();
    let mut queue: VecDeque<ObjectRef> = VecDeque::new();
    visited.insert(from);
    queue.push_back(from);

    while let Some(node) = queue.pop_front() {
        if node == to {
            return true;
        }
        if let Some(next) = adjacency.get(&node) {
            for &candidate in next {
                if visited.insert(candidate) {
                    queue.push_back(candidate);
                }
            }
        }
    }

    false
}
