//! 条件图存储与写入期校验
//!
//! ## 核心组件
//!
//! - `ConditionGraph` - 课程范围的条件边存储，带查询索引
//! - `CourseDirectory` - 课程归属目录 trait，由外部领域实现
//! - `validator` - 自引用、唯一性与无环不变量校验

mod store;
pub(crate) mod validator;

pub use store::{ConditionGraph, CourseDirectory};
