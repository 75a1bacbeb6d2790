//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整个工作集 Vec<Post>，提交进度)
//!     ↓
//! workflow::PostFlow (处理单个 Post：限流 → 调用 → 重试 → 解析)
//!     ↓
//! services (能力层：rate_limiter / retry / llm / response_parser / post_store)
//! ```
//!
//! 编排层只做调度、持久化时机和统计，不做具体业务判断。

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, BatchStats};
