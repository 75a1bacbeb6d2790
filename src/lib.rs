//! # Forum Post Analyzer
//!
//! 把论坛帖子逐个发送给 LLM，生成结构化分析并写回帖子记录的离线批处理工具
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - `Post` / `AnalysisResult`，`analysis` 存在即表示已处理
//!
//! ### ② 业务能力层（Services）
//! - `RateLimiter` - 滚动窗口配额 + 帖子间固定间隔
//! - `RetryCoordinator` - 失败分类与退避
//! - `response_parser` - 模型回复规整，解析失败时降级
//! - `LlmService` - OpenAI 兼容接口的 `Analyzer` 实现
//! - `PostStore` - 工作集的整体读取与原子提交
//!
//! ### ③ 流程层（Workflow）
//! - `PostFlow` - 单个帖子的处理流程（限流 → 调用 → 重试 → 解析）
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchProcessor` - 顺序处理所有待处理帖子，每个帖子后提交进度
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnalysisResult, Post};
pub use orchestrator::{BatchProcessor, BatchStats};
pub use services::{Analyzer, LlmService, PostStore};
pub use workflow::{PostCtx, PostFlow};
