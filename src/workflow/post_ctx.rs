//! 帖子处理上下文
//!
//! 封装"我正在处理第几个待处理帖子"这一信息，仅用于日志

use std::fmt::Display;

/// 帖子处理上下文
#[derive(Debug, Clone)]
pub struct PostCtx {
    /// 帖子ID
    pub post_id: String,

    /// 在待处理队列中的序号（从1开始）
    pub position: usize,

    /// 待处理帖子总数
    pub pending_total: usize,
}

impl PostCtx {
    pub fn new(post_id: String, position: usize, pending_total: usize) -> Self {
        Self {
            post_id,
            position,
            pending_total,
        }
    }

    /// 是否还有后续待处理帖子
    pub fn has_next(&self) -> bool {
        self.position < self.pending_total
    }
}

impl Display for PostCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{} 帖子#{}]",
            self.position, self.pending_total, self.post_id
        )
    }
}
