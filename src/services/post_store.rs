//! 工作集持久化 - 业务能力层
//!
//! 工作集是一个 JSON 文档，启动时整体读取，每处理完一个帖子整体回写。
//! 回写先写入同目录下的 `.tmp` 文件再原子替换，崩溃时旧版本保持完整。
//!
//! 同一个文件只允许一个进程写入，这里不做跨进程加锁。

use crate::error::StoreError;
use crate::models::Post;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// 帖子工作集存储
#[derive(Debug, Clone)]
pub struct PostStore {
    path: PathBuf,
}

impl PostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// 读取整个工作集
    ///
    /// 上次提交中断留下的临时文件会被清理，数据始终以正式文件为准。
    pub async fn load(&self) -> Result<Vec<Post>, StoreError> {
        self.recover_interrupted_write().await;

        let path = self.path.display().to_string();
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::ReadFailed {
                path: path.clone(),
                source,
            })?;

        let posts: Vec<Post> =
            serde_json::from_str(&content).map_err(|source| StoreError::ParseFailed { path, source })?;

        debug!("从 {} 读取了 {} 个帖子", self.path.display(), posts.len());
        Ok(posts)
    }

    /// 提交整个工作集，覆盖上一版本
    pub async fn commit(&self, posts: &[Post]) -> Result<(), StoreError> {
        let content = to_pretty_json(posts)?;
        let tmp_path = self.temp_path();

        fs::write(&tmp_path, &content)
            .await
            .map_err(|source| StoreError::WriteFailed {
                path: tmp_path.display().to_string(),
                source,
            })?;

        let sync_path = tmp_path.clone();
        let synced =
            tokio::task::spawn_blocking(move || std::fs::File::open(&sync_path)?.sync_all()).await;
        match synced {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("临时文件落盘失败: {}", e),
            Err(e) => warn!("临时文件落盘任务失败: {}", e),
        }

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::RenameFailed {
                from: tmp_path.display().to_string(),
                to: self.path.display().to_string(),
                source,
            })?;

        debug!("工作集已提交: {}", self.path.display());
        Ok(())
    }

    async fn recover_interrupted_write(&self) {
        let tmp_path = self.temp_path();
        if fs::try_exists(&tmp_path).await.unwrap_or(false) {
            warn!("发现中断的写入，删除 {}", tmp_path.display());
            if let Err(e) = fs::remove_file(&tmp_path).await {
                warn!("删除临时文件失败: {}", e);
            }
        }
    }
}

/// 三空格缩进的 JSON，非 ASCII 字符原样输出
fn to_pretty_json(posts: &[Post]) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    posts
        .serialize(&mut serializer)
        .map_err(StoreError::SerializeFailed)?;
    Ok(buf)
}
