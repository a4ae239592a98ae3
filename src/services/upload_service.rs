/// 字幕文件上传服务
///
/// 校验本地文件并上传，返回带有文件ID的批次条目
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{error, info};

use crate::clients::{LocalFile, RemoteService};
use crate::error::{AppResult, UploadError, ValidationError};
use crate::models::SubtitleFile;

/// 同时读取的本地文件数
const MAX_CONCURRENT_READS: usize = 8;

/// 上传服务
pub struct UploadService<S> {
    remote: Arc<S>,
}

impl<S: RemoteService> UploadService<S> {
    pub fn new(remote: Arc<S>) -> Self {
        Self { remote }
    }

    /// 校验待上传文件：不能为空，只接受 .srt
    pub fn validate(files: &[LocalFile]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::NoFiles);
        }
        match files.iter().find(|f| !is_srt(&f.name)) {
            Some(file) => Err(ValidationError::UnsupportedFileType {
                filename: file.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// 上传一批文件
    ///
    /// # 返回
    /// 与输入顺序一致的 `SubtitleFile`，状态为已上传；任何失败都不会产生部分结果
    pub async fn upload(&self, files: &[LocalFile]) -> AppResult<Vec<SubtitleFile>> {
        Self::validate(files)?;
        info!("📤 上传 {} 个字幕文件", files.len());

        let uploaded = self.remote.upload_files(files).await.map_err(|source| {
            error!("❌ 文件上传失败: {}", source);
            UploadError::RequestFailed { source }
        })?;

        if uploaded.len() != files.len() {
            return Err(UploadError::CountMismatch {
                expected: files.len(),
                returned: uploaded.len(),
            }
            .into());
        }

        let entries: Vec<SubtitleFile> = files
            .iter()
            .zip(uploaded)
            .map(|(local, remote)| {
                SubtitleFile::uploaded(local.name.clone(), remote.file_id, local.content.len() as u64)
            })
            .collect();
        info!("✓ 上传完成: {} 个文件", entries.len());
        Ok(entries)
    }
}

/// 与服务端一致：只认小写 `.srt` 后缀
fn is_srt(name: &str) -> bool {
    name.ends_with(".srt")
}

/// 并发读取本地文件，结果顺序与输入一致
pub async fn read_local_files(paths: &[PathBuf]) -> Result<Vec<LocalFile>> {
    stream::iter(paths)
        .map(|path| async move {
            let content = tokio::fs::read(path)
                .await
                .with_context(|| format!("读取文件失败: {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("无效的文件名: {}", path.display()))?
                .to_string();
            Ok::<_, anyhow::Error>(LocalFile::new(name, content))
        })
        .buffered(MAX_CONCURRENT_READS)
        .try_collect()
        .await
}
