use serde::{Deserialize, Serialize};

use crate::models::task::ProcessingStatistics;
use crate::services::diff_engine::{compute_diff, DiffSegment};

/// 单条字幕的修正结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub index: u32,
    pub time: String,
    pub original: String,
    pub modified: String,
    #[serde(default)]
    pub changed: bool,
}

impl SubtitleEntry {
    /// 计算本条字幕的字符级差异
    pub fn diff(&self) -> Vec<DiffSegment> {
        compute_diff(&self.original, &self.modified)
    }
}

/// 批处理中单个文件的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// 仅在本地，尚未上传
    #[default]
    Pending,
    /// 已上传，拿到了 file_id
    Uploaded,
    /// 已处理完成，附带了结果
    Completed,
}

/// 批处理中的一个字幕文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubtitleFile {
    /// 原始文件名
    pub name: String,
    /// 上传后由服务端分配的 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// 文件大小（字节）
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ProcessingStatistics>,
    #[serde(default)]
    pub diff_data: Vec<SubtitleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl SubtitleFile {
    /// 创建一个已上传的文件条目
    pub fn uploaded(name: impl Into<String>, file_id: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            file_id: Some(file_id.into()),
            size,
            status: FileStatus::Uploaded,
            ..Default::default()
        }
    }

    /// 有效的 file_id（空字符串视为未上传）
    pub fn uploaded_id(&self) -> Option<&str> {
        self.file_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// 提交给服务端使用的文件名，缺失时回退为 `<file_id>.srt`
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        match self.uploaded_id() {
            Some(id) => format!("{}.srt", id),
            None => String::new(),
        }
    }

    /// 发生修改的字幕条数
    pub fn changed_count(&self) -> usize {
        self.diff_data.iter().filter(|entry| entry.changed).count()
    }

    /// 修正后的 SRT 文本
    pub fn corrected_srt(&self) -> String {
        to_srt(&self.diff_data)
    }
}

/// 把修正后的字幕条目渲染回 SRT 文本
///
/// 每条为 `序号\n时间轴\n修正文本\n`，条目之间空一行
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}\n{}\n{}\n", entry.index, entry.time, entry.modified))
        .collect::<Vec<_>>()
        .join("\n")
}
