//! 远程处理服务的请求 / 响应结构

use serde::{Deserialize, Serialize};

use crate::models::subtitle::SubtitleEntry;
use crate::models::task::{ProcessingStatistics, TaskStatus};

/// 上传接口返回的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// 提交处理时的文件引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub filename: String,
}

/// 处理选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub use_correction: bool,
    pub use_shielding: bool,
    pub use_noise_removal: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            use_correction: true,
            use_shielding: true,
            use_noise_removal: true,
        }
    }
}

impl From<&crate::config::Config> for ProcessingOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            use_correction: config.use_correction,
            use_shielding: config.use_shielding,
            use_noise_removal: config.use_noise_removal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProcessingRequest {
    pub files: Vec<FileRef>,
    #[serde(flatten)]
    pub options: ProcessingOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProcessingResponse {
    pub task_id: String,
}

/// 任务状态查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub processed_files: u32,
    #[serde(default)]
    pub total_files: u32,
}

/// 结果中的单个文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub file_id: String,
    #[serde(default)]
    pub statistics: ProcessingStatistics,
    #[serde(default)]
    pub diff_data: Vec<SubtitleEntry>,
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub files: Vec<ResultFile>,
    #[serde(default)]
    pub statistics: ProcessingStatistics,
}

/// 字典条目统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DictionaryStats {
    pub correction_terms: u64,
    pub protected_words: u64,
    pub noise_patterns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub source: String,
    pub count: u64,
}

/// 历史累计统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HistoricalStats {
    pub total_files_processed: u64,
    pub total_replacements: u64,
    pub top_terms: Vec<TermCount>,
}
