use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 汇总统计中保留的高频替换词数量
pub const TOP_REPLACEMENTS_LIMIT: usize = 10;

/// 任务状态（与服务端 status 字段一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 一次替换的计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementCount {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub count: u64,
}

/// 处理统计（单文件或整批）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProcessingStatistics {
    pub total_replacements: u64,
    pub term_corrections: u64,
    pub noise_removals: u64,
    pub top_replacements: Vec<ReplacementCount>,
}

impl ProcessingStatistics {
    /// 汇总多个文件的统计
    ///
    /// 计数直接求和，高频词按 source 合并后取前 10（计数相同按 source 排序）
    pub fn aggregate<'a>(items: impl IntoIterator<Item = &'a ProcessingStatistics>) -> Self {
        let mut total = ProcessingStatistics::default();
        let mut counts: HashMap<String, u64> = HashMap::new();

        for stats in items {
            total.total_replacements += stats.total_replacements;
            total.term_corrections += stats.term_corrections;
            total.noise_removals += stats.noise_removals;
            for item in &stats.top_replacements {
                if item.source.is_empty() {
                    continue;
                }
                *counts.entry(item.source.clone()).or_default() += item.count;
            }
        }

        let mut top: Vec<ReplacementCount> = counts
            .into_iter()
            .map(|(source, count)| ReplacementCount {
                source,
                target: None,
                count,
            })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
        top.truncate(TOP_REPLACEMENTS_LIMIT);
        total.top_replacements = top;
        total
    }
}

/// 一次批处理任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    /// 服务端报告的进度 0..=100
    pub progress: u8,
    pub processed_files: u32,
    pub total_files: u32,
    pub statistics: ProcessingStatistics,
    pub submitted_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Task {
    pub fn new(id: impl Into<String>, total_files: u32) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            progress: 0,
            processed_files: 0,
            total_files,
            statistics: ProcessingStatistics::default(),
            submitted_at: Local::now(),
            finished_at: None,
        }
    }
}
