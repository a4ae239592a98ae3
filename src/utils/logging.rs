/// 日志工具模块
///
/// 提供日志初始化以及批处理任务的日志输出辅助函数
use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::ProcessingStatistics;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info 级别
pub fn init(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("日志初始化失败: {}", e))
}

/// 测试用日志初始化，重复调用不会报错
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// 记录批量提交信息
///
/// # 参数
/// - `generation`: 本次提交的代号
/// - `file_count`: 文件数量
pub fn log_batch_submitted(generation: u64, file_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 提交批量处理 (第 {} 次提交)", generation);
    info!("📄 共 {} 个文件", file_count);
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 打印任务完成后的统计信息
///
/// # 参数
/// - `task_id`: 任务ID
/// - `stats`: 汇总统计
/// - `completed_files`: 匹配到结果的文件数
/// - `total_files`: 提交的文件数
pub fn print_final_stats(
    task_id: &str,
    stats: &ProcessingStatistics,
    completed_files: usize,
    total_files: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 任务 {} 处理完成", task_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 文件: {}/{}", completed_files, total_files);
    info!("🔁 总替换: {}", stats.total_replacements);
    info!("📚 术语修正: {}", stats.term_corrections);
    info!("🧹 噪音清理: {}", stats.noise_removals);
    for (rank, item) in stats.top_replacements.iter().take(3).enumerate() {
        info!("  #{} {} × {}", rank + 1, truncate_text(&item.source, 20), item.count);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
