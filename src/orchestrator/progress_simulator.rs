//! 模拟进度
//!
//! 服务端只在每个文件处理完时才更新进度，单文件批次会长时间停在 0%。
//! 模拟器按固定节拍推进一个估计值，越接近终点步子越小，最终停在 100 以下；
//! 展示进度取真实进度与模拟进度中的较大者。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 处理阶段文案
pub const PROCESSING_STAGES: [&str; 7] = [
    "正在读取字幕文件...",
    "正在分析文本内容...",
    "正在应用修正规则...",
    "正在匹配术语字典...",
    "正在清理噪音标记...",
    "正在生成差异对比...",
    "正在保存处理结果...",
];

/// 最后一个阶段的下标
pub const LAST_STAGE: usize = PROCESSING_STAGES.len() - 1;

/// 每个节拍推进阶段的概率
const STAGE_ADVANCE_PROBABILITY: f64 = 0.3;

/// 模拟进度快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulatedProgress {
    /// 0.0..100.0，完成时为 100.0
    pub value: f64,
    /// 0..=LAST_STAGE
    pub stage: usize,
}

impl SimulatedProgress {
    /// 观察到任务完成时的终态
    pub fn completed() -> Self {
        Self {
            value: 100.0,
            stage: LAST_STAGE,
        }
    }

    pub fn stage_label(&self) -> &'static str {
        PROCESSING_STAGES[self.stage.min(LAST_STAGE)]
    }

    /// 四舍五入后的百分比
    pub fn percent(&self) -> u8 {
        self.value.round().clamp(0.0, 100.0) as u8
    }
}

/// 展示进度 = max(真实进度, round(模拟进度))
pub fn blend_progress(observed: u8, simulated: &SimulatedProgress) -> u8 {
    observed.min(100).max(simulated.percent())
}

/// 进度模拟器，每个任务代次一个实例
#[derive(Debug)]
pub struct ProgressSimulator {
    rng: StdRng,
    progress: SimulatedProgress,
}

impl ProgressSimulator {
    /// `seed` 为空时使用系统熵
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            progress: SimulatedProgress::default(),
        }
    }

    pub fn progress(&self) -> SimulatedProgress {
        self.progress
    }

    /// 推进一个节拍，返回推进后的快照
    pub fn tick(&mut self) -> SimulatedProgress {
        let value = self.progress.value;
        let step = match value {
            v if v < 30.0 => self.rng.gen_range(0.0..8.0),
            v if v < 60.0 => self.rng.gen_range(0.0..5.0),
            v if v < 80.0 => self.rng.gen_range(0.0..2.0),
            v if v < 95.0 => self.rng.gen_range(0.0..0.5),
            _ => 0.0,
        };
        self.progress.value = value + step;

        if self.progress.stage < LAST_STAGE && self.rng.gen_bool(STAGE_ADVANCE_PROBABILITY) {
            self.progress.stage += 1;
        }

        self.progress
    }
}
