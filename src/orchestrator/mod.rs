//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批处理任务的调度，是整个客户端的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `task_orchestrator` - 批处理任务编排器
//! - 校验并提交一批已上传的文件
//! - 串行轮询任务状态，完成后拉取一次结果并按文件ID对账
//! - 以代次（generation）隔离新旧提交，过期回调一律丢弃
//! - 通过 watch 通道对外发布状态快照
//!
//! ### `progress_simulator` - 模拟进度
//! - 按节拍推进估计进度和阶段文案
//! - 与真实进度合成单调不减的展示进度
//!
//! ## 层次关系
//!
//! ```text
//! task_orchestrator (一次批处理)
//!     ↓
//! progress_simulator (展示用进度)
//!     ↓
//! clients::RemoteService (远程处理服务)
//! ```

pub mod progress_simulator;
pub mod task_orchestrator;

// 重新导出主要类型
pub use progress_simulator::{ProgressSimulator, SimulatedProgress, PROCESSING_STAGES};
pub use task_orchestrator::{Phase, TaskOrchestrator, TaskSnapshot};
