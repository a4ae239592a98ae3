//! # Linguist Client
//!
//! 字幕后处理工具的客户端核心：差异计算、批处理任务编排、字典自动保存
//!
//! ## 架构设计
//!
//! 本库采用分层架构：
//!
//! ### ① 网络边界（Clients）
//! - `clients/` - 远程处理服务的抽象与 HTTP 实现
//! - `RemoteService` - 核心逻辑唯一依赖的接口
//! - `HttpRemoteClient` - 基于 reqwest 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `diff_engine` - 原文与修正文本的字符级差异
//! - `AutoSaveCoordinator` - 字典编辑的防抖保存
//! - `UploadService` - 字幕文件校验与上传
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/task_orchestrator` - 一次批处理的提交、轮询、对账
//! - `orchestrator/progress_simulator` - 展示用的模拟进度
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{HttpRemoteClient, LocalFile, RemoteService};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    CorrectionDictionary, CorrectionTerm, DictionaryKind, SaveStatus, ShieldingDictionary,
    SubtitleEntry, SubtitleFile, Task, TaskStatus,
};
pub use orchestrator::{Phase, TaskOrchestrator, TaskSnapshot};
pub use services::{compute_diff, AutoSaveCoordinator, DiffSegment, SegmentKind, UploadService};
