//! 批处理任务编排器 - 编排层
//!
//! ## 职责
//!
//! 持有"一次批处理"的完整生命周期：提交、轮询、模拟进度、完成 / 失败对账。
//!
//! ## 并发模型
//!
//! - 每次 `submit()` 产生一个新的代次（generation），并启动两个协作任务：
//!   轮询任务和进度模拟任务，二者都记住启动时的代次
//! - 所有异步回调在修改状态前都会比对代次，不一致即放弃修改
//! - 新的提交或 `dispose()` 会终止旧代次的两个任务
//! - 外部只能通过快照（`snapshot()` / `subscribe()`）读取状态

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clients::RemoteService;
use crate::config::Config;
use crate::error::{AppError, AppResult, PollError, SubmissionError, TaskError};
use crate::models::{
    FileRef, FileStatus, ProcessingOptions, ProcessingStatistics, ResultFile, ResultResponse,
    StartProcessingRequest, StatusResponse, SubtitleFile, Task, TaskStatus,
};
use crate::orchestrator::progress_simulator::{blend_progress, ProgressSimulator, SimulatedProgress};
use crate::utils::logging;

/// 编排器所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// 对外暴露的一致性快照
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub generation: u64,
    pub phase: Phase,
    pub task: Option<Task>,
    pub files: Vec<SubtitleFile>,
    /// 模拟进度；空闲时为空
    pub simulated: Option<SimulatedProgress>,
    /// 展示进度，同一代次内单调不减
    pub display_progress: u8,
    pub error: Option<String>,
}

impl TaskSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            phase: Phase::Idle,
            task: None,
            files: Vec::new(),
            simulated: None,
            display_progress: 0,
            error: None,
        }
    }

    /// 当前阶段文案
    pub fn stage_label(&self) -> Option<&'static str> {
        self.simulated.as_ref().map(SimulatedProgress::stage_label)
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.id.as_str())
    }
}

struct State {
    view: TaskSnapshot,
    /// 最近一次失败的完整错误，供 `wait_for_terminal` 取走
    error: Option<AppError>,
    poller: Option<JoinHandle<()>>,
    simulator: Option<JoinHandle<()>>,
}

impl State {
    /// 终止两个活动（用于新提交 / dispose）
    fn stop_activities(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
        if let Some(handle) = self.simulator.take() {
            handle.abort();
        }
    }

    /// 到达终态时调用：停止模拟，轮询任务自行退出
    fn finish_activities(&mut self) {
        if let Some(handle) = self.simulator.take() {
            handle.abort();
        }
        self.poller.take();
    }

    fn raise_display(&mut self, candidate: u8) {
        self.view.display_progress = self.view.display_progress.max(candidate);
    }

    fn apply_simulated(&mut self, progress: SimulatedProgress) -> bool {
        if self.view.phase.is_terminal() {
            return false;
        }
        self.view.simulated = Some(progress);
        let observed = self.view.task.as_ref().map_or(0, |t| t.progress);
        self.raise_display(blend_progress(observed, &progress));
        true
    }

    fn apply_status(&mut self, status: &StatusResponse) {
        let Some(task) = self.view.task.as_mut() else {
            return;
        };
        task.progress = status.progress.min(100) as u8;
        task.processed_files = status.processed_files;
        if status.total_files > 0 {
            task.total_files = status.total_files;
        }
        if !status.status.is_terminal() {
            task.status = status.status;
        }
        let observed = task.progress;
        let simulated = self.view.simulated.unwrap_or_default();
        self.raise_display(blend_progress(observed, &simulated));
    }

    /// 对账：按 file_id 把结果挂到对应文件上，返回匹配到的文件数
    fn complete(&mut self, result: ResultResponse) -> usize {
        let by_id: HashMap<&str, &ResultFile> = result
            .files
            .iter()
            .map(|f| (f.file_id.as_str(), f))
            .collect();

        let mut matched = 0;
        for file in &mut self.view.files {
            let Some(found) = file.uploaded_id().and_then(|id| by_id.get(id).copied()) else {
                continue;
            };
            file.status = FileStatus::Completed;
            file.statistics = Some(found.statistics.clone());
            file.diff_data = found.diff_data.clone();
            file.output_path = found.output_path.clone();
            matched += 1;
        }

        let aggregate = ProcessingStatistics::aggregate(
            self.view.files.iter().filter_map(|f| f.statistics.as_ref()),
        );
        if aggregate.total_replacements != result.statistics.total_replacements {
            warn!(
                "本地汇总替换数 {} 与服务端 {} 不一致",
                aggregate.total_replacements, result.statistics.total_replacements
            );
        }

        if let Some(task) = self.view.task.as_mut() {
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.statistics = aggregate;
            task.finished_at = Some(Local::now());
        }
        self.view.simulated = Some(SimulatedProgress::completed());
        self.view.display_progress = 100;
        self.view.phase = Phase::Completed;
        self.view.error = None;
        self.error = None;
        self.finish_activities();
        matched
    }

    fn mark_failed(&mut self, message: String) {
        if let Some(task) = self.view.task.as_mut() {
            task.status = TaskStatus::Failed;
            task.finished_at = Some(Local::now());
        }
        self.view.phase = Phase::Failed;
        self.view.error = Some(message);
        self.finish_activities();
    }

    fn fail(&mut self, err: AppError) {
        self.mark_failed(err.to_string());
        self.error = Some(err);
    }
}

struct Shared {
    state: Mutex<State>,
    updates: watch::Sender<TaskSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.updates.send_replace(state.view.clone());
    }

    /// 仅当代次仍然有效时修改状态；过期回调返回 None 且不做任何修改
    fn update_if_current<R>(&self, generation: u64, f: impl FnOnce(&mut State) -> R) -> Option<R> {
        let mut state = self.lock();
        if state.view.generation != generation {
            debug!(
                "丢弃过期回调 (generation {} / 当前 {})",
                generation, state.view.generation
            );
            return None;
        }
        let result = f(&mut state);
        self.publish(&state);
        Some(result)
    }
}

/// 批处理任务编排器
pub struct TaskOrchestrator<S: RemoteService> {
    remote: Arc<S>,
    config: Config,
    shared: Arc<Shared>,
}

impl<S: RemoteService> TaskOrchestrator<S> {
    pub fn new(remote: Arc<S>, config: Config) -> Self {
        let (updates, _) = watch::channel(TaskSnapshot::idle(0));
        let state = State {
            view: TaskSnapshot::idle(0),
            error: None,
            poller: None,
            simulator: None,
        };
        Self {
            remote,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> TaskSnapshot {
        self.shared.lock().view.clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.shared.updates.subscribe()
    }

    /// 提交一批已上传的文件，返回服务端任务ID
    ///
    /// 校验失败时不会发出任何请求，也不会改变当前状态
    pub async fn submit(&self, files: Vec<SubtitleFile>) -> AppResult<String> {
        let file_refs = validate_files(&files)?;
        let total_files = file_refs.len();
        let request = StartProcessingRequest {
            files: file_refs,
            options: ProcessingOptions::from(&self.config),
        };

        let generation = {
            let mut state = self.shared.lock();
            state.stop_activities();
            let generation = state.view.generation + 1;
            state.view = TaskSnapshot {
                generation,
                phase: Phase::Submitting,
                task: None,
                files,
                simulated: Some(SimulatedProgress::default()),
                display_progress: 0,
                error: None,
            };
            state.error = None;
            state.simulator = Some(tokio::spawn(run_simulator(
                self.shared.clone(),
                generation,
                self.config.simulation_tick(),
                self.config.simulation_seed,
            )));
            self.shared.publish(&state);
            generation
        };
        logging::log_batch_submitted(generation, total_files);

        let guard = SubmitGuard {
            shared: self.shared.clone(),
            generation,
            armed: true,
        };
        let started = self.remote.start_processing(&request).await;
        guard.disarm();

        let task_id = match started {
            Ok(task_id) => task_id,
            Err(e) => {
                error!("❌ 启动处理失败: {}", e);
                let err = TaskError::StartFailed {
                    message: e.to_string(),
                };
                self.shared
                    .update_if_current(generation, |state| state.fail(err.into()));
                return Err(SubmissionError::StartFailed { source: e }.into());
            }
        };
        info!("✓ 任务已创建: {}", task_id);

        let poller = PollLoop {
            shared: self.shared.clone(),
            remote: self.remote.clone(),
            generation,
            task_id: task_id.clone(),
            interval: self.config.poll_interval(),
            max_retries: self.config.poll_max_retries,
        };
        let started = self.shared.update_if_current(generation, |state| {
            state.view.task = Some(Task::new(task_id.clone(), total_files as u32));
            state.view.phase = Phase::Polling;
            state.poller = Some(tokio::spawn(poller.run()));
        });

        match started {
            Some(()) => Ok(task_id),
            None => {
                warn!("⚠️ 任务 {} 在创建期间已被新的提交取代", task_id);
                Err(TaskError::Superseded { generation }.into())
            }
        }
    }

    /// 等待当前代次到达终态
    ///
    /// 完成返回快照；失败返回导致失败的错误
    pub async fn wait_for_terminal(&self) -> AppResult<TaskSnapshot> {
        let mut updates = self.subscribe();
        let generation = {
            let current = updates.borrow_and_update();
            if current.phase == Phase::Idle {
                return Err(TaskError::NoTask.into());
            }
            current.generation
        };

        let snapshot = updates
            .wait_for(|s| s.generation != generation || s.phase.is_terminal())
            .await
            .map_err(|_| AppError::Task(TaskError::NoTask))?
            .clone();

        if snapshot.generation != generation {
            return Err(TaskError::Superseded { generation }.into());
        }
        match snapshot.phase {
            Phase::Completed => Ok(snapshot),
            _ => {
                let stored = self.shared.update_if_current(generation, |state| state.error.take());
                Err(stored.flatten().unwrap_or_else(|| {
                    AppError::Poll(PollError::TaskFailed {
                        task_id: snapshot.task_id().unwrap_or_default().to_string(),
                    })
                }))
            }
        }
    }

    /// 放弃当前任务：终止轮询和模拟，丢弃模拟进度，回到 Idle
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        state.stop_activities();
        let generation = state.view.generation + 1;
        state.view = TaskSnapshot::idle(generation);
        state.error = None;
        self.shared.publish(&state);
        debug!("编排器已重置 (generation {})", generation);
    }

    /// 下载已完成任务的全部结果（ZIP），写入 `dir`，返回文件路径
    pub async fn download_zip(&self, dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let task_id = {
            let state = self.shared.lock();
            if state.view.phase != Phase::Completed {
                return Err(TaskError::NotCompleted.into());
            }
            state
                .view
                .task_id()
                .map(str::to_string)
                .ok_or(TaskError::NoTask)?
        };

        let bytes = self.remote.download_zip(&task_id).await?;
        let path = dir.as_ref().join(format!(
            "corrected_subtitles_{}.zip",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("写入压缩包失败: {}", path.display()))?;
        info!("📦 结果已保存至: {}", path.display());
        Ok(path)
    }
}

impl<S: RemoteService> Drop for TaskOrchestrator<S> {
    fn drop(&mut self) {
        self.shared.lock().stop_activities();
    }
}

fn validate_files(files: &[SubtitleFile]) -> Result<Vec<FileRef>, SubmissionError> {
    if files.is_empty() {
        return Err(SubmissionError::EmptyFileList);
    }
    files
        .iter()
        .map(|file| match file.uploaded_id() {
            Some(id) => Ok(FileRef {
                file_id: id.to_string(),
                filename: file.display_name(),
            }),
            None => Err(SubmissionError::MissingFileId {
                filename: file.name.clone(),
            }),
        })
        .collect()
}

/// 提交在等待启动响应期间被丢弃时，终止该代次的模拟并标记失败
struct SubmitGuard {
    shared: Arc<Shared>,
    generation: u64,
    armed: bool,
}

impl SubmitGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let generation = self.generation;
        warn!("⚠️ 第 {} 次提交在启动前被取消", generation);
        self.shared.update_if_current(generation, |state| {
            state.fail(TaskError::Cancelled { generation }.into())
        });
    }
}

/// 轮询任务：请求严格串行，上一次响应处理完才发下一次
struct PollLoop<S> {
    shared: Arc<Shared>,
    remote: Arc<S>,
    generation: u64,
    task_id: String,
    interval: Duration,
    max_retries: u32,
}

impl<S: RemoteService> PollLoop<S> {
    async fn run(self) {
        let mut failures = 0u32;
        loop {
            let status = match self.remote.get_status(&self.task_id).await {
                Ok(status) => {
                    failures = 0;
                    status
                }
                Err(e) if failures < self.max_retries => {
                    failures += 1;
                    warn!(
                        "⚠️ 查询任务 {} 状态失败，{} (重试 {}/{}): {}",
                        self.task_id,
                        if e.is_transport() { "网络错误" } else { "服务端错误" },
                        failures,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.interval).await;
                    continue;
                }
                Err(e) => {
                    error!("❌ 查询任务 {} 状态失败: {}", self.task_id, e);
                    let err = PollError::StatusFailed {
                        task_id: self.task_id.clone(),
                        source: e,
                    };
                    self.shared
                        .update_if_current(self.generation, |state| state.fail(err.into()));
                    return;
                }
            };

            let applied = self
                .shared
                .update_if_current(self.generation, |state| state.apply_status(&status));
            if applied.is_none() {
                return;
            }

            match status.status {
                TaskStatus::Pending | TaskStatus::Processing => {
                    debug!(
                        "任务 {}: {} ({}/{} 个文件, {}%)",
                        self.task_id,
                        if status.status == TaskStatus::Pending { "排队中" } else { "处理中" },
                        status.processed_files,
                        status.total_files,
                        status.progress
                    );
                    tokio::time::sleep(self.interval).await;
                }
                TaskStatus::Completed => {
                    self.reconcile().await;
                    return;
                }
                TaskStatus::Failed => {
                    error!("❌ 任务 {} 处理失败", self.task_id);
                    let err = PollError::TaskFailed {
                        task_id: self.task_id.clone(),
                    };
                    self.shared
                        .update_if_current(self.generation, |state| state.fail(err.into()));
                    return;
                }
            }
        }
    }

    /// 观察到完成后只拉取一次结果
    async fn reconcile(&self) {
        match self.remote.get_result(&self.task_id).await {
            Ok(result) => {
                let total = self.shared.update_if_current(self.generation, |state| {
                    let matched = state.complete(result);
                    let stats = state
                        .view
                        .task
                        .as_ref()
                        .map(|t| t.statistics.clone())
                        .unwrap_or_default();
                    (matched, state.view.files.len(), stats)
                });
                if let Some((matched, total, stats)) = total {
                    logging::print_final_stats(&self.task_id, &stats, matched, total);
                }
            }
            Err(e) => {
                error!("❌ 获取任务 {} 结果失败: {}", self.task_id, e);
                let err = PollError::ResultFailed {
                    task_id: self.task_id.clone(),
                    source: e,
                };
                self.shared
                    .update_if_current(self.generation, |state| state.fail(err.into()));
            }
        }
    }
}

const MIN_SIMULATION_TICK: Duration = Duration::from_millis(1);

/// 模拟任务：按节拍推进，代次失效或到达终态即退出
async fn run_simulator(shared: Arc<Shared>, generation: u64, tick: Duration, seed: Option<u64>) {
    let mut simulator = ProgressSimulator::new(seed);
    let mut ticker = tokio::time::interval(tick.max(MIN_SIMULATION_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let progress = simulator.tick();
        match shared.update_if_current(generation, |state| state.apply_simulated(progress)) {
            Some(true) => {}
            _ => break,
        }
    }
}
