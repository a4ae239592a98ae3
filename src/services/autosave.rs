//! 字典自动保存
//!
//! 编辑同步生效并重启防抖计时器，只有一串编辑中的最后一次会触发保存。
//! 每个文档持有一把保存锁，同一时刻最多只有一个保存在进行；排队的保存
//! 在开始时读取最新内容，若它等待的那次保存已经写入了最新版本则直接跳过。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::clients::RemoteService;
use crate::config::Config;
use crate::error::{ApiError, AppResult, SaveError, ValidationError};
use crate::models::{Dictionary, DictionaryDocument, SaveStatus};

struct DocState<D> {
    document: DictionaryDocument<D>,
    /// 每次编辑 +1
    version: u64,
    /// 最近一次成功写入的版本
    persisted_version: u64,
    debounce_epoch: u64,
    status_epoch: u64,
    /// 尚未触发的防抖计时器；触发后立即移除，之后的编辑不会中断进行中的保存
    pending_timer: Option<JoinHandle<()>>,
    reset_timer: Option<JoinHandle<()>>,
}

struct Core<D, S> {
    remote: Arc<S>,
    debounce: Duration,
    saved_reset: Duration,
    state: Mutex<DocState<D>>,
    save_lock: Arc<tokio::sync::Mutex<()>>,
    status: watch::Sender<SaveStatus>,
}

impl<D: Dictionary, S: RemoteService> Core<D, S> {
    fn lock(&self) -> MutexGuard<'_, DocState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, state: &mut DocState<D>, status: SaveStatus) {
        state.document.save_status = status;
        state.status_epoch += 1;
        if let Some(handle) = state.reset_timer.take() {
            handle.abort();
        }
        self.status.send_replace(status);
    }

    /// 用户操作会把 Error 清回 Idle
    fn clear_error(&self, state: &mut DocState<D>) {
        if state.document.save_status == SaveStatus::Error {
            self.set_status(state, SaveStatus::Idle);
        }
    }

    fn cancel_pending_timer(state: &mut DocState<D>) {
        state.debounce_epoch += 1;
        if let Some(handle) = state.pending_timer.take() {
            handle.abort();
        }
    }

    async fn debounced_save(self: Arc<Self>, epoch: u64) {
        tokio::time::sleep(self.debounce).await;
        {
            let mut state = self.lock();
            if state.debounce_epoch != epoch {
                return;
            }
            state.pending_timer.take();
        }
        // 失败已记录在保存状态里
        let _ = self.save().await;
    }

    async fn save(self: &Arc<Self>) -> Result<(), SaveError> {
        let kind = D::KIND;
        let (_guard, waited) = match self.save_lock.clone().try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => {
                debug!("{} 有保存正在进行，排队等待", kind);
                (self.save_lock.clone().lock_owned().await, true)
            }
        };

        let (payload, version) = {
            let mut state = self.lock();
            if waited && state.persisted_version == state.version {
                debug!("{} 最新内容已由上一次保存写入，跳过", kind);
                return Ok(());
            }
            self.set_status(&mut state, SaveStatus::Saving);
            (state.document.payload.clone(), state.version)
        };

        let result = match serde_json::to_value(&payload) {
            Ok(body) => self
                .remote
                .put_dictionary(kind, &body)
                .await
                .map_err(|source| SaveError::WriteFailed {
                    kind: kind.to_string(),
                    source,
                }),
            Err(source) => Err(SaveError::Serialize {
                kind: kind.to_string(),
                source,
            }),
        };

        let mut state = self.lock();
        match result {
            Ok(()) => {
                state.persisted_version = state.persisted_version.max(version);
                if state.version == version {
                    state.document.dirty = false;
                }
                self.set_status(&mut state, SaveStatus::Saved);
                let epoch = state.status_epoch;
                state.reset_timer = Some(tokio::spawn(Self::reset_saved(self.clone(), epoch)));
                info!("💾 {} 已保存 ({} 条)", kind, payload.entry_count());
                Ok(())
            }
            Err(e) => {
                error!("❌ {}", e);
                self.set_status(&mut state, SaveStatus::Error);
                Err(e)
            }
        }
    }

    async fn reset_saved(self: Arc<Self>, epoch: u64) {
        tokio::time::sleep(self.saved_reset).await;
        let mut state = self.lock();
        if state.status_epoch == epoch && state.document.save_status == SaveStatus::Saved {
            state.reset_timer.take();
            self.set_status(&mut state, SaveStatus::Idle);
        }
    }
}

/// 字典自动保存协调器，每种字典一个实例
///
/// `edit` 会启动后台计时器，必须在 tokio 运行时内调用
pub struct AutoSaveCoordinator<D, S> {
    core: Arc<Core<D, S>>,
}

impl<D: Dictionary, S: RemoteService> AutoSaveCoordinator<D, S> {
    pub fn new(remote: Arc<S>, payload: D, config: &Config) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        let state = DocState {
            document: DictionaryDocument::new(payload),
            version: 0,
            persisted_version: 0,
            debounce_epoch: 0,
            status_epoch: 0,
            pending_timer: None,
            reset_timer: None,
        };
        Self {
            core: Arc::new(Core {
                remote,
                debounce: config.autosave_debounce(),
                saved_reset: config.saved_status_reset(),
                state: Mutex::new(state),
                save_lock: Arc::new(tokio::sync::Mutex::new(())),
                status,
            }),
        }
    }

    /// 从远程加载字典
    pub async fn load(remote: Arc<S>, config: &Config) -> AppResult<Self> {
        let kind = D::KIND;
        let raw = remote.get_dictionary(kind).await?;
        let payload: D = serde_json::from_value(raw)
            .map_err(|e| ApiError::json_parse_failed(format!("/dictionaries/{}", kind.as_path()), e))?;
        info!("📖 已加载{} ({} 条)", kind, payload.entry_count());
        Ok(Self::new(remote, payload, config))
    }

    /// 修改文档并重启防抖计时器
    ///
    /// 校验失败时文档保持原样，也不会安排保存
    pub fn edit<F>(&self, mutation: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut D) -> Result<(), ValidationError>,
    {
        let mut state = self.core.lock();
        let mut draft = state.document.payload.clone();
        mutation(&mut draft)?;

        state.document.payload = draft;
        state.document.dirty = true;
        state.version += 1;
        self.core.clear_error(&mut state);

        Core::<D, S>::cancel_pending_timer(&mut state);
        let epoch = state.debounce_epoch;
        state.pending_timer = Some(tokio::spawn(Core::debounced_save(self.core.clone(), epoch)));
        Ok(())
    }

    /// 取消防抖并立即保存
    pub async fn flush(&self) -> Result<(), SaveError> {
        {
            let mut state = self.core.lock();
            Core::<D, S>::cancel_pending_timer(&mut state);
            self.core.clear_error(&mut state);
        }
        self.core.save().await
    }

    /// 文档快照
    pub fn document(&self) -> DictionaryDocument<D> {
        self.core.lock().document.clone()
    }

    pub fn status(&self) -> SaveStatus {
        *self.core.status.borrow()
    }

    /// 订阅保存状态变化
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.core.status.subscribe()
    }
}

impl<D, S> Drop for AutoSaveCoordinator<D, S> {
    fn drop(&mut self) {
        let mut state = self.core.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.pending_timer.take() {
            handle.abort();
        }
        if let Some(handle) = state.reset_timer.take() {
            handle.abort();
        }
    }
}
