//! 测试用的可编排远程服务

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::clients::remote_service::{LocalFile, RemoteService};
use crate::error::ApiError;
use crate::models::{
    DictionaryKind, DictionaryStats, HistoricalStats, ResultResponse, StartProcessingRequest,
    StatusResponse, TaskStatus, UploadedFile,
};

pub(crate) fn status(status: TaskStatus, progress: u32) -> Result<StatusResponse, u16> {
    Ok(StatusResponse {
        status,
        progress,
        processed_files: 0,
        total_files: 1,
    })
}

#[derive(Default)]
pub(crate) struct FakeRemote {
    calls: Mutex<Vec<String>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<StatusResponse, u16>>>>,
    results: Mutex<HashMap<String, ResultResponse>>,
    status_gates: Mutex<HashMap<String, Arc<Notify>>>,
    puts: Mutex<Vec<(DictionaryKind, Value)>>,
    put_delay: Mutex<Duration>,
    start_delay: Mutex<Duration>,
    fail_puts: AtomicBool,
    fail_start: AtomicBool,
    next_task: AtomicU64,
    dictionaries: Mutex<HashMap<DictionaryKind, Value>>,
}

impl FakeRemote {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// 为任务编排状态序列，最后一个状态会一直重复
    pub(crate) fn script_status(&self, task_id: &str, script: Vec<Result<StatusResponse, u16>>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(task_id.to_string(), script.into());
    }

    pub(crate) fn set_result(&self, task_id: &str, result: ResultResponse) {
        self.results
            .lock()
            .unwrap()
            .insert(task_id.to_string(), result);
    }

    /// 该任务的状态查询会挂起，直到返回的 Notify 被触发
    pub(crate) fn gate_status(&self, task_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.status_gates
            .lock()
            .unwrap()
            .insert(task_id.to_string(), gate.clone());
        gate
    }

    pub(crate) fn puts(&self) -> Vec<(DictionaryKind, Value)> {
        self.puts.lock().unwrap().clone()
    }

    pub(crate) fn set_put_delay(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = delay;
    }

    pub(crate) fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    pub(crate) fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_dictionary(&self, kind: DictionaryKind, value: Value) {
        self.dictionaries.lock().unwrap().insert(kind, value);
    }
}

fn bad(endpoint: &str, status: u16) -> ApiError {
    ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        status,
        detail: None,
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn upload_files(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
        self.record(format!("upload:{}", files.len()));
        Ok(files
            .iter()
            .enumerate()
            .map(|(i, f)| UploadedFile {
                file_id: format!("file-{}", i + 1),
                filename: f.name.clone(),
                size: f.content.len() as u64,
            })
            .collect())
    }

    async fn start_processing(&self, request: &StartProcessingRequest) -> Result<String, ApiError> {
        self.record(format!("start:{}", request.files.len()));
        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(bad("/processing/start", 500));
        }
        let n = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("task-{}", n))
    }

    async fn get_status(&self, task_id: &str) -> Result<StatusResponse, ApiError> {
        self.record(format!("status:{}", task_id));
        let gate = self.status_gates.lock().unwrap().get(task_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.get_mut(task_id) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(code)) => Err(bad("/processing/status", code)),
            None => Ok(StatusResponse {
                status: TaskStatus::Processing,
                progress: 0,
                processed_files: 0,
                total_files: 1,
            }),
        }
    }

    async fn get_result(&self, task_id: &str) -> Result<ResultResponse, ApiError> {
        self.record(format!("result:{}", task_id));
        self.results
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| bad("/processing/result", 404))
    }

    async fn download_zip(&self, task_id: &str) -> Result<Vec<u8>, ApiError> {
        self.record(format!("zip:{}", task_id));
        Ok(b"PK\x03\x04".to_vec())
    }

    async fn get_dictionary(&self, kind: DictionaryKind) -> Result<Value, ApiError> {
        self.record(format!("get:{}", kind.as_path()));
        self.dictionaries
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .ok_or_else(|| bad("/dictionaries", 404))
    }

    async fn put_dictionary(&self, kind: DictionaryKind, document: &Value) -> Result<(), ApiError> {
        self.record(format!("put:{}", kind.as_path()));
        let delay = *self.put_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(bad("/dictionaries", 500));
        }
        self.puts.lock().unwrap().push((kind, document.clone()));
        Ok(())
    }

    async fn get_dictionary_stats(&self) -> Result<DictionaryStats, ApiError> {
        self.record("stats".to_string());
        Ok(DictionaryStats::default())
    }

    async fn get_historical_stats(&self) -> Result<HistoricalStats, ApiError> {
        self.record("historical".to_string());
        Ok(HistoricalStats::default())
    }
}
