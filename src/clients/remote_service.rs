/// 远程处理服务接口
///
/// 核心逻辑只依赖这个 trait，HTTP 实现见 [`crate::clients::HttpRemoteClient`]
use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{
    DictionaryKind, DictionaryStats, HistoricalStats, ResultResponse, StartProcessingRequest,
    StatusResponse, UploadedFile,
};

/// 待上传的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait RemoteService: Send + Sync + 'static {
    /// 上传文件，返回顺序与输入一致
    async fn upload_files(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError>;

    /// 启动处理，返回任务ID
    async fn start_processing(&self, request: &StartProcessingRequest) -> Result<String, ApiError>;

    async fn get_status(&self, task_id: &str) -> Result<StatusResponse, ApiError>;

    async fn get_result(&self, task_id: &str) -> Result<ResultResponse, ApiError>;

    async fn download_zip(&self, task_id: &str) -> Result<Vec<u8>, ApiError>;

    async fn get_dictionary(&self, kind: DictionaryKind) -> Result<Value, ApiError>;

    async fn put_dictionary(&self, kind: DictionaryKind, document: &Value) -> Result<(), ApiError>;

    async fn get_dictionary_stats(&self) -> Result<DictionaryStats, ApiError>;

    async fn get_historical_stats(&self) -> Result<HistoricalStats, ApiError>;
}
