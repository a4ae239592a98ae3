/// 远程处理服务的 HTTP 客户端
///
/// 封装所有与处理服务 REST 接口的交互
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::remote_service::{LocalFile, RemoteService};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::api::{StartProcessingResponse, UploadResponse};
use crate::models::{
    DictionaryKind, DictionaryStats, HistoricalStats, ResultResponse, StartProcessingRequest,
    StatusResponse, UploadedFile,
};

/// 处理服务 HTTP 客户端
#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
}

impl HttpRemoteClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::request_failed("<client>", e))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 发送请求并检查状态码
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!("请求 {}", endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::request_failed(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string));
        warn!("API返回错误 {} ({}): {:?}", status, endpoint, detail);

        Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail,
        })
    }

    /// 发送请求并解析 JSON 响应
    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(endpoint, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::request_failed(endpoint, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::json_parse_failed(endpoint, e))
    }
}

#[async_trait]
impl RemoteService for HttpRemoteClient {
    async fn upload_files(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
        let endpoint = "/files/upload";
        let form = files.iter().fold(Form::new(), |form, file| {
            form.part(
                "files",
                Part::bytes(file.content.clone()).file_name(file.name.clone()),
            )
        });

        let response: UploadResponse = self
            .send_json(endpoint, self.client.post(self.url(endpoint)).multipart(form))
            .await?;
        Ok(response.files)
    }

    async fn start_processing(&self, request: &StartProcessingRequest) -> Result<String, ApiError> {
        let endpoint = "/processing/start";
        let response: StartProcessingResponse = self
            .send_json(endpoint, self.client.post(self.url(endpoint)).json(request))
            .await?;
        Ok(response.task_id)
    }

    async fn get_status(&self, task_id: &str) -> Result<StatusResponse, ApiError> {
        let endpoint = format!("/processing/status/{}", task_id);
        self.send_json(&endpoint, self.client.get(self.url(&endpoint)))
            .await
    }

    async fn get_result(&self, task_id: &str) -> Result<ResultResponse, ApiError> {
        let endpoint = format!("/processing/result/{}", task_id);
        self.send_json(&endpoint, self.client.get(self.url(&endpoint)))
            .await
    }

    async fn download_zip(&self, task_id: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = format!("/processing/download-zip/{}", task_id);
        let response = self
            .send(&endpoint, self.client.get(self.url(&endpoint)))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::request_failed(endpoint.as_str(), e))?;
        Ok(bytes.to_vec())
    }

    async fn get_dictionary(&self, kind: DictionaryKind) -> Result<Value, ApiError> {
        let endpoint = format!("/dictionaries/{}", kind.as_path());
        self.send_json(&endpoint, self.client.get(self.url(&endpoint)))
            .await
    }

    async fn put_dictionary(&self, kind: DictionaryKind, document: &Value) -> Result<(), ApiError> {
        let endpoint = format!("/dictionaries/{}", kind.as_path());
        self.send(&endpoint, self.client.put(self.url(&endpoint)).json(document))
            .await?;
        Ok(())
    }

    async fn get_dictionary_stats(&self) -> Result<DictionaryStats, ApiError> {
        let endpoint = "/dictionaries/stats";
        self.send_json(endpoint, self.client.get(self.url(endpoint)))
            .await
    }

    async fn get_historical_stats(&self) -> Result<HistoricalStats, ApiError> {
        let endpoint = "/dictionaries/historical-stats";
        self.send_json(endpoint, self.client.get(self.url(endpoint)))
            .await
    }
}
