use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误（未修改任何状态，未发出任何请求）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 任务提交错误
    #[error("提交错误: {0}")]
    Submission(#[from] SubmissionError),
    /// 轮询错误
    #[error("轮询错误: {0}")]
    Poll(#[from] PollError),
    /// 字典保存错误
    #[error("保存错误: {0}")]
    Save(#[from] SaveError),
    /// 文件上传错误
    #[error("上传错误: {0}")]
    Upload(#[from] UploadError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 任务状态错误
    #[error("任务错误: {0}")]
    Task(#[from] TaskError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 原文或修正为空
    #[error("原文和修正为不能为空")]
    EmptyTerm,
    /// 保护词为空
    #[error("保护词不能为空")]
    EmptyProtectedWord,
    /// 噪音规则不是合法的正则表达式
    #[error("噪音规则无效 ({pattern}): {reason}")]
    InvalidNoisePattern { pattern: String, reason: String },
    /// 下标越界
    #[error("索引 {index} 超出范围 [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },
    /// 没有选择文件
    #[error("请先选择要上传的文件")]
    NoFiles,
    /// 不支持的文件类型
    #[error("不支持的文件类型: {filename}")]
    UnsupportedFileType { filename: String },
}

/// 任务提交错误
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// 文件列表为空
    #[error("请先上传文件")]
    EmptyFileList,
    /// 文件尚未上传（没有 file_id）
    #[error("文件尚未上传: {filename}")]
    MissingFileId { filename: String },
    /// 启动处理请求失败
    #[error("启动处理失败: {source}")]
    StartFailed {
        #[source]
        source: ApiError,
    },
}

/// 轮询错误
#[derive(Debug, Error)]
pub enum PollError {
    /// 查询状态失败
    #[error("查询任务 {task_id} 状态失败: {source}")]
    StatusFailed {
        task_id: String,
        #[source]
        source: ApiError,
    },
    /// 获取结果失败
    #[error("获取任务 {task_id} 结果失败: {source}")]
    ResultFailed {
        task_id: String,
        #[source]
        source: ApiError,
    },
    /// 服务端报告任务失败
    #[error("任务 {task_id} 处理失败")]
    TaskFailed { task_id: String },
}

/// 字典保存错误
#[derive(Debug, Error)]
pub enum SaveError {
    /// 序列化字典失败
    #[error("序列化{kind}失败: {source}")]
    Serialize {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    /// 远程写入失败
    #[error("保存{kind}失败: {source}")]
    WriteFailed {
        kind: String,
        #[source]
        source: ApiError,
    },
}

/// 文件上传错误
#[derive(Debug, Error)]
pub enum UploadError {
    /// 上传请求失败
    #[error("文件上传失败: {source}")]
    RequestFailed {
        #[source]
        source: ApiError,
    },
    /// 返回的文件数量与上传数量不一致
    #[error("上传返回 {returned} 个文件ID，期望 {expected} 个")]
    CountMismatch { expected: usize, returned: usize },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: BoxError,
    },
    /// 返回非 2xx 状态码
    #[error("API返回错误响应 ({endpoint}): status={status}, detail={detail:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: BoxError,
    },
}

/// 任务状态错误
#[derive(Debug, Error)]
pub enum TaskError {
    /// 本次提交已被新的提交取代
    #[error("任务提交已被新的提交取代 (generation {generation})")]
    Superseded { generation: u64 },
    /// 任务尚未完成
    #[error("任务尚未完成")]
    NotCompleted,
    /// 没有活动中的任务
    #[error("当前没有任务")]
    NoTask,
    /// 启动请求失败，任务从未创建
    #[error("启动处理失败: {message}")]
    StartFailed { message: String },
    /// 提交在等待启动响应时被调用方取消
    #[error("任务提交已取消 (generation {generation})")]
    Cancelled { generation: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: BoxError,
    },
}

// ========== 便捷构造函数 ==========

impl ApiError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 创建 JSON 解析失败错误
    pub fn json_parse_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::JsonParseFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 是否为传输层错误（区别于服务端明确返回的错误）
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::RequestFailed { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::json_parse_failed("<local>", err)
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
