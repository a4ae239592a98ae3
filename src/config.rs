use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use tracing::warn;

use crate::error::ConfigError;

/// 客户端配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 远程处理服务地址（包含 /api 前缀）
    pub api_base_url: String,
    /// 单个请求超时（秒），为空表示不设置超时
    pub request_timeout_secs: Option<u64>,
    /// 轮询任务状态的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 轮询遇到传输错误时的重试次数，0 表示直接判定失败
    pub poll_max_retries: u32,
    /// 模拟进度的刷新间隔（毫秒）
    pub simulation_tick_ms: u64,
    /// 模拟进度随机数种子（仅用于可复现的测试）
    pub simulation_seed: Option<u64>,
    /// 字典自动保存的防抖时间（毫秒）
    pub autosave_debounce_ms: u64,
    /// 保存成功后恢复 idle 状态的时间（毫秒）
    pub saved_status_reset_ms: u64,
    /// 是否启用术语修正
    pub use_correction: bool,
    /// 是否启用保护词
    pub use_shielding: bool,
    /// 是否启用噪音清理
    pub use_noise_removal: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: None,
            poll_interval_ms: 1000,
            poll_max_retries: 0,
            simulation_tick_ms: 300,
            simulation_seed: None,
            autosave_debounce_ms: 1000,
            saved_status_reset_ms: 3000,
            use_correction: true,
            use_shielding: true,
            use_noise_removal: true,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("LINGUIST_API_BASE_URL").unwrap_or(default.api_base_url),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").or(default.request_timeout_secs),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(default.poll_interval_ms),
            poll_max_retries: env_parse("POLL_MAX_RETRIES").unwrap_or(default.poll_max_retries),
            simulation_tick_ms: env_parse("SIMULATION_TICK_MS").unwrap_or(default.simulation_tick_ms),
            simulation_seed: env_parse("SIMULATION_SEED").or(default.simulation_seed),
            autosave_debounce_ms: env_parse("AUTOSAVE_DEBOUNCE_MS").unwrap_or(default.autosave_debounce_ms),
            saved_status_reset_ms: env_parse("SAVED_STATUS_RESET_MS").unwrap_or(default.saved_status_reset_ms),
            use_correction: env_parse("USE_CORRECTION").unwrap_or(default.use_correction),
            use_shielding: env_parse("USE_SHIELDING").unwrap_or(default.use_shielding),
            use_noise_removal: env_parse("USE_NOISE_REMOVAL").unwrap_or(default.use_noise_removal),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 从 TOML 文件加载配置，未填写的字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config = Self::from_toml_str(&content).map_err(|e| ConfigError::FileParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 读取并严格校验一个数值型环境变量
    pub fn require_env<T: std::str::FromStr>(var_name: &str) -> std::result::Result<Option<T>, ConfigError> {
        match std::env::var(var_name) {
            Ok(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: std::any::type_name::<T>().to_string(),
                }),
            Err(_) => Ok(None),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn simulation_tick(&self) -> Duration {
        Duration::from_millis(self.simulation_tick_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn saved_status_reset(&self) -> Duration {
        Duration::from_millis(self.saved_status_reset_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// 解析失败时记录警告并回退到默认值
fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    match Config::require_env(var_name) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ {}，使用默认值", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.simulation_tick(), Duration::from_millis(300));
        assert_eq!(config.autosave_debounce(), Duration::from_secs(1));
        assert_eq!(config.saved_status_reset(), Duration::from_secs(3));
        assert_eq!(config.poll_max_retries, 0);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_toml_partial_overrides_keep_defaults() {
        let config = Config::from_toml_str(
            r#"
            api_base_url = "http://10.0.0.2:9000/api"
            poll_interval_ms = 250
            use_noise_removal = false
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "http://10.0.0.2:9000/api");
        assert_eq!(config.poll_interval_ms, 250);
        assert!(!config.use_noise_removal);
        assert!(config.use_correction);
        assert_eq!(config.autosave_debounce_ms, 1000);
    }

    #[test]
    fn test_require_env_rejects_garbage() {
        std::env::set_var("LINGUIST_TEST_BAD_NUMBER", "abc");
        let result = Config::require_env::<u64>("LINGUIST_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(ConfigError::EnvVarParseFailed { .. })));

        let missing = Config::require_env::<u64>("LINGUIST_TEST_SURELY_MISSING").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_from_env_falls_back_on_unparsable_value() {
        std::env::set_var("SIMULATION_TICK_MS", "fast");
        let config = Config::from_env();
        std::env::remove_var("SIMULATION_TICK_MS");

        assert_eq!(config.simulation_tick_ms, 300);
    }
}
