use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 默认配置文件名
const DEFAULT_CONFIG_FILE: &str = "analyzer.toml";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 帖子工作集文件（读取并原地回写）
    pub posts_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 限流配置 ---
    /// 滚动窗口内允许的最大调用次数
    pub quota: usize,
    /// 滚动窗口长度
    pub window: Duration,
    /// 窗口已满时额外等待的缓冲
    pub rate_limit_buffer: Duration,
    /// 相邻两个帖子之间的固定间隔
    pub min_delay: Duration,
    // --- 重试配置 ---
    /// 每个帖子的总尝试次数（含首次）
    pub max_retries: u32,
    /// 无法从错误信息中提取等待时间时的默认退避
    pub default_backoff: Duration,
    /// 服务商建议等待时间之上的缓冲
    pub backoff_buffer: Duration,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            posts_file: PathBuf::from("data/posts.json"),
            verbose_logging: false,
            quota: 10,
            window: Duration::from_secs(60),
            rate_limit_buffer: Duration::from_secs(1),
            min_delay: Duration::from_secs(7),
            max_retries: 3,
            default_backoff: Duration::from_secs(60),
            backoff_buffer: Duration::from_secs(2),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash-lite".to_string(),
            llm_temperature: 0.3,
        }
    }
}

/// 配置文件中的可选项，缺省的字段保留默认值
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    posts_file: Option<PathBuf>,
    verbose_logging: Option<bool>,
    quota: Option<usize>,
    window_secs: Option<f64>,
    min_delay_secs: Option<f64>,
    max_retries: Option<u32>,
    default_backoff_secs: Option<f64>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    llm_temperature: Option<f32>,
}

impl Config {
    /// 加载配置：默认值 → 配置文件 → 环境变量
    ///
    /// 配置文件路径取自 `ANALYZER_CONFIG`；未设置时若当前目录存在
    /// `analyzer.toml` 则读取它。
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        match std::env::var("ANALYZER_CONFIG") {
            Ok(path) => config.merge_file(Path::new(&path))?,
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config.merge_file(path)?;
                }
            }
        }

        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 合并 TOML 配置文件
    pub fn merge_file(&mut self, path: &Path) -> AppResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileInvalid {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.merge_toml(&content).map_err(|message| {
            ConfigError::FileInvalid {
                path: path.display().to_string(),
                message,
            }
            .into()
        })
    }

    fn merge_toml(&mut self, content: &str) -> Result<(), String> {
        let file: FileConfig = toml::from_str(content).map_err(|e| e.to_string())?;

        if let Some(v) = file.posts_file {
            self.posts_file = v;
        }
        if let Some(v) = file.verbose_logging {
            self.verbose_logging = v;
        }
        if let Some(v) = file.quota {
            self.quota = v;
        }
        if let Some(v) = file.window_secs {
            self.window = secs(v).ok_or("window_secs 必须是非负数")?;
        }
        if let Some(v) = file.min_delay_secs {
            self.min_delay = secs(v).ok_or("min_delay_secs 必须是非负数")?;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = file.default_backoff_secs {
            self.default_backoff = secs(v).ok_or("default_backoff_secs 必须是非负数")?;
        }
        if let Some(v) = file.llm_api_base_url {
            self.llm_api_base_url = v;
        }
        if let Some(v) = file.llm_model_name {
            self.llm_model_name = v;
        }
        if let Some(v) = file.llm_temperature {
            self.llm_temperature = v;
        }
        Ok(())
    }

    /// 用环境变量覆盖配置
    fn merge_env(&mut self) -> AppResult<()> {
        if let Ok(v) = std::env::var("POSTS_FILE") {
            self.posts_file = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<bool>("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = env_parse::<usize>("RATE_LIMIT_QUOTA", "usize")? {
            self.quota = v;
        }
        if let Some(v) = env_secs("RATE_LIMIT_WINDOW_SECS")? {
            self.window = v;
        }
        if let Some(v) = env_secs("MIN_DELAY_SECS")? {
            self.min_delay = v;
        }
        if let Some(v) = env_parse::<u32>("MAX_RETRIES", "u32")? {
            self.max_retries = v;
        }
        if let Some(v) = env_secs("DEFAULT_BACKOFF_SECS")? {
            self.default_backoff = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            self.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.quota == 0 {
            return Err(ConfigError::InvalidValue {
                field: "quota".to_string(),
                reason: "窗口配额必须大于 0".to_string(),
            }
            .into());
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries".to_string(),
                reason: "至少需要尝试 1 次".to_string(),
            }
            .into());
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "window".to_string(),
                reason: "窗口长度必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn secs(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value).ok()
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

fn env_secs(var_name: &str) -> AppResult<Option<Duration>> {
    match env_parse::<f64>(var_name, "秒数")? {
        Some(v) => secs(v).map(Some).ok_or_else(|| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value: v.to_string(),
                expected_type: "非负秒数".to_string(),
            }
            .into()
        }),
        None => Ok(None),
    }
}
