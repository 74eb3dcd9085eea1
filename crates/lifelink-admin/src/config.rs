//! 配置管理
//!
//! 配置按以下顺序叠加：内置默认值、TOML 配置文件、`LIFELINK__` 前缀的环境变量
//! （例如 `LIFELINK__POLL__INTERVAL_MS=5000`）。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use lifelink_core::{BloodGroup, Coordinate, DonorProfile, DEFAULT_HOSPITAL, DEFAULT_HOSPITAL_NAME};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<LifelinkConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// LifeLink完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LifelinkConfig {
    /// 轮询配置
    pub poll: PollConfig,
    /// 匹配配置
    pub matching: MatchingConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 会话缺失时使用的献血者档案
    pub fallback_profile: FallbackProfileConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 轮询配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// 轮询间隔（毫秒）
    pub interval_ms: u64,
    /// 启动时是否在线
    pub start_available: bool,
}

/// 匹配配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// 匹配半径（公里）
    pub radius_km: f64,
    /// 请求缺少坐标时使用的医院位置
    pub default_hospital: Coordinate,
    /// 请求缺少名称时展示的医院名称
    pub default_hospital_name: String,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// 文件存储目录
    pub data_dir: String,
    /// 请求集合的键
    pub requests_key: String,
    /// 会话档案的键
    pub session_key: String,
    /// 接受动作的最大尝试次数
    pub max_accept_attempts: u32,
}

/// 备用献血者档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackProfileConfig {
    pub id: String,
    pub name: String,
    pub blood_group: String,
    pub lat: f64,
    pub lng: f64,
}

impl FallbackProfileConfig {
    pub fn to_profile(&self) -> DonorProfile {
        DonorProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            blood_group: BloodGroup::new(self.blood_group.clone()),
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl Default for FallbackProfileConfig {
    fn default() -> Self {
        let profile = DonorProfile::default();
        Self {
            id: profile.id,
            name: profile.name,
            blood_group: profile.blood_group.as_str().to_string(),
            lat: profile.lat,
            lng: profile.lng,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（EnvFilter 语法）
    pub level: String,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&LifelinkConfig) -> Result<()>,
}

impl ConfigManager {
    /// 加载配置；`config_path` 为空时只使用默认值与环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 以给定配置创建，不读取任何外部来源
    pub fn from_config(config: LifelinkConfig) -> Result<Self> {
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: None,
            validator,
        })
    }

    fn load_config(config_path: Option<&str>) -> Result<LifelinkConfig> {
        let defaults = Config::try_from(&LifelinkConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("LIFELINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: LifelinkConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> LifelinkConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置
    pub async fn update_config(&self, new_config: LifelinkConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub async fn save_config(&self, path: &str) -> Result<()> {
        let config = self.config.read().await;
        let config_str =
            toml::to_string_pretty(&*config).context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config).await
    }

    /// 按点分路径读取配置值，例如 `matching.radius_km`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let mut current = serde_json::to_value(&*config)
            .context("Failed to serialize config to JSON")?;

        for part in path.split('.') {
            current = match current {
                serde_json::Value::Object(mut map) => map
                    .remove(part)
                    .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", path))?,
                _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
            };
        }

        serde_json::from_value(current).context("Failed to deserialize configuration value")
    }
}

impl LifelinkConfig {
    /// 轮询间隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "poll.interval_ms",
                validator: |config| {
                    if config.poll.interval_ms == 0 {
                        Err(anyhow::anyhow!("Poll interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "matching.radius_km",
                validator: |config| {
                    let radius = config.matching.radius_km;
                    if !radius.is_finite() || radius < 0.0 {
                        Err(anyhow::anyhow!("Radius must be a finite non-negative number, got {}", radius))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "storage.max_accept_attempts",
                validator: |config| {
                    if config.storage.max_accept_attempts == 0 {
                        Err(anyhow::anyhow!("Accept attempts cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "storage.keys",
                validator: |config| {
                    let storage = &config.storage;
                    if storage.requests_key.is_empty() || storage.session_key.is_empty() {
                        Err(anyhow::anyhow!("Store keys cannot be empty"))
                    } else if storage.requests_key == storage.session_key {
                        Err(anyhow::anyhow!("Requests and session must use different keys"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "fallback_profile.id",
                validator: |config| {
                    if config.fallback_profile.id.is_empty() {
                        Err(anyhow::anyhow!("Fallback profile id cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &LifelinkConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            start_available: true,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            radius_km: 10.0,
            default_hospital: DEFAULT_HOSPITAL,
            default_hospital_name: DEFAULT_HOSPITAL_NAME.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: "./data/lifelink".to_string(),
            requests_key: "lifelink_requests".to_string(),
            session_key: "lifelink_donor_session".to_string(),
            max_accept_attempts: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
