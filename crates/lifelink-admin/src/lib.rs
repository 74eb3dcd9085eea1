//! # LifeLink管理模块
//!
//! 提供配置加载、验证与保存功能

pub mod config;

pub use config::{
    ConfigManager, ConfigValidator, FallbackProfileConfig, LifelinkConfig, LoggingConfig,
    MatchingConfig, PollConfig, StorageBackend, StorageConfig,
};
