//! 键值存储
//!
//! 多个献血者会话共享同一存储。`compare_and_swap` 为整集合写回提供乐观并发控制。

use async_trait::async_trait;
use lifelink_core::{LifelinkError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// 共享键值存储
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键对应的值，不存在时返回 `None`
    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// 写入整个值
    async fn write(&self, key: &str, value: Value) -> Result<()>;

    /// 删除键
    async fn remove(&self, key: &str) -> Result<()>;

    /// 当前值等于 `expected` 时写入 `new`，返回是否写入成功
    ///
    /// `expected` 为 `None` 表示期望键不存在。
    async fn compare_and_swap(&self, key: &str, expected: Option<&Value>, new: Value)
        -> Result<bool>;
}

/// 内存存储
///
/// 克隆得到的实例共享同一份数据，用于模拟多个会话访问同一存储。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定键值对预置存储
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries.into_iter().collect())),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.get(key) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), new);
        Ok(true)
    }
}

/// 文件存储，每个键对应目录下的一个 JSON 文件
///
/// 写入先落到临时文件再重命名。`compare_and_swap` 只在本进程内串行化，
/// 跨进程访问同一目录时仍可能丢失更新。
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
    swap_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            swap_lock: Arc::new(Mutex::new(())),
        }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');

        if !valid {
            return Err(LifelinkError::Storage(format!("Invalid store key: {:?}", key)));
        }

        Ok(self.base_path.join(format!("{}.json", key)))
    }

    async fn read_path(&self, key: &str, path: &Path) -> Result<Option<Value>> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| LifelinkError::corrupt(key, format!("invalid JSON: {}", e)))
    }

    async fn write_path(&self, path: &Path, value: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let tmp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let data = serde_json::to_vec(value)?;
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        debug!("Wrote store file {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key)?;
        self.read_path(key, &path).await
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        let path = self.key_path(key)?;
        self.write_path(&path, &value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool> {
        let path = self.key_path(key)?;
        let _guard = self.swap_lock.lock().await;

        let current = self.read_path(key, &path).await?;
        if current.as_ref() != expected {
            return Ok(false);
        }

        self.write_path(&path, &new).await?;
        Ok(true)
    }
}
