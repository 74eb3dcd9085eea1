//! 请求集合仓库
//!
//! 整个请求集合以一个 JSON 数组保存在单个键下。读取时缺失或 `null` 视为空集合；
//! 结构损坏时返回 [`LifelinkError::CorruptRecord`]。

use lifelink_core::{Coordinate, DonationRequest, LifelinkError, Result, StoredRequest, DEFAULT_HOSPITAL};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::store::KeyValueStore;

/// 某一时刻读取到的请求集合
///
/// `raw` 保留读取时的原始值，作为 `commit` 的比较基准。
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    raw: Option<Value>,
    pub requests: Vec<StoredRequest>,
}

/// 请求集合仓库
#[derive(Clone)]
pub struct RequestRepository {
    store: Arc<dyn KeyValueStore>,
    key: String,
    default_hospital: Coordinate,
}

impl std::fmt::Debug for RequestRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRepository")
            .field("key", &self.key)
            .field("default_hospital", &self.default_hospital)
            .finish()
    }
}

impl RequestRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            default_hospital: DEFAULT_HOSPITAL,
        }
    }

    /// 设置缺少坐标时使用的默认医院位置
    pub fn with_default_hospital(mut self, default_hospital: Coordinate) -> Self {
        self.default_hospital = default_hospital;
        self
    }

    /// 读取请求集合及其原始值
    pub async fn snapshot(&self) -> Result<RequestSnapshot> {
        let raw = self.store.read(&self.key).await?;
        let requests = self.parse_collection(raw.as_ref())?;

        debug!("Loaded {} requests from {}", requests.len(), self.key);
        Ok(RequestSnapshot { raw, requests })
    }

    /// 读取并规范化全部请求，保持存储顺序
    pub async fn load_requests(&self) -> Result<Vec<DonationRequest>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot
            .requests
            .iter()
            .map(|r| r.normalize(self.default_hospital))
            .collect())
    }

    /// 仅当集合自 `snapshot` 读取后未被其他会话修改时写回，返回是否写入成功
    pub async fn commit(&self, snapshot: &RequestSnapshot, requests: &[StoredRequest]) -> Result<bool> {
        let value = serde_json::to_value(requests)?;
        self.store
            .compare_and_swap(&self.key, snapshot.raw.as_ref(), value)
            .await
    }

    fn parse_collection(&self, raw: Option<&Value>) -> Result<Vec<StoredRequest>> {
        let items = match raw {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(LifelinkError::corrupt(
                    &self.key,
                    format!("expected a list of requests, found {}", json_kind(other)),
                ))
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(StoredRequest::from_fields(fields.clone())),
                other => Err(LifelinkError::corrupt(
                    &self.key,
                    format!("request #{} is {}, not an object", index, json_kind(other)),
                )),
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
