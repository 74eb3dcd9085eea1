//! 献血者会话档案解析

use lifelink_core::{DonorProfile, LifelinkError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::KeyValueStore;

/// 会话档案解析器
///
/// 会话缺失时退回到构造时注入的备用档案。
#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn KeyValueStore>,
    key: String,
    fallback: DonorProfile,
}

impl std::fmt::Debug for ProfileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileResolver")
            .field("key", &self.key)
            .field("fallback", &self.fallback.id)
            .finish()
    }
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, fallback: DonorProfile) -> Self {
        Self {
            store,
            key: key.into(),
            fallback,
        }
    }

    /// 解析当前会话档案
    pub async fn resolve(&self) -> Result<DonorProfile> {
        match self.store.read(&self.key).await? {
            None | Some(Value::Null) => {
                warn!(
                    "No donor session under {}, using fallback profile {}",
                    self.key, self.fallback.id
                );
                Ok(self.fallback.clone())
            }
            Some(value) => serde_json::from_value(value)
                .map_err(|e| LifelinkError::corrupt(&self.key, format!("invalid donor profile: {}", e))),
        }
    }

    /// 保存会话档案（登录），血型必须属于标准血型集合
    pub async fn sign_in(&self, profile: &DonorProfile) -> Result<()> {
        if !profile.blood_group.is_standard() {
            return Err(LifelinkError::Validation(format!(
                "unknown blood group {:?} for donor {}",
                profile.blood_group.as_str(),
                profile.id
            )));
        }

        let value = serde_json::to_value(profile)?;
        self.store.write(&self.key, value).await?;
        info!("Donor {} signed in", profile.id);
        Ok(())
    }

    /// 清除会话（登出）
    pub async fn logout(&self) -> Result<()> {
        self.store.remove(&self.key).await?;
        info!("Donor session cleared");
        Ok(())
    }
}
