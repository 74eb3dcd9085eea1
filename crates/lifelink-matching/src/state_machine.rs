//! 轮询状态机
//!
//! 两个状态：扫描中与离线。可用性开关在每次轮询时重新采样，而不是按边沿触发。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 轮询状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollState {
    Scanning, // 扫描中
    Offline,  // 离线
}

impl PollState {
    /// 根据当前可用性得到本次轮询的状态
    pub fn sample(available: bool) -> Self {
        if available {
            PollState::Scanning
        } else {
            PollState::Offline
        }
    }

    /// 状态栏文本
    pub fn status_text(&self) -> &'static str {
        match self {
            PollState::Scanning => "Available",
            PollState::Offline => "Offline",
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, PollState::Scanning)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// 可用性开关，克隆后共享同一状态
#[derive(Debug, Clone)]
pub struct Availability {
    available: Arc<AtomicBool>,
}

impl Availability {
    pub fn new(available: bool) -> Self {
        Self {
            available: Arc::new(AtomicBool::new(available)),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 切换开关，返回切换后的值
    pub fn toggle(&self) -> bool {
        !self.available.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self::new(true)
    }
}
