//! 展示层接口

use async_trait::async_trait;
use lifelink_core::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::feed::FeedView;
use crate::state_machine::PollState;

/// 展示层
#[async_trait]
pub trait Renderer: Send + Sync {
    /// 每次轮询都会调用，显示当前在线状态
    async fn show_status(&self, state: PollState) -> Result<()>;

    /// 刷新提醒列表
    async fn render_feed(&self, view: &FeedView) -> Result<()>;

    /// 一次性提示
    async fn notify(&self, message: &str) -> Result<()>;
}

/// 展示事件
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Status(PollState),
    Feed(FeedView),
    Notice(String),
}

/// 记录所有展示事件的渲染器，克隆后共享同一事件列表
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().await.clone()
    }

    /// 最近一次渲染的视图
    pub async fn last_feed(&self) -> Option<FeedView> {
        self.events.lock().await.iter().rev().find_map(|event| match event {
            RenderEvent::Feed(view) => Some(view.clone()),
            _ => None,
        })
    }

    pub async fn notices(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Notice(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn show_status(&self, state: PollState) -> Result<()> {
        self.events.lock().await.push(RenderEvent::Status(state));
        Ok(())
    }

    async fn render_feed(&self, view: &FeedView) -> Result<()> {
        self.events.lock().await.push(RenderEvent::Feed(view.clone()));
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<()> {
        self.events
            .lock()
            .await
            .push(RenderEvent::Notice(message.to_string()));
        Ok(())
    }
}
