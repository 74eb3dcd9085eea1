//! # LifeLink匹配模块
//!
//! 献血请求匹配引擎，包括：
//! - 资格过滤：按血型与距离筛选献血者可见的请求
//! - 接受动作：把献血者加入请求的接受名单并写回存储
//! - 轮询状态机：在线扫描与离线两种状态
//! - 提醒卡片：把筛选结果整理为展示用的视图模型
//! - 仪表盘引擎：串联以上组件的定时轮询循环

pub mod accept;
pub mod engine;
pub mod feed;
pub mod filter;
pub mod renderer;
pub mod state_machine;

// 重新导出主要类型
pub use accept::{accept_request, AcceptAction, AcceptOutcome};
pub use engine::{DashboardCommand, DashboardSettings, DonorDashboard, TickOutcome};
pub use feed::{AlertCard, FeedBuilder, FeedView};
pub use filter::{EligibilityFilter, MatchedRequest, DEFAULT_RADIUS_KM};
pub use renderer::{RecordingRenderer, RenderEvent, Renderer};
pub use state_machine::{Availability, PollState};
