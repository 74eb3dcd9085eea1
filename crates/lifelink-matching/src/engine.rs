//! 仪表盘引擎
//!
//! 定时轮询的协调者：每次轮询重新采样可用性开关、重新读取存储、重新过滤并刷新展示。
//! 轮询与接受动作都需要 `&mut self`，同一实例内二者不会交错执行；
//! 多个实例共享同一存储时彼此之间没有锁。

use lifelink_core::{DonorProfile, Result};
use lifelink_storage::RequestRepository;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    accept::{AcceptAction, AcceptOutcome},
    feed::FeedBuilder,
    filter::{EligibilityFilter, MatchedRequest, DEFAULT_RADIUS_KM},
    renderer::Renderer,
    state_machine::{Availability, PollState},
};

/// 接受成功后的提示
pub const ACCEPT_NOTICE: &str = "Thank you! The hospital has been notified of your arrival.";

/// 仪表盘设置
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 匹配半径（公里）
    pub radius_km: f64,
    /// 缺少医院名称时展示的名称
    pub default_hospital_name: String,
    /// 接受动作遇到并发写入时的最大尝试次数
    pub max_accept_attempts: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            radius_km: DEFAULT_RADIUS_KM,
            default_hospital_name: lifelink_core::DEFAULT_HOSPITAL_NAME.to_string(),
            max_accept_attempts: 3,
        }
    }
}

/// 轮询循环外部发来的指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Accept(String),
    Refresh,
}

/// 单次轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 离线，跳过扫描
    Offline,
    /// 已刷新，附带可见请求数
    Refreshed { visible: usize },
}

/// 献血者仪表盘
pub struct DonorDashboard {
    instance_id: Uuid,
    profile: DonorProfile,
    repository: RequestRepository,
    filter: EligibilityFilter,
    feed_builder: FeedBuilder,
    accept_action: AcceptAction,
    renderer: Arc<dyn Renderer>,
    availability: Availability,
    poll_interval: Duration,
    state: Option<PollState>,
}

impl std::fmt::Debug for DonorDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DonorDashboard")
            .field("instance_id", &self.instance_id)
            .field("donor", &self.profile.id)
            .field("repository", &self.repository)
            .field("filter", &self.filter)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state)
            .finish()
    }
}

impl DonorDashboard {
    /// 创建新的仪表盘实例
    pub fn new(
        profile: DonorProfile,
        repository: RequestRepository,
        renderer: Arc<dyn Renderer>,
        availability: Availability,
        settings: DashboardSettings,
    ) -> Self {
        let accept_action = AcceptAction::new(repository.clone(), settings.max_accept_attempts);

        Self {
            instance_id: Uuid::new_v4(),
            profile,
            repository,
            filter: EligibilityFilter::new(settings.radius_km),
            feed_builder: FeedBuilder::new(settings.default_hospital_name),
            accept_action,
            renderer,
            availability,
            poll_interval: settings.poll_interval,
            state: None,
        }
    }

    /// 最近一次轮询的状态，尚未轮询时为 `None`
    pub fn state(&self) -> Option<PollState> {
        self.state
    }

    /// 读取存储并过滤出当前献血者可见的请求
    pub async fn visible_requests(&self) -> Result<Vec<MatchedRequest>> {
        let requests = self.repository.load_requests().await?;
        Ok(self.filter.filter(&self.profile, &requests))
    }

    /// 执行一次轮询
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let state = PollState::sample(self.availability.is_available());
        if self.state != Some(state) {
            info!(
                "Dashboard {} for donor {} is now {}",
                self.instance_id, self.profile.id, state
            );
            self.state = Some(state);
        }

        self.renderer.show_status(state).await?;

        if !state.is_scanning() {
            debug!("Donor {} offline, skipping scan", self.profile.id);
            return Ok(TickOutcome::Offline);
        }

        let matches = self.visible_requests().await?;
        let view = self.feed_builder.build(&self.profile, &matches);
        self.renderer.render_feed(&view).await?;

        Ok(TickOutcome::Refreshed {
            visible: matches.len(),
        })
    }

    /// 接受请求；找到请求后立即刷新展示并提示
    ///
    /// 写入成功后刷新或提示失败只记录日志，不影响返回结果。
    pub async fn accept(&mut self, request_id: &str) -> Result<AcceptOutcome> {
        let outcome = self
            .accept_action
            .execute(request_id, &self.profile.id)
            .await?;

        if !outcome.is_found() {
            warn!(
                "Donor {} tried to accept unknown request {}",
                self.profile.id, request_id
            );
            return Ok(outcome);
        }

        if let Err(e) = self.tick().await {
            warn!("Request {} accepted but refresh failed: {}", request_id, e);
        }
        if let Err(e) = self.renderer.notify(ACCEPT_NOTICE).await {
            warn!("Request {} accepted but notice failed: {}", request_id, e);
        }
        Ok(outcome)
    }

    /// 处理外部指令
    pub async fn handle(&mut self, command: DashboardCommand) -> Result<()> {
        match command {
            DashboardCommand::Accept(request_id) => {
                self.accept(&request_id).await?;
            }
            DashboardCommand::Refresh => {
                self.tick().await?;
            }
        }
        Ok(())
    }

    /// 运行轮询循环，直到 `shutdown` 完成
    ///
    /// 单次轮询或指令失败只记录日志，循环继续。
    pub async fn run<F>(&mut self, mut commands: mpsc::Receiver<DashboardCommand>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting poll loop {} for donor {} every {:?}",
            self.instance_id, self.profile.id, self.poll_interval
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Poll loop {} stopped", self.instance_id);
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Poll tick failed: {}", e);
                    }
                }
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Err(e) = self.handle(command).await {
                            error!("Dashboard command failed: {}", e);
                        }
                    }
                    None => {
                        debug!("Command channel closed, continuing to poll");
                        commands_open = false;
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{AlertCard, FeedView};
    use crate::renderer::{RecordingRenderer, RenderEvent};
    use async_trait::async_trait;
    use lifelink_core::{BloodGroup, LifelinkError};
    use lifelink_storage::{KeyValueStore, MemoryStore, DEFAULT_REQUESTS_KEY};
    use serde_json::json;

    fn dashboard(store: &MemoryStore, renderer: &RecordingRenderer, availability: Availability) -> DonorDashboard {
        let repository = RequestRepository::new(Arc::new(store.clone()), DEFAULT_REQUESTS_KEY);
        DonorDashboard::new(
            DonorProfile::default(),
            repository,
            Arc::new(renderer.clone()),
            availability,
            DashboardSettings {
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            },
        )
    }

    async fn seed(store: &MemoryStore) {
        store
            .write(
                DEFAULT_REQUESTS_KEY,
                json!([
                    {"id": "r1", "bloodGroup": "A+", "hospitalLat": 12.965, "hospitalLon": 77.651,
                     "hospitalName": "Manipal Hospital", "urgency": 4, "component": "Whole Blood"},
                    {"id": "r2", "group": "O-", "hospitalLat": 40, "hospitalLon": 40}
                ]),
            )
            .await
            .unwrap();
    }

    /// 展示层始终失败的渲染器
    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn show_status(&self, _state: PollState) -> Result<()> {
            Err(LifelinkError::Storage("display unavailable".to_string()))
        }

        async fn render_feed(&self, _view: &FeedView) -> Result<()> {
            Err(LifelinkError::Storage("display unavailable".to_string()))
        }

        async fn notify(&self, _message: &str) -> Result<()> {
            Err(LifelinkError::Storage("display unavailable".to_string()))
        }
    }

    fn card_ids(view: &FeedView) -> Vec<(String, bool)> {
        view.cards()
            .iter()
            .map(|c| (c.request_id().to_string(), c.is_accepted()))
            .collect()
    }

    #[tokio::test]
    async fn test_accept_scenario_end_to_end() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        seed(&store).await;
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        // 初始只有 r1 可见
        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Refreshed { visible: 1 });
        let view = renderer.last_feed().await.unwrap();
        assert_eq!(card_ids(&view), vec![("r1".to_string(), false)]);

        // 接受后写回并刷新
        assert_eq!(dashboard.accept("r1").await.unwrap(), AcceptOutcome::Accepted);
        let stored = store.read(DEFAULT_REQUESTS_KEY).await.unwrap().unwrap();
        assert_eq!(stored[0]["acceptedDonors"], json!(["D-101"]));
        assert_eq!(stored[1].get("acceptedDonors"), None);

        let view = renderer.last_feed().await.unwrap();
        assert_eq!(card_ids(&view), vec![("r1".to_string(), true)]);
        assert_eq!(renderer.notices().await, vec![ACCEPT_NOTICE.to_string()]);

        // 医院端把血型改为 B+，已接受的请求仍然可见
        let mut edited = stored.clone();
        edited[0]["bloodGroup"] = json!("B+");
        store.write(DEFAULT_REQUESTS_KEY, edited).await.unwrap();

        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Refreshed { visible: 1 });
        let view = renderer.last_feed().await.unwrap();
        assert_eq!(card_ids(&view), vec![("r1".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_legacy_group_drives_matching_and_display() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        store
            .write(
                DEFAULT_REQUESTS_KEY,
                json!([
                    {"id": "r3", "group": "A+", "hospitalLat": 12.97, "hospitalLon": 77.65,
                     "urgency": 6, "component": "Plasma"}
                ]),
            )
            .await
            .unwrap();
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Refreshed { visible: 1 });
        let view = renderer.last_feed().await.unwrap();
        match &view.cards()[0] {
            AlertCard::Incoming {
                request_id,
                blood_group,
                ..
            } => {
                assert_eq!(request_id, "r3");
                assert_eq!(blood_group.as_ref(), Some(&BloodGroup::new("A+")));
            }
            other => panic!("unexpected card {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accept_persists_even_if_display_fails() {
        let store = MemoryStore::new();
        seed(&store).await;
        let repository = RequestRepository::new(Arc::new(store.clone()), DEFAULT_REQUESTS_KEY);
        let mut dashboard = DonorDashboard::new(
            DonorProfile::default(),
            repository,
            Arc::new(BrokenRenderer),
            Availability::default(),
            DashboardSettings::default(),
        );

        assert_eq!(dashboard.accept("r1").await.unwrap(), AcceptOutcome::Accepted);
        let stored = store.read(DEFAULT_REQUESTS_KEY).await.unwrap().unwrap();
        assert_eq!(stored[0]["acceptedDonors"], json!(["D-101"]));
    }

    #[tokio::test]
    async fn test_accept_twice_keeps_single_entry() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        seed(&store).await;
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        dashboard.accept("r1").await.unwrap();
        assert_eq!(dashboard.accept("r1").await.unwrap(), AcceptOutcome::AlreadyAccepted);

        let stored = store.read(DEFAULT_REQUESTS_KEY).await.unwrap().unwrap();
        assert_eq!(stored[0]["acceptedDonors"], json!(["D-101"]));
    }

    #[tokio::test]
    async fn test_accept_unknown_request_is_silent() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        seed(&store).await;
        let before = store.read(DEFAULT_REQUESTS_KEY).await.unwrap();
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        assert_eq!(dashboard.accept("r9").await.unwrap(), AcceptOutcome::NotFound);
        assert_eq!(store.read(DEFAULT_REQUESTS_KEY).await.unwrap(), before);
        assert!(renderer.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_offline_tick_short_circuits() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        // 损坏的集合：若离线时仍读取存储就会报错
        store.write(DEFAULT_REQUESTS_KEY, json!("garbage")).await.unwrap();

        let availability = Availability::new(false);
        let mut dashboard = dashboard(&store, &renderer, availability.clone());

        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Offline);
        assert_eq!(dashboard.state(), Some(PollState::Offline));
        assert_eq!(renderer.events().await, vec![RenderEvent::Status(PollState::Offline)]);

        // 每次轮询都重新采样开关
        availability.set_available(true);
        seed(&store).await;
        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Refreshed { visible: 1 });
        assert_eq!(dashboard.state(), Some(PollState::Scanning));
    }

    #[tokio::test]
    async fn test_empty_store_renders_radar() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        assert_eq!(dashboard.tick().await.unwrap(), TickOutcome::Refreshed { visible: 0 });
        assert!(matches!(renderer.last_feed().await, Some(FeedView::Radar { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        store.write(DEFAULT_REQUESTS_KEY, json!({"not": "a list"})).await.unwrap();
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        assert!(matches!(
            dashboard.tick().await,
            Err(LifelinkError::CorruptRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_processes_commands_until_shutdown() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        seed(&store).await;
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        let (tx, rx) = mpsc::channel(4);
        tx.send(DashboardCommand::Accept("r1".to_string())).await.unwrap();
        drop(tx);

        dashboard
            .run(rx, tokio::time::sleep(Duration::from_millis(60)))
            .await
            .unwrap();

        let stored = store.read(DEFAULT_REQUESTS_KEY).await.unwrap().unwrap();
        assert_eq!(stored[0]["acceptedDonors"], json!(["D-101"]));

        let feeds = renderer
            .events()
            .await
            .into_iter()
            .filter(|e| matches!(e, RenderEvent::Feed(_)))
            .count();
        assert!(feeds >= 2, "expected repeated refreshes, got {}", feeds);
    }

    #[tokio::test]
    async fn test_run_survives_failing_ticks() {
        let store = MemoryStore::new();
        let renderer = RecordingRenderer::new();
        store.write(DEFAULT_REQUESTS_KEY, json!(42)).await.unwrap();
        let mut dashboard = dashboard(&store, &renderer, Availability::default());

        let (_tx, rx) = mpsc::channel(1);
        dashboard
            .run(rx, tokio::time::sleep(Duration::from_millis(35)))
            .await
            .unwrap();

        let statuses = renderer
            .events()
            .await
            .into_iter()
            .filter(|e| matches!(e, RenderEvent::Status(_)))
            .count();
        assert!(statuses >= 2);
    }
}
