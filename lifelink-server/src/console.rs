//! 终端渲染器与终端指令解析

use async_trait::async_trait;
use lifelink_core::{DonorProfile, Result};
use lifelink_matching::{AlertCard, DashboardCommand, FeedView, PollState, Renderer};
use tokio::sync::Mutex;

/// 终端输入的一行指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// 转发给仪表盘的指令
    Dashboard(DashboardCommand),
    /// 设置在线状态后刷新
    SetAvailable(bool),
    /// 切换在线状态后刷新
    ToggleAvailability,
    /// 空行
    Empty,
    /// 无法识别的输入
    Unknown(String),
}

/// 解析一行终端输入
pub fn parse_input(line: &str) -> ConsoleInput {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => ConsoleInput::Empty,
        (Some("accept"), Some(id), None) => {
            ConsoleInput::Dashboard(DashboardCommand::Accept(id.to_string()))
        }
        (Some("refresh"), None, _) => ConsoleInput::Dashboard(DashboardCommand::Refresh),
        (Some("online"), None, _) => ConsoleInput::SetAvailable(true),
        (Some("offline"), None, _) => ConsoleInput::SetAvailable(false),
        (Some("toggle"), None, _) => ConsoleInput::ToggleAvailability,
        _ => ConsoleInput::Unknown(line.trim().to_string()),
    }
}

/// 把仪表盘输出到标准输出；状态与卡片只在发生变化时重新打印
#[derive(Debug)]
pub struct ConsoleRenderer {
    profile: DonorProfile,
    last_state: Mutex<Option<PollState>>,
    last_cards: Mutex<Option<Vec<AlertCard>>>,
}

impl ConsoleRenderer {
    pub fn new(profile: DonorProfile) -> Self {
        Self {
            profile,
            last_state: Mutex::new(None),
            last_cards: Mutex::new(None),
        }
    }

    /// 打印献血者信息头
    pub fn print_header(&self) {
        let initial = self.profile.initial().unwrap_or('?');
        println!(
            "[{}] {} | {} Donor | ID {}",
            initial, self.profile.name, self.profile.blood_group, self.profile.id
        );
    }

    fn print_card(&self, card: &AlertCard) {
        match card {
            AlertCard::Accepted { hospital_name, .. } => {
                println!("  [ACCEPTED] {}", hospital_name);
                println!("    Navigation Active • {} km", card.distance_display());
                if let Some(instructions) = card.instructions() {
                    println!("    {}", instructions);
                }
                println!("    You are En Route");
            }
            AlertCard::Incoming {
                request_id,
                hospital_name,
                urgency_hours,
                component,
                blood_group,
                ..
            } => {
                let urgency = urgency_hours
                    .map(|h| format!("{}hr Window", h))
                    .unwrap_or_else(|| "Window unknown".to_string());
                println!("  [URGENT] {}", hospital_name);
                println!("    {} km away • {}", card.distance_display(), urgency);
                println!(
                    "    Patient Critical | {} | {}",
                    component.as_deref().unwrap_or("-"),
                    blood_group.as_ref().map(|g| g.as_str()).unwrap_or("")
                );
                println!("    Type `accept {}` to Accept & Go", request_id);
            }
        }
    }
}

#[async_trait]
impl Renderer for ConsoleRenderer {
    async fn show_status(&self, state: PollState) -> Result<()> {
        let mut last = self.last_state.lock().await;
        if *last != Some(state) {
            println!("Status: {}", state.status_text());
            *last = Some(state);
        }
        Ok(())
    }

    async fn render_feed(&self, view: &FeedView) -> Result<()> {
        let mut last = self.last_cards.lock().await;
        if last.as_deref() == Some(view.cards()) {
            return Ok(());
        }

        match view.badge() {
            None => println!("Scanning for nearby requests..."),
            Some(badge) => {
                println!("{} active alert(s) at {}", badge, view.refreshed_at().format("%H:%M:%S"));
                for card in view.cards() {
                    self.print_card(card);
                }
            }
        }

        *last = Some(view.cards().to_vec());
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<()> {
        println!("{}", message);
        Ok(())
    }
}
