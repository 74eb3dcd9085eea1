//! 提醒卡片
//!
//! 把过滤结果整理为展示用的视图模型：无请求时显示雷达搜索状态；
//! 有请求时显示角标数量与卡片，已接受的请求显示为“前往中”。

use chrono::{DateTime, Utc};
use lifelink_core::{utils::format_distance, BloodGroup, DonorProfile, DEFAULT_HOSPITAL_NAME};
use serde::{Deserialize, Serialize};

use crate::filter::MatchedRequest;

/// 提醒卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertCard {
    /// 已接受，前往医院途中
    Accepted {
        request_id: String,
        hospital_name: String,
        distance_km: f64,
        donor_id: String,
    },
    /// 新的求助提醒
    Incoming {
        request_id: String,
        hospital_name: String,
        distance_km: f64,
        urgency_hours: Option<u32>,
        component: Option<String>,
        blood_group: Option<BloodGroup>,
    },
}

impl AlertCard {
    pub fn request_id(&self) -> &str {
        match self {
            AlertCard::Accepted { request_id, .. } | AlertCard::Incoming { request_id, .. } => request_id,
        }
    }

    pub fn hospital_name(&self) -> &str {
        match self {
            AlertCard::Accepted { hospital_name, .. } | AlertCard::Incoming { hospital_name, .. } => {
                hospital_name
            }
        }
    }

    pub fn distance_display(&self) -> String {
        match self {
            AlertCard::Accepted { distance_km, .. } | AlertCard::Incoming { distance_km, .. } => {
                format_distance(*distance_km)
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, AlertCard::Accepted { .. })
    }

    /// 到院指引，仅已接受的卡片有
    pub fn instructions(&self) -> Option<String> {
        match self {
            AlertCard::Accepted { donor_id, .. } => Some(format!(
                "Please proceed to the Emergency Ward reception. Show your Donor ID: {}.",
                donor_id
            )),
            AlertCard::Incoming { .. } => None,
        }
    }
}

/// 仪表盘视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum FeedView {
    /// 没有可见请求，继续搜索
    Radar { refreshed_at: DateTime<Utc> },
    /// 有可见请求
    Alerts {
        refreshed_at: DateTime<Utc>,
        badge: usize,
        cards: Vec<AlertCard>,
    },
}

impl FeedView {
    pub fn cards(&self) -> &[AlertCard] {
        match self {
            FeedView::Radar { .. } => &[],
            FeedView::Alerts { cards, .. } => cards.as_slice(),
        }
    }

    /// 角标数量，雷达状态下隐藏
    pub fn badge(&self) -> Option<usize> {
        match self {
            FeedView::Radar { .. } => None,
            FeedView::Alerts { badge, .. } => Some(*badge),
        }
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        match self {
            FeedView::Radar { refreshed_at } | FeedView::Alerts { refreshed_at, .. } => *refreshed_at,
        }
    }
}

/// 视图构建器
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    default_hospital_name: String,
}

impl FeedBuilder {
    pub fn new(default_hospital_name: impl Into<String>) -> Self {
        Self {
            default_hospital_name: default_hospital_name.into(),
        }
    }

    pub fn build(&self, donor: &DonorProfile, matches: &[MatchedRequest]) -> FeedView {
        let refreshed_at = Utc::now();
        if matches.is_empty() {
            return FeedView::Radar { refreshed_at };
        }

        let cards: Vec<AlertCard> = matches.iter().map(|m| self.card(donor, m)).collect();
        FeedView::Alerts {
            refreshed_at,
            badge: cards.len(),
            cards,
        }
    }

    fn card(&self, donor: &DonorProfile, matched: &MatchedRequest) -> AlertCard {
        let request = &matched.request;
        let hospital_name = request
            .hospital_name
            .clone()
            .unwrap_or_else(|| self.default_hospital_name.clone());

        if matched.accepted {
            AlertCard::Accepted {
                request_id: request.id.clone(),
                hospital_name,
                distance_km: matched.distance_km,
                donor_id: donor.id.clone(),
            }
        } else {
            AlertCard::Incoming {
                request_id: request.id.clone(),
                hospital_name,
                distance_km: matched.distance_km,
                urgency_hours: request.urgency_hours,
                component: request.component.clone(),
                blood_group: request.blood_group.clone(),
            }
        }
    }
}

impl Default for FeedBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HOSPITAL_NAME)
    }
}
