//! 献血者仪表盘演示程序
//!
//! 在内存存储中预置几条用血请求，演示过滤、接受以及请求被修改后的显示。

use lifelink::core::DonorProfile;
use lifelink::matching::{
    Availability, DashboardSettings, DonorDashboard, FeedView, RecordingRenderer, TickOutcome,
};
use lifelink::storage::{KeyValueStore, MemoryStore, RequestRepository, DEFAULT_REQUESTS_KEY};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🩸 LifeLink 献血者仪表盘演示");
    println!("================================");

    let requests = json!([
        {
            "id": "r1",
            "hospitalName": "St. John's Medical College",
            "hospitalLat": 13.01,
            "hospitalLon": 77.65,
            "bloodGroup": "A+",
            "urgency": 4,
            "component": "Whole Blood",
            "ward": "ICU-3"
        },
        {
            "id": "r2",
            "bloodGroup": "B+",
            "urgency": 12,
            "component": "Platelets"
        },
        {
            "id": "r3",
            "hospitalName": "Columbia Asia Hebbal",
            "hospitalLat": 13.10,
            "hospitalLon": 77.65,
            "group": "A+",
            "urgency": 2,
            "component": "Plasma"
        }
    ]);

    let store = Arc::new(MemoryStore::with_entries([(
        DEFAULT_REQUESTS_KEY.to_string(),
        requests,
    )]));
    let repository = RequestRepository::new(store.clone(), DEFAULT_REQUESTS_KEY);
    let renderer = RecordingRenderer::new();
    let availability = Availability::new(true);

    let donor = DonorProfile::default();
    println!(
        "\n👤 献血者: {} ({}), 血型 {}",
        donor.name, donor.id, donor.blood_group
    );

    let mut dashboard = DonorDashboard::new(
        donor,
        repository,
        Arc::new(renderer.clone()),
        availability.clone(),
        DashboardSettings::default(),
    );

    println!("\n📡 第一次刷新");
    dashboard.tick().await?;
    print_feed(&renderer).await;

    println!("\n✋ 接受请求 r1");
    dashboard.accept("r1").await?;
    print_feed(&renderer).await;
    for notice in renderer.notices().await {
        println!("  提示: {}", notice);
    }

    println!("\n✏️  医院把 r1 的血型改为 B+");
    if let Some(mut current) = store.read(DEFAULT_REQUESTS_KEY).await? {
        if let Some(first) = current.get_mut(0) {
            first["bloodGroup"] = json!("B+");
        }
        store.write(DEFAULT_REQUESTS_KEY, current).await?;
    }
    dashboard.tick().await?;
    print_feed(&renderer).await;

    println!("\n💤 切换为离线");
    availability.set_available(false);
    if dashboard.tick().await? == TickOutcome::Offline {
        println!("  离线状态不扫描请求");
    }

    println!("\n📦 存储中的原始记录");
    if let Some(stored) = store.read(DEFAULT_REQUESTS_KEY).await? {
        println!("{}", serde_json::to_string_pretty(&stored)?);
    }

    println!("\n✅ 演示完成！");
    Ok(())
}

async fn print_feed(renderer: &RecordingRenderer) {
    match renderer.last_feed().await {
        Some(FeedView::Radar { .. }) | None => println!("  雷达搜索中，附近暂无请求"),
        Some(view) => {
            println!("  {} 条提醒", view.badge().unwrap_or(0));
            for card in view.cards() {
                let state = if card.is_accepted() { "前往中" } else { "待接受" };
                println!(
                    "  - [{}] {} {} km ({})",
                    card.request_id(),
                    card.hospital_name(),
                    card.distance_display(),
                    state
                );
            }
        }
    }
}
