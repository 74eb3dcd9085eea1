//! 并发接受演示程序
//!
//! 多个献血者会话共享同一存储并同时接受同一请求，所有接受记录都应保留。

use lifelink::core::StoredRequest;
use lifelink::matching::AcceptAction;
use lifelink::storage::{MemoryStore, RequestRepository, DEFAULT_REQUESTS_KEY};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const DONORS: [&str; 5] = ["D-101", "D-202", "D-303", "D-404", "D-505"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("🤝 LifeLink 并发接受演示");
    println!("================================");

    let store = Arc::new(MemoryStore::with_entries([(
        DEFAULT_REQUESTS_KEY.to_string(),
        json!([
            { "id": "r1", "bloodGroup": "O-", "urgency": 3, "component": "Whole Blood" },
            { "id": "r2", "bloodGroup": "A+", "urgency": 8, "component": "Plasma" }
        ]),
    )]));
    let repository = RequestRepository::new(store, DEFAULT_REQUESTS_KEY);

    let mut handles = Vec::new();
    for donor in DONORS {
        // 每个会话拥有独立的动作实例，只共享底层存储
        let action = AcceptAction::new(repository.clone(), 10);
        handles.push(tokio::spawn(async move {
            let outcome = action.execute("r1", donor).await;
            (donor, outcome)
        }));
    }

    for handle in handles {
        let (donor, outcome) = handle.await?;
        match outcome {
            Ok(outcome) => info!("Donor {} finished with {:?}", donor, outcome),
            Err(e) => println!("  {} 接受失败: {}", donor, e),
        }
    }

    let snapshot = repository.snapshot().await?;
    let accepted: Vec<String> = snapshot
        .requests
        .iter()
        .find(|request| request.id() == "r1")
        .map(StoredRequest::accepted_donors)
        .unwrap_or_default();

    println!("\n📋 r1 的接受者 ({}/{}):", accepted.len(), DONORS.len());
    for donor in &accepted {
        println!("  - {}", donor);
    }

    if accepted.len() == DONORS.len() {
        println!("\n✅ 没有丢失任何接受记录");
    } else {
        println!("\n⚠️  部分会话在重试次数内未能写入");
    }
    Ok(())
}
