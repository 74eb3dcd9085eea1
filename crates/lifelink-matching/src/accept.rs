//! 接受动作
//!
//! 在完整（未过滤）的请求集合中定位请求，把献血者ID追加到接受名单，再把整个集合写回存储。
//! 写回通过比较并交换完成：若其他会话在读取之后改动了集合，就基于最新内容重做一次。

use lifelink_core::{LifelinkError, Result, StoredRequest};
use lifelink_storage::RequestRepository;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 接受结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptOutcome {
    /// 已追加到接受名单
    Accepted,
    /// 献血者早已在名单中
    AlreadyAccepted,
    /// 请求ID不存在，集合未改动
    NotFound,
}

impl AcceptOutcome {
    /// 是否找到了请求
    pub fn is_found(&self) -> bool {
        !matches!(self, AcceptOutcome::NotFound)
    }
}

/// 接受状态转换：就地修改集合
pub fn accept_request(requests: &mut [StoredRequest], request_id: &str, donor_id: &str) -> AcceptOutcome {
    let Some(request) = requests.iter_mut().find(|r| r.id() == request_id) else {
        return AcceptOutcome::NotFound;
    };

    if request.append_accepted_donor(donor_id) {
        AcceptOutcome::Accepted
    } else {
        AcceptOutcome::AlreadyAccepted
    }
}

/// 带持久化的接受动作
#[derive(Debug, Clone)]
pub struct AcceptAction {
    repository: RequestRepository,
    max_attempts: u32,
}

impl AcceptAction {
    pub fn new(repository: RequestRepository, max_attempts: u32) -> Self {
        Self {
            repository,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 执行读取-修改-写回
    pub async fn execute(&self, request_id: &str, donor_id: &str) -> Result<AcceptOutcome> {
        for attempt in 1..=self.max_attempts {
            let snapshot = self.repository.snapshot().await?;
            let mut requests = snapshot.requests.clone();

            let outcome = accept_request(&mut requests, request_id, donor_id);
            match outcome {
                AcceptOutcome::NotFound => {
                    debug!("Accept ignored: request {} not found", request_id);
                    return Ok(outcome);
                }
                AcceptOutcome::AlreadyAccepted => {
                    debug!("Donor {} already accepted request {}", donor_id, request_id);
                    return Ok(outcome);
                }
                AcceptOutcome::Accepted => {}
            }

            if self.repository.commit(&snapshot, &requests).await? {
                info!("Donor {} accepted request {}", donor_id, request_id);
                return Ok(outcome);
            }

            warn!(
                "Request collection changed during accept of {} (attempt {}/{}), retrying",
                request_id, attempt, self.max_attempts
            );
        }

        Err(LifelinkError::Conflict(format!(
            "Could not accept request {} after {} attempts",
            request_id, self.max_attempts
        )))
    }
}
