//! # LifeLink存储模块
//!
//! 共享键值存储的适配层：请求集合的读写、会话档案解析。

pub mod repository;
pub mod session;
pub mod store;

pub use repository::{RequestRepository, RequestSnapshot};
pub use session::ProfileResolver;
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// 请求集合使用的默认键
pub const DEFAULT_REQUESTS_KEY: &str = "lifelink_requests";

/// 献血者会话使用的默认键
pub const DEFAULT_SESSION_KEY: &str = "lifelink_donor_session";
