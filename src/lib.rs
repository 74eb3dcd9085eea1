//! # LifeLink
//!
//! 献血者请求匹配引擎的统一入口，重新导出各子模块。

pub use lifelink_core as core;
pub use lifelink_matching as matching;
pub use lifelink_storage as storage;
