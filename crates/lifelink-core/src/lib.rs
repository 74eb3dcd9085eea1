//! # LifeLink Core
//!
//! 献血匹配系统的核心模块，提供基础数据结构、错误定义和距离计算工具。

pub mod error;
pub mod models;
pub mod record;
pub mod utils;

pub use error::{LifelinkError, Result};
pub use models::*;
pub use record::StoredRequest;
