//! # SCM Cache
//!
//! 模擬結果快取：相同的配置與情境只計算一次

pub mod memo;

pub use memo::{CacheStats, SimulationCache};
