//! # Saddle SCM
//!
//! 座墊供應鏈年度模擬：生產計劃、補貨訂單、海運併批與欠量庫存。
//!
//! ```no_run
//! use saddle_scm::{simulate, SimConfig};
//!
//! let config = SimConfig::reference(2027);
//! let output = simulate(&config, &[]).unwrap();
//! println!("{:?}", output.baseline.metrics.plan_attainment_pct);
//! ```

pub use scm_cache::{CacheStats, SimulationCache};
pub use scm_calc::{
    simulate, Metrics, RunResult, SimWarning, SimulationOutput, Simulator, WarningKind,
    WarningSeverity,
};
pub use scm_core::*;

pub mod calc {
    pub use scm_calc::*;
}
