//! # SCM Simulation Engine
//!
//! 年度生產與補貨模擬引擎：季節拆分、BOM 展開、訂單生成、港口併批、
//! 欠量/庫存模擬、情境修正與指標彙總。

pub mod backlog;
pub mod bom;
pub mod disaggregation;
pub mod lead_time;
pub mod metrics;
pub mod ordering;
pub mod planning;
pub mod scenario;
pub mod shipping;
pub mod simulator;

// Re-export 主要類型
pub use backlog::{allocate_fair_share, ComponentInventory, InventorySimulator};
pub use bom::BomResolver;
pub use disaggregation::{ErrorDiffusion, SeasonalDisaggregator};
pub use lead_time::{LeadTimeCalculator, OrderSchedule};
pub use metrics::{ComponentMetrics, Metrics, MetricsAggregator};
pub use ordering::OrderGenerator;
pub use planning::ProductionPlanner;
pub use scenario::ScenarioSet;
pub use shipping::{PortSimulator, ShippingAdjustments};
pub use simulator::{simulate, Simulator};

use chrono::NaiveDate;
use scm_core::{DailyRequirement, InventoryDayEntry, Lot, Order, VariantPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 單次模擬（基準或情境）的完整結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// 各變體的每日生產計劃（含實際完工量）
    pub production: BTreeMap<String, VariantPlan>,

    /// 各零件的每日毛需求
    pub requirements: BTreeMap<String, Vec<DailyRequirement>>,

    /// 補貨訂單（依下單日排序）
    pub orders: Vec<Order>,

    /// 各零件的海運批次
    pub lots: BTreeMap<String, Vec<Lot>>,

    /// 各零件的每日庫存與欠量
    pub inventory: BTreeMap<String, Vec<InventoryDayEntry>>,

    pub metrics: Metrics,

    pub warnings: Vec<SimWarning>,
}

impl RunResult {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &SimWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn inventory_entry(&self, component_id: &str, date: NaiveDate) -> Option<&InventoryDayEntry> {
        self.inventory
            .get(component_id)?
            .iter()
            .find(|e| e.date == date)
    }
}

/// 模擬輸出：基準結果與（若有情境）情境結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub baseline: RunResult,
    pub scenario: Option<RunResult>,
}

/// 模擬警告（營運事件以資料回報，不中斷計算）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimWarning {
    /// 相關零件或變體
    pub subject: String,
    pub date: Option<NaiveDate>,
    pub kind: WarningKind,
    pub message: String,
    pub severity: WarningSeverity,
}

impl SimWarning {
    pub fn new(
        subject: &str,
        date: Option<NaiveDate>,
        kind: WarningKind,
        message: String,
        severity: WarningSeverity,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            date,
            kind,
            message,
            severity,
        }
    }

    pub fn info(subject: &str, date: Option<NaiveDate>, kind: WarningKind, message: String) -> Self {
        Self::new(subject, date, kind, message, WarningSeverity::Info)
    }

    pub fn warning(subject: &str, date: Option<NaiveDate>, kind: WarningKind, message: String) -> Self {
        Self::new(subject, date, kind, message, WarningSeverity::Warning)
    }

    pub fn error(subject: &str, date: Option<NaiveDate>, kind: WarningKind, message: String) -> Self {
        Self::new(subject, date, kind, message, WarningSeverity::Error)
    }
}

/// 警告種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// 當月沒有任何工作日，月目標無法排產
    EmptyProductionMonth,
    /// 下單日落在停工窗口，已提前
    OrderPulledForShutdown,
    /// 補貨管線與停工窗口重疊
    AtRiskOrder,
    /// 年底仍有未達批量的需求未下單
    UnorderedRemainder,
    /// 港口等待超過門檻
    LongWaitingLot,
    /// 港口餘量永遠湊不滿一個批量
    NeverShipped,
    /// 缺料（連續缺料期間的第一天）
    Shortfall,
    /// 年底仍有欠量，延伸模擬
    TrailingBacklog,
    /// 延伸模擬達到上限仍有欠量
    CutoffReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_constructors() {
        let date = NaiveDate::from_ymd_opt(2027, 2, 3);
        let warning = SimWarning::warning(
            "SAT-FT",
            date,
            WarningKind::OrderPulledForShutdown,
            "提前下單".to_string(),
        );
        assert_eq!(warning.severity, WarningSeverity::Warning);
        assert_eq!(warning.subject, "SAT-FT");

        let error = SimWarning::error("SAT-FT", None, WarningKind::CutoffReached, String::new());
        assert!(error.severity > warning.severity);
    }
}
