//! # SCM Core
//!
//! 核心資料模型與類型定義（日曆、配置、生產計劃、訂單、庫存、情境）

pub mod calendar;
pub mod config;
pub mod demand;
pub mod holidays;
pub mod inventory;
pub mod plan;
pub mod scenario;

// Re-export 主要類型
pub use calendar::{CalendarDay, CalendarService, Holiday, HolidayKind, WorkCalendar};
pub use config::{
    BomPosition, Component, InventoryPolicy, LeadTimeLegs, ManualOrder, OrderingPolicy,
    Seasonality, ShutdownWindow, SimConfig, Supplier, Variant,
};
pub use demand::{DailyRequirement, ProductionDayEntry, VariantPlan};
pub use inventory::{DayEvent, InventoryDayEntry, StockStatus};
pub use plan::{Lot, LotContribution, Order, OrderLine, OrderReason, OrderStatus};
pub use scenario::{
    CapacityLoss, DateWindow, DemandSurge, ScenarioModifier, ShippingDelay, StockWriteOff,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// 模擬錯誤類型
///
/// 分為兩類：配置錯誤（使用者輸入問題）與不變量違反（計算邏輯缺陷）。
/// 缺料、延遲等營運事件不屬於錯誤，會以警告資料的形式附在結果中。
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    // ---- 配置錯誤 ----
    #[error("變體 {variant_id} 沒有任何 BOM 對應")]
    MissingBomMapping { variant_id: String },

    #[error("BOM 用量必須為正整數：變體 {variant_id} → 物料 {component_id}")]
    InvalidBomQuantity {
        variant_id: String,
        component_id: String,
    },

    #[error("找不到變體: {0}")]
    UnknownVariant(String),

    #[error("找不到物料: {0}")]
    UnknownComponent(String),

    #[error("批量必須大於 0（供應商 {supplier_id}）")]
    InvalidLotSize { supplier_id: String },

    #[error("提前期分段合計 {legs_sum} 天與總提前期 {total} 天不符（供應商 {supplier_id}）")]
    LeadTimeMismatch {
        supplier_id: String,
        legs_sum: u32,
        total: u32,
    },

    #[error("停工窗口 {name} 結束日 {end} 早於開始日 {start}")]
    MalformedShutdown {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("季節比例合計 {sum}% 不等於 100%")]
    InvalidSeasonality { sum: Decimal },

    #[error("變體比例無效: {0}")]
    InvalidShare(String),

    #[error("情境參數無效: {0}")]
    InvalidScenario(String),

    #[error("配置讀取失敗: {0}")]
    ConfigIo(String),

    // ---- 不變量違反 ----
    #[error("庫存為負：物料 {component_id} 於 {date} 期末 {balance}")]
    NegativeInventory {
        component_id: String,
        date: NaiveDate,
        balance: i64,
    },

    #[error("年度計劃合計 {planned} 與目標 {target} 不符（變體 {variant_id}）")]
    PlanMismatch {
        variant_id: String,
        planned: i64,
        target: u32,
    },

    #[error("欠量守恆失敗：物料 {component_id} 於 {date}（需求 {requirement}、消耗 {consumption}、欠量 {backlog}）")]
    BacklogConservation {
        component_id: String,
        date: NaiveDate,
        requirement: u64,
        consumption: u64,
        backlog: u64,
    },

    #[error("無效的日期: {0}")]
    InvalidDate(String),

    #[error("計算錯誤: {0}")]
    CalculationError(String),
}

impl ScmError {
    /// 是否為配置錯誤（使用者可修正的輸入問題）
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScmError::MissingBomMapping { .. }
                | ScmError::InvalidBomQuantity { .. }
                | ScmError::UnknownVariant(_)
                | ScmError::UnknownComponent(_)
                | ScmError::InvalidLotSize { .. }
                | ScmError::LeadTimeMismatch { .. }
                | ScmError::MalformedShutdown { .. }
                | ScmError::InvalidSeasonality { .. }
                | ScmError::InvalidShare(_)
                | ScmError::InvalidScenario(_)
                | ScmError::ConfigIo(_)
        )
    }

    /// 是否為不變量違反（代表計算邏輯有缺陷）
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ScmError::NegativeInventory { .. }
                | ScmError::PlanMismatch { .. }
                | ScmError::BacklogConservation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScmError>;
