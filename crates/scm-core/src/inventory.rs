//! 庫存與欠量時間序列模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 庫存狀態（依嚴重程度排序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockStatus {
    /// 期末為負（不應發生，屬嚴重異常）
    Negative,
    /// 低於安全庫存
    Critical,
    /// 可用天數低於門檻
    Low,
    Ok,
}

impl StockStatus {
    /// 依期末庫存與可用天數分類；欠量不影響狀態，由 `DayEvent::Shortfall` 表示
    pub fn classify(
        closing_balance: i64,
        safety_stock: u32,
        days_of_supply: Option<Decimal>,
        low_supply_days: u32,
    ) -> Self {
        if closing_balance < 0 {
            return StockStatus::Negative;
        }
        if closing_balance < safety_stock as i64 {
            return StockStatus::Critical;
        }
        match days_of_supply {
            Some(days) if days < Decimal::from(low_supply_days) => StockStatus::Low,
            _ => StockStatus::Ok,
        }
    }
}

/// 當日營運事件（資料，而非錯誤）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayEvent {
    /// 批次到貨
    Arrival { quantity: u32, lots: u32 },
    /// 缺料：未滿足量與欠量增減
    Shortfall { unmet: u32, growth: i64 },
    /// 庫存報廢
    WriteOff { quantity: u32 },
    /// 報廢補回
    Recovery { quantity: u32 },
    /// 年底後延伸模擬
    PostYearExtension,
}

/// 單一零件單日庫存記錄
///
/// 期末 = 期初 + 到貨 − 報廢 − 消耗；欠量後 = 欠量前 + 毛需求 − 消耗。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryDayEntry {
    pub date: NaiveDate,
    pub is_working_day: bool,
    pub opening_balance: u32,
    pub arrivals: u32,
    pub write_off: u32,
    pub gross_requirement: u32,
    pub backlog_before: u32,
    /// 當日總需求（毛需求 + 前期欠量；非工作日為 0）
    pub requirement: u32,
    /// ATP 可承諾量（扣除安全庫存保留）
    pub available_to_promise: u32,
    pub consumption: u32,
    pub backlog_after: u32,
    pub closing_balance: u32,
    pub days_of_supply: Option<Decimal>,
    pub status: StockStatus,
    pub events: Vec<DayEvent>,
}

impl InventoryDayEntry {
    /// ATP 是否完全滿足當日需求
    pub fn atp_satisfied(&self) -> bool {
        self.consumption >= self.requirement
    }

    pub fn balance_identity_holds(&self) -> bool {
        self.opening_balance as i64 + self.arrivals as i64
            - self.write_off as i64
            - self.consumption as i64
            == self.closing_balance as i64
    }

    pub fn backlog_identity_holds(&self) -> bool {
        self.backlog_before as i64 + self.gross_requirement as i64 - self.consumption as i64
            == self.backlog_after as i64
    }

    pub fn has_shortfall(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, DayEvent::Shortfall { .. }))
    }

    pub fn is_post_year(&self) -> bool {
        self.events.contains(&DayEvent::PostYearExtension)
    }
}
