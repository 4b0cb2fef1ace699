//! 生產計劃與需求模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單一變體單日的生產計劃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionDayEntry {
    pub date: NaiveDate,

    /// 工廠國是否為工作日
    pub is_working_day: bool,

    /// 拆分後的小數目標
    pub target_decimal: Decimal,

    /// 取整後的計劃量
    pub planned: u32,

    /// 排程需求量（基準等於計劃量，需求激增情境會放大）
    pub scheduled: u32,

    /// 當月累計的捨入誤差（取整修正之後）
    pub running_error: Decimal,

    /// 受物料限制後的實際完工量（由庫存模擬回填）
    pub actual_units: u32,
}

impl ProductionDayEntry {
    /// 創建非工作日記錄（目標與產量皆為 0）
    pub fn idle(date: NaiveDate) -> Self {
        Self {
            date,
            is_working_day: false,
            target_decimal: Decimal::ZERO,
            planned: 0,
            scheduled: 0,
            running_error: Decimal::ZERO,
            actual_units: 0,
        }
    }
}

/// 單一變體的年度生產計劃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPlan {
    pub variant_id: String,
    pub annual_target: u32,
    /// 全年每一天（365/366 筆）
    pub days: Vec<ProductionDayEntry>,
}

impl VariantPlan {
    pub fn total_planned(&self) -> u64 {
        self.days.iter().map(|d| d.planned as u64).sum()
    }

    pub fn total_actual(&self) -> u64 {
        self.days.iter().map(|d| d.actual_units as u64).sum()
    }

    pub fn planned_on(&self, date: NaiveDate) -> u32 {
        self.entry(date).map(|e| e.planned).unwrap_or(0)
    }

    pub fn scheduled_on(&self, date: NaiveDate) -> u32 {
        self.entry(date).map(|e| e.scheduled).unwrap_or(0)
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&ProductionDayEntry> {
        let first = self.days.first()?.date;
        let offset = (date - first).num_days();
        if offset < 0 {
            return None;
        }
        self.days.get(offset as usize).filter(|e| e.date == date)
    }
}

/// 零件單日毛需求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRequirement {
    pub date: NaiveDate,
    pub quantity: u32,
}

impl DailyRequirement {
    pub fn new(date: NaiveDate, quantity: u32) -> Self {
        Self { date, quantity }
    }
}
