//! 季節性拆分：年度目標 → 月目標 → 每日整數計劃
//!
//! 每日小數目標先四捨五入（遠離零），再以當月累計誤差修正，
//! 使整數計劃在月內的累計值不偏離小數目標超過半件。

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use scm_core::{ProductionDayEntry, Result, ScmError, Seasonality, WorkCalendar};

/// 誤差擴散取整器（每月重置）
#[derive(Debug, Clone, Default)]
pub struct ErrorDiffusion {
    error: Decimal,
}

impl ErrorDiffusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.error = Decimal::ZERO;
    }

    /// 目前累計誤差
    pub fn error(&self) -> Decimal {
        self.error
    }

    /// 將一天的小數目標轉為整數計劃
    pub fn step(&mut self, target: Decimal) -> u32 {
        let half = Decimal::new(5, 1);
        let rounded = round_half_away(target);
        self.error += target - rounded;

        let planned = if self.error >= half {
            self.error -= Decimal::ONE;
            rounded + Decimal::ONE
        } else if self.error <= -half {
            self.error += Decimal::ONE;
            rounded - Decimal::ONE
        } else {
            rounded
        };

        planned.max(Decimal::ZERO).to_u32().unwrap_or(0)
    }
}

/// 四捨五入到整數（0.5 遠離零）
pub fn round_half_away(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// 拆分結果
#[derive(Debug, Clone)]
pub struct Disaggregation {
    /// 全年每一天
    pub days: Vec<ProductionDayEntry>,
    /// 沒有工作日的月份（1..=12）
    pub empty_months: Vec<u32>,
}

/// 季節性拆分計算器
pub struct SeasonalDisaggregator;

impl SeasonalDisaggregator {
    /// 月目標 = 年目標 × 正規化月佔比
    pub fn monthly_targets(annual_target: u32, seasonality: &Seasonality) -> [Decimal; 12] {
        let annual = Decimal::from(annual_target);
        let mut targets = [Decimal::ZERO; 12];
        for (i, target) in targets.iter_mut().enumerate() {
            *target = annual * seasonality.normalized_share(i as u32 + 1);
        }
        targets
    }

    /// 將年度目標拆成每日計劃（尚未做年度對帳）
    pub fn disaggregate(
        annual_target: u32,
        seasonality: &Seasonality,
        calendar: &WorkCalendar,
        year: i32,
    ) -> Result<Disaggregation> {
        let monthly = Self::monthly_targets(annual_target, seasonality);

        let mut days = Vec::with_capacity(366);
        let mut empty_months = Vec::new();

        for month in 1..=12u32 {
            let working_days = calendar.working_days_in_month(year, month);
            let month_target = monthly[month as usize - 1];
            if working_days == 0 && month_target > Decimal::ZERO {
                empty_months.push(month);
            }

            let daily = if working_days > 0 {
                month_target / Decimal::from(working_days)
            } else {
                Decimal::ZERO
            };

            let mut diffusion = ErrorDiffusion::new();
            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| ScmError::InvalidDate(format!("{year}-{month} 無效")))?;

            for date in first.iter_days().take_while(|d| d.month() == month) {
                if !calendar.is_working_day(date) {
                    days.push(ProductionDayEntry::idle(date));
                    continue;
                }
                let planned = diffusion.step(daily);
                days.push(ProductionDayEntry {
                    date,
                    is_working_day: true,
                    target_decimal: daily,
                    planned,
                    scheduled: planned,
                    running_error: diffusion.error(),
                    actual_units: 0,
                });
            }
        }

        Ok(Disaggregation { days, empty_months })
    }
}
