//! 生產計劃：季節拆分 + 年度對帳
//!
//! 各變體互不相依，以 rayon 平行計算；輸出以 BTreeMap 保證順序穩定。

use rayon::prelude::*;
use scm_core::{ProductionDayEntry, Result, ScmError, SimConfig, Variant, VariantPlan, WorkCalendar};
use std::collections::BTreeMap;

use crate::disaggregation::SeasonalDisaggregator;
use crate::{SimWarning, WarningKind};

/// 生產計劃器
pub struct ProductionPlanner<'a> {
    config: &'a SimConfig,
    calendar: &'a WorkCalendar,
}

impl<'a> ProductionPlanner<'a> {
    pub fn new(config: &'a SimConfig, calendar: &'a WorkCalendar) -> Self {
        Self { config, calendar }
    }

    /// 計算所有變體的年度計劃
    pub fn plan_all(&self) -> Result<(BTreeMap<String, VariantPlan>, Vec<SimWarning>)> {
        let results: Vec<(VariantPlan, Vec<SimWarning>)> = self
            .config
            .variants
            .par_iter()
            .map(|variant| self.plan_variant(variant))
            .collect::<Result<_>>()?;

        let mut plans = BTreeMap::new();
        let mut warnings = Vec::new();
        for (plan, plan_warnings) in results {
            warnings.extend(plan_warnings);
            plans.insert(plan.variant_id.clone(), plan);
        }

        tracing::debug!("生產計劃完成：{} 個變體", plans.len());
        Ok((plans, warnings))
    }

    /// 單一變體：拆分 → 對帳 → 驗證合計
    pub fn plan_variant(&self, variant: &Variant) -> Result<(VariantPlan, Vec<SimWarning>)> {
        let annual_target = variant.annual_target(self.config.annual_volume);
        let disaggregation = SeasonalDisaggregator::disaggregate(
            annual_target,
            &self.config.seasonality,
            self.calendar,
            self.config.year,
        )?;

        let warnings: Vec<SimWarning> = disaggregation
            .empty_months
            .iter()
            .map(|month| {
                tracing::warn!("變體 {} 於 {} 月沒有工作日", variant.id, month);
                SimWarning::warning(
                    &variant.id,
                    None,
                    WarningKind::EmptyProductionMonth,
                    format!("{} 月沒有工作日，月目標改由其他月份吸收", month),
                )
            })
            .collect();

        let mut days = disaggregation.days;
        let adjusted = Self::reconcile(&variant.id, &mut days, annual_target)?;
        if adjusted > 0 {
            tracing::debug!("變體 {} 對帳調整 {} 件", variant.id, adjusted);
        }

        Ok((
            VariantPlan {
                variant_id: variant.id.clone(),
                annual_target,
                days,
            },
            warnings,
        ))
    }

    /// 年度對帳：使全年計劃合計等於年度目標
    ///
    /// 依（計劃量降冪、日期升冪）排序工作日，對前 |差額| 天各加減 1，
    /// 不足時循環；不會把任何一天減到負數。回傳調整的件數。
    pub fn reconcile(
        variant_id: &str,
        days: &mut [ProductionDayEntry],
        annual_target: u32,
    ) -> Result<u64> {
        let total: i64 = days.iter().map(|d| d.planned as i64).sum();
        let diff = total - annual_target as i64;
        if diff == 0 {
            return Ok(0);
        }

        let mut remaining = diff.unsigned_abs();
        let mut adjusted = 0u64;

        while remaining > 0 {
            let mut order: Vec<usize> = (0..days.len())
                .filter(|&i| days[i].is_working_day)
                .collect();
            order.sort_by(|&a, &b| {
                days[b]
                    .planned
                    .cmp(&days[a].planned)
                    .then(days[a].date.cmp(&days[b].date))
            });

            let mut progressed = false;
            for idx in order {
                if remaining == 0 {
                    break;
                }
                let day = &mut days[idx];
                if diff > 0 {
                    if day.planned == 0 {
                        continue;
                    }
                    day.planned -= 1;
                } else {
                    day.planned += 1;
                }
                day.scheduled = day.planned;
                remaining -= 1;
                adjusted += 1;
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        let planned: i64 = days.iter().map(|d| d.planned as i64).sum();
        if planned != annual_target as i64 {
            return Err(ScmError::PlanMismatch {
                variant_id: variant_id.to_string(),
                planned,
                target: annual_target,
            });
        }

        Ok(adjusted)
    }
}
