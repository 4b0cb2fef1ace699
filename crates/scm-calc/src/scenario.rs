//! 情境套用
//!
//! 需求激增修改排程需求量；產能損失與海運延誤交給港口模擬；
//! 報廢交給庫存模擬。多個情境依輸入順序套用，基準資料不會被修改。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scm_core::{Result, ScenarioModifier, StockWriteOff, VariantPlan};
use std::collections::BTreeMap;

use crate::disaggregation::round_half_away;
use crate::shipping::ShippingAdjustments;

/// 已驗證的情境集合
#[derive(Debug, Clone, Copy)]
pub struct ScenarioSet<'a> {
    modifiers: &'a [ScenarioModifier],
}

impl<'a> ScenarioSet<'a> {
    pub fn new(modifiers: &'a [ScenarioModifier]) -> Result<Self> {
        for modifier in modifiers {
            modifier.validate()?;
        }
        Ok(Self { modifiers })
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modifiers.iter().map(ScenarioModifier::name).collect()
    }

    /// 套用需求激增，回傳新的排程（計劃量不變）
    pub fn apply_demand(&self, plans: &BTreeMap<String, VariantPlan>) -> BTreeMap<String, VariantPlan> {
        let hundred = Decimal::from(100);
        let mut adjusted = plans.clone();

        for modifier in self.modifiers {
            let ScenarioModifier::DemandSurge(surge) = modifier else {
                continue;
            };
            let factor = Decimal::ONE + surge.increase_pct / hundred;
            for plan in adjusted.values_mut() {
                for day in plan.days.iter_mut() {
                    if day.scheduled == 0 || !surge.applies_to(&plan.variant_id, day.date) {
                        continue;
                    }
                    day.scheduled = round_half_away(Decimal::from(day.scheduled) * factor)
                        .max(Decimal::ZERO)
                        .to_u32()
                        .unwrap_or(u32::MAX);
                }
            }
        }

        adjusted
    }

    /// 海運相關修正
    pub fn shipping_adjustments(&self) -> ShippingAdjustments {
        let mut adjustments = ShippingAdjustments::none();
        for modifier in self.modifiers {
            match modifier {
                ScenarioModifier::CapacityLoss(loss) => adjustments.capacity_losses.push(loss.clone()),
                ScenarioModifier::ShippingDelay(delay) => adjustments.delays.push(delay.clone()),
                _ => {}
            }
        }
        adjustments
    }

    pub fn write_offs(&self) -> Vec<StockWriteOff> {
        self.modifiers
            .iter()
            .filter_map(|m| match m {
                ScenarioModifier::StockWriteOff(write_off) => Some(write_off.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scm_core::{DateWindow, ProductionDayEntry};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, day).unwrap()
    }

    fn plans() -> BTreeMap<String, VariantPlan> {
        ["V1", "V2"]
            .into_iter()
            .map(|id| {
                let days = (1..=3)
                    .map(|day| ProductionDayEntry {
                        is_working_day: true,
                        planned: 100,
                        scheduled: 100,
                        ..ProductionDayEntry::idle(d(4, day))
                    })
                    .collect();
                (
                    id.to_string(),
                    VariantPlan {
                        variant_id: id.to_string(),
                        annual_target: 300,
                        days,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_surge_scales_selected_variant_in_window() {
        let modifiers = [ScenarioModifier::demand_surge(
            DateWindow::new(d(4, 2), d(4, 3)),
            vec!["V1".to_string()],
            Decimal::from(20),
        )];
        let set = ScenarioSet::new(&modifiers).unwrap();
        let base = plans();
        let surged = set.apply_demand(&base);

        assert_eq!(surged["V1"].scheduled_on(d(4, 1)), 100);
        assert_eq!(surged["V1"].scheduled_on(d(4, 2)), 120);
        assert_eq!(surged["V2"].scheduled_on(d(4, 2)), 100);
        // 計劃量與基準不變
        assert_eq!(surged["V1"].planned_on(d(4, 2)), 100);
        assert_eq!(base["V1"].scheduled_on(d(4, 2)), 100);
    }

    #[test]
    fn test_surges_compose_sequentially() {
        let window = DateWindow::new(d(4, 1), d(4, 3));
        let modifiers = [
            ScenarioModifier::demand_surge(window, vec![], Decimal::from(10)),
            ScenarioModifier::demand_surge(window, vec![], Decimal::from(10)),
        ];
        let set = ScenarioSet::new(&modifiers).unwrap();
        let surged = set.apply_demand(&plans());
        assert_eq!(surged["V2"].scheduled_on(d(4, 1)), 121);
    }

    #[test]
    fn test_modifiers_are_routed() {
        let modifiers = [
            ScenarioModifier::capacity_loss(DateWindow::single(d(3, 3)), Decimal::from(50)),
            ScenarioModifier::shipping_delay(DateWindow::single(d(3, 3)), vec![], 7),
            ScenarioModifier::stock_write_off(vec![], d(5, 1), Decimal::from(10), None),
        ];
        let set = ScenarioSet::new(&modifiers).unwrap();
        let adjustments = set.shipping_adjustments();
        assert_eq!(adjustments.capacity_losses.len(), 1);
        assert_eq!(adjustments.delays.len(), 1);
        assert_eq!(set.write_offs().len(), 1);
        assert_eq!(set.names(), vec!["capacity-loss", "shipping-delay", "stock-write-off"]);
    }

    #[test]
    fn test_invalid_modifier_is_rejected() {
        let modifiers = [ScenarioModifier::capacity_loss(
            DateWindow::single(d(3, 3)),
            Decimal::from(120),
        )];
        let err = ScenarioSet::new(&modifiers).unwrap_err();
        assert!(err.is_config_error());
    }
}
