//! 績效指標
//!
//! 所有比率以 Decimal 計算並取兩位小數；分母為空時為 None。

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use scm_core::{InventoryDayEntry, Lot, Order, VariantPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 單一零件的指標
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    pub component_id: String,
    pub lots: usize,
    pub on_time_lots: usize,
    /// 準時到貨率：到廠日 ≤ 下單日 + 名目提前期 + 1 天（%）
    pub on_time_delivery_pct: Option<Decimal>,
    pub available_by_need_lots: usize,
    /// 批次可用日不晚於需求日 + 1 天的比例（%）
    pub available_by_need_pct: Option<Decimal>,
    /// 物料可用率：ATP 完全滿足需求的工作日比例（%）
    pub material_availability_pct: Option<Decimal>,
    pub avg_days_of_supply: Option<Decimal>,
    pub inventory_turnover: Option<Decimal>,
    pub shortfall_days: u32,
    pub peak_backlog: u32,
    pub total_requirement: u64,
    pub total_consumption: u64,
    #[serde(skip)]
    working_days: u64,
    #[serde(skip)]
    satisfied_days: u64,
    #[serde(skip)]
    average_closing: Decimal,
}

/// 整體指標
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// 計劃達成率：實際完工 / 計劃（%）
    pub plan_attainment_pct: Option<Decimal>,
    pub on_time_delivery_pct: Option<Decimal>,
    pub available_by_need_pct: Option<Decimal>,
    /// 平均提前期：下單到實體到廠（天）
    pub avg_lead_time_days: Option<Decimal>,
    /// 平均週期：下單到開船（天）
    pub avg_cycle_time_days: Option<Decimal>,
    pub material_availability_pct: Option<Decimal>,
    pub avg_days_of_supply: Option<Decimal>,
    pub inventory_turnover: Option<Decimal>,
    /// 各零件缺料天數合計
    pub shortfall_days: u32,
    pub peak_backlog: u32,
    pub planned_units: u64,
    pub actual_units: u64,
    pub components: BTreeMap<String, ComponentMetrics>,
}

/// 百分比，兩位小數
pub fn pct(numerator: u64, denominator: u64) -> Option<Decimal> {
    (denominator > 0).then(|| {
        (Decimal::from(numerator) * Decimal::from(100) / Decimal::from(denominator)).round_dp(2)
    })
}

fn mean(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0u64), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| (sum / Decimal::from(count)).round_dp(2))
}

/// 指標彙總器
pub struct MetricsAggregator {
    year_start: NaiveDate,
    year_end: NaiveDate,
    trailing_days: u32,
    nominal_lead_time_days: u32,
}

impl MetricsAggregator {
    pub fn new(
        year_start: NaiveDate,
        year_end: NaiveDate,
        trailing_days: u32,
        nominal_lead_time_days: u32,
    ) -> Self {
        Self {
            year_start,
            year_end,
            trailing_days: trailing_days.max(1),
            nominal_lead_time_days,
        }
    }

    fn in_year(&self, date: NaiveDate) -> bool {
        self.year_start <= date && date <= self.year_end
    }

    pub fn compute(
        &self,
        production: &BTreeMap<String, VariantPlan>,
        orders: &[Order],
        lots: &BTreeMap<String, Vec<Lot>>,
        inventory: &BTreeMap<String, Vec<InventoryDayEntry>>,
    ) -> Metrics {
        let components: BTreeMap<String, ComponentMetrics> = inventory
            .iter()
            .map(|(component_id, entries)| {
                let component_lots = lots.get(component_id).map(Vec::as_slice).unwrap_or(&[]);
                (
                    component_id.clone(),
                    self.component(component_id, entries, component_lots),
                )
            })
            .collect();

        let planned_units: u64 = production.values().map(VariantPlan::total_planned).sum();
        let actual_units: u64 = production.values().map(VariantPlan::total_actual).sum();

        let lot_count: usize = components.values().map(|c| c.lots).sum();
        let on_time: usize = components.values().map(|c| c.on_time_lots).sum();
        let by_need: usize = components.values().map(|c| c.available_by_need_lots).sum();
        let working_days: u64 = components.values().map(|c| c.working_days).sum();
        let satisfied: u64 = components.values().map(|c| c.satisfied_days).sum();
        let consumption: u64 = components.values().map(|c| c.total_consumption).sum();
        let average_closing: Decimal = components.values().map(|c| c.average_closing).sum();

        Metrics {
            plan_attainment_pct: pct(actual_units, planned_units),
            on_time_delivery_pct: pct(on_time as u64, lot_count as u64),
            available_by_need_pct: pct(by_need as u64, lot_count as u64),
            avg_lead_time_days: mean(
                orders
                    .iter()
                    .filter_map(Order::lead_time_days)
                    .map(Decimal::from),
            ),
            avg_cycle_time_days: mean(orders.iter().filter_map(|o| {
                o.sailing_date()
                    .map(|sailing| Decimal::from((sailing - o.order_date).num_days()))
            })),
            material_availability_pct: pct(satisfied, working_days),
            avg_days_of_supply: mean(components.values().filter_map(|c| c.avg_days_of_supply)),
            inventory_turnover: (average_closing > Decimal::ZERO)
                .then(|| (Decimal::from(consumption) / average_closing).round_dp(2)),
            shortfall_days: components.values().map(|c| c.shortfall_days).sum(),
            peak_backlog: components.values().map(|c| c.peak_backlog).max().unwrap_or(0),
            planned_units,
            actual_units,
            components,
        }
    }

    /// 單一零件指標
    pub fn component(
        &self,
        component_id: &str,
        entries: &[InventoryDayEntry],
        lots: &[Lot],
    ) -> ComponentMetrics {
        let on_time_lots = lots.iter().filter(|lot| self.is_on_time(lot)).count();
        let available_by_need_lots = lots
            .iter()
            .filter(|lot| Self::is_available_by_need(lot))
            .count();

        let year: Vec<&InventoryDayEntry> = entries.iter().filter(|e| self.in_year(e.date)).collect();
        let working: Vec<&&InventoryDayEntry> = year.iter().filter(|e| e.is_working_day).collect();
        let satisfied_days = working.iter().filter(|e| e.atp_satisfied()).count() as u64;

        let total_requirement: u64 = year.iter().map(|e| e.gross_requirement as u64).sum();
        let total_consumption: u64 = year.iter().map(|e| e.consumption as u64).sum();
        let average_closing = if year.is_empty() {
            Decimal::ZERO
        } else {
            year.iter()
                .map(|e| Decimal::from(e.closing_balance))
                .sum::<Decimal>()
                / Decimal::from(year.len())
        };

        ComponentMetrics {
            component_id: component_id.to_string(),
            lots: lots.len(),
            on_time_lots,
            on_time_delivery_pct: pct(on_time_lots as u64, lots.len() as u64),
            available_by_need_lots,
            available_by_need_pct: pct(available_by_need_lots as u64, lots.len() as u64),
            material_availability_pct: pct(satisfied_days, working.len() as u64),
            avg_days_of_supply: self.trailing_days_of_supply(entries),
            inventory_turnover: (average_closing > Decimal::ZERO)
                .then(|| (Decimal::from(total_consumption) / average_closing).round_dp(2)),
            shortfall_days: entries.iter().filter(|e| e.has_shortfall()).count() as u32,
            peak_backlog: entries.iter().map(|e| e.backlog_after).max().unwrap_or(0),
            total_requirement,
            total_consumption,
            working_days: working.len() as u64,
            satisfied_days,
            average_closing,
        }
    }

    /// 到廠日不晚於最早訂單的下單日 + 名目提前期 + 1 天即為準時
    pub fn is_on_time(&self, lot: &Lot) -> bool {
        let allowance = Duration::days(self.nominal_lead_time_days as i64 + 1);
        lot.contributions
            .iter()
            .map(|c| c.order_date)
            .min()
            .is_some_and(|order_date| lot.arrival_date <= order_date + allowance)
    }

    /// 批次可用日不晚於最早訂單的需求日 + 1 天
    pub fn is_available_by_need(lot: &Lot) -> bool {
        lot.contributions
            .iter()
            .min_by_key(|c| (c.order_date, c.need_date))
            .is_some_and(|c| lot.available_date <= c.need_date + Duration::days(1))
    }

    /// 平均可用天數：期末庫存 / 回看窗口內每工作日平均消耗
    fn trailing_days_of_supply(&self, entries: &[InventoryDayEntry]) -> Option<Decimal> {
        let window = self.trailing_days as usize;
        let mut values = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            if !self.in_year(entry.date) {
                continue;
            }
            let from = (i + 1).saturating_sub(window);
            let slice = &entries[from..=i];
            let consumed: u64 = slice.iter().map(|e| e.consumption as u64).sum();
            let days = slice.iter().filter(|e| e.is_working_day).count() as u64;
            if consumed == 0 || days == 0 {
                continue;
            }
            let average = Decimal::from(consumed) / Decimal::from(days);
            values.push(Decimal::from(entry.closing_balance) / average);
        }

        mean(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scm_core::{DayEvent, LotContribution, OrderLine, OrderReason, StockStatus};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, day).unwrap()
    }

    fn entry(date: NaiveDate, requirement: u32, consumption: u32, closing: u32) -> InventoryDayEntry {
        let backlog = requirement - consumption;
        InventoryDayEntry {
            date,
            is_working_day: true,
            opening_balance: closing + consumption,
            arrivals: 0,
            write_off: 0,
            gross_requirement: requirement,
            backlog_before: 0,
            requirement,
            available_to_promise: closing + consumption,
            consumption,
            backlog_after: backlog,
            closing_balance: closing,
            days_of_supply: None,
            status: StockStatus::Ok,
            events: if backlog > 0 {
                vec![DayEvent::Shortfall {
                    unmet: backlog,
                    growth: backlog as i64,
                }]
            } else {
                vec![]
            },
        }
    }

    fn lot(order_date: NaiveDate, arrival: NaiveDate, need: NaiveDate) -> Lot {
        Lot {
            component_id: "SAT-A".to_string(),
            sailing_date: arrival - Duration::days(35),
            arrival_date: arrival,
            available_date: arrival + Duration::days(1),
            pooled_quantity: 500,
            shipped_quantity: 500,
            carried_remainder: 0,
            withheld_quantity: 0,
            delay_days: 0,
            contributions: vec![LotContribution {
                order_id: Order::derive_id("o"),
                order_date,
                need_date: need,
                quantity: 500,
            }],
        }
    }

    #[rstest]
    #[case(1, 2, Some(Decimal::new(5000, 2)))]
    #[case(2, 3, Some(Decimal::new(6667, 2)))]
    #[case(0, 0, None)]
    fn test_pct(#[case] num: u64, #[case] den: u64, #[case] expected: Option<Decimal>) {
        assert_eq!(pct(num, den), expected);
    }

    #[rstest]
    // 下單 1/4 + 49 天 + 1 天 = 2/23
    #[case(d(2, 22), true)]
    #[case(d(2, 23), true)]
    #[case(d(2, 24), false)]
    fn test_on_time_against_nominal_lead_time(#[case] arrival: NaiveDate, #[case] expected: bool) {
        let aggregator = MetricsAggregator::new(d(1, 1), d(12, 31), 30, 49);
        assert_eq!(aggregator.is_on_time(&lot(d(1, 4), arrival, d(6, 1))), expected);
    }

    #[test]
    fn test_on_time_ignores_need_date() {
        let aggregator = MetricsAggregator::new(d(1, 1), d(12, 31), 30, 49);
        // 到廠晚於名目提前期，但仍早於需求日
        let late = lot(d(1, 4), d(3, 5), d(4, 1));
        assert!(!aggregator.is_on_time(&late));
        assert!(MetricsAggregator::is_available_by_need(&late));

        // 名目提前期內到廠，但需求日更早
        let early_need = lot(d(1, 4), d(2, 20), d(2, 1));
        assert!(aggregator.is_on_time(&early_need));
        assert!(!MetricsAggregator::is_available_by_need(&early_need));
    }

    #[test]
    fn test_component_metrics() {
        let aggregator = MetricsAggregator::new(d(1, 1), d(12, 31), 30, 49);
        let entries = vec![
            entry(d(3, 1), 100, 100, 400),
            entry(d(3, 2), 100, 60, 0),
            entry(d(3, 3), 0, 0, 200),
        ];
        let lots = [lot(d(1, 4), d(2, 20), d(3, 1)), lot(d(1, 4), d(3, 10), d(3, 20))];
        let metrics = aggregator.component("SAT-A", &entries, &lots);

        assert_eq!(metrics.material_availability_pct, Some(Decimal::new(6667, 2)));
        assert_eq!(metrics.shortfall_days, 1);
        assert_eq!(metrics.peak_backlog, 40);
        assert_eq!(metrics.total_consumption, 160);
        assert_eq!(metrics.on_time_lots, 1);
        assert_eq!(metrics.on_time_delivery_pct, Some(Decimal::from(50)));
        assert_eq!(metrics.available_by_need_pct, Some(Decimal::from(100)));
        // 平均期末 200，消耗 160 → 0.8
        assert_eq!(metrics.inventory_turnover, Some(Decimal::new(80, 2)));
        assert!(metrics.avg_days_of_supply.is_some());
    }

    #[test]
    fn test_aggregate_lead_and_cycle_time() {
        let aggregator = MetricsAggregator::new(d(1, 1), d(12, 31), 30, 49);
        let mut order = Order::new(
            Order::derive_id("a"),
            d(1, 4),
            d(3, 1),
            vec![OrderLine::new("SAT-A", 500)],
            OrderReason::LotThreshold,
            d(1, 26),
        );
        let line = order.line_mut("SAT-A").unwrap();
        line.shipped_quantity = 500;
        line.sailing_date = Some(d(1, 27));
        line.arrival_date = Some(d(2, 28));
        line.available_date = Some(d(3, 1));

        let metrics = aggregator.compute(&BTreeMap::new(), &[order], &BTreeMap::new(), &BTreeMap::new());
        // 下單 1/4 到到廠 2/28
        assert_eq!(metrics.avg_lead_time_days, Some(Decimal::from(55)));
        assert_eq!(metrics.avg_cycle_time_days, Some(Decimal::from(23)));
        assert_eq!(metrics.plan_attainment_pct, None);
        assert_eq!(metrics.on_time_delivery_pct, None);
    }
}
