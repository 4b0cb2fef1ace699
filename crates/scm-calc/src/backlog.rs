//! 欠量與庫存模擬
//!
//! 逐日推進單一零件的庫存：到貨 → 報廢 → 依 ATP 分配需求 → 消耗。
//! 未滿足的需求按變體累積為欠量，之後有貨時優先補足。
//! 物料不足時按各變體未滿足量等比例分配（最大餘數法，同分取排序在前的變體）。

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scm_core::{
    DayEvent, InventoryDayEntry, InventoryPolicy, Lot, Result, ScmError, StockStatus,
    StockWriteOff, VariantPlan, WorkCalendar,
};
use std::collections::BTreeMap;

use crate::{SimWarning, WarningKind};

/// 零件的一個需求來源
#[derive(Debug, Clone, Copy)]
pub struct VariantDemand<'a> {
    pub variant_id: &'a str,
    pub quantity_per_unit: u32,
    pub plan: &'a VariantPlan,
}

/// 單一零件的模擬結果
#[derive(Debug, Clone)]
pub struct ComponentInventory {
    pub component_id: String,
    pub entries: Vec<InventoryDayEntry>,
    /// 變體 → 日期 → 分配到的完工台數
    pub allocations: BTreeMap<String, BTreeMap<NaiveDate, u32>>,
    pub warnings: Vec<SimWarning>,
}

/// 等比例分配可用量
///
/// `outstanding` 為各變體未滿足台數與單位用量；回傳各變體分配台數。
/// 分配的物料總量不超過 `available`，每個變體不超過其未滿足量。
pub fn allocate_fair_share(outstanding: &[(u64, u32)], available: u64) -> Vec<u64> {
    let required: u128 = outstanding
        .iter()
        .map(|&(units, qty)| units as u128 * qty as u128)
        .sum();
    if required <= available as u128 {
        return outstanding.iter().map(|&(units, _)| units).collect();
    }

    let mut allocation = Vec::with_capacity(outstanding.len());
    let mut remainders = Vec::with_capacity(outstanding.len());
    for &(units, _) in outstanding {
        let numerator = units as u128 * available as u128;
        allocation.push((numerator / required) as u64);
        remainders.push(numerator % required);
    }

    let used: u64 = allocation
        .iter()
        .zip(outstanding)
        .map(|(&a, &(_, qty))| a * qty as u64)
        .sum();
    let mut left = available - used;

    let mut order: Vec<usize> = (0..outstanding.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(a.cmp(&b)));
    for i in order {
        let (units, qty) = outstanding[i];
        if allocation[i] < units && qty as u64 <= left {
            allocation[i] += 1;
            left -= qty as u64;
        }
    }

    allocation
}

/// 庫存模擬器
pub struct InventorySimulator<'a> {
    plant: &'a WorkCalendar,
    policy: &'a InventoryPolicy,
    year_start: NaiveDate,
    year_end: NaiveDate,
}

impl<'a> InventorySimulator<'a> {
    pub fn new(
        plant: &'a WorkCalendar,
        policy: &'a InventoryPolicy,
        year_start: NaiveDate,
        year_end: NaiveDate,
    ) -> Self {
        Self {
            plant,
            policy,
            year_start,
            year_end,
        }
    }

    /// 全年平均每工作日需求（用於可用天數）
    pub fn average_daily_requirement(&self, consumers: &[VariantDemand]) -> Option<Decimal> {
        let mut total = 0u64;
        let mut working_days = 0u64;
        for date in self.year_start.iter_days().take_while(|d| *d <= self.year_end) {
            if self.plant.is_working_day(date) {
                working_days += 1;
            }
            total += consumers
                .iter()
                .map(|c| c.plan.scheduled_on(date) as u64 * c.quantity_per_unit as u64)
                .sum::<u64>();
        }
        (total > 0 && working_days > 0)
            .then(|| Decimal::from(total) / Decimal::from(working_days))
    }

    /// 模擬單一零件，自 `start_date` 與年初較早者開始
    pub fn simulate(
        &self,
        component_id: &str,
        start_date: NaiveDate,
        consumers: &[VariantDemand],
        lots: &[Lot],
        write_offs: &[StockWriteOff],
    ) -> Result<ComponentInventory> {
        let safety = self.policy.safety_stock as i64;
        let opening = self
            .policy
            .opening_stock
            .get(component_id)
            .copied()
            .unwrap_or(0);
        let cutoff = self.year_end + Duration::days(self.policy.post_year_cutoff_days as i64);
        let avg_daily = self.average_daily_requirement(consumers);

        let mut arrivals: BTreeMap<NaiveDate, (u64, u32)> = BTreeMap::new();
        for lot in lots {
            let slot = arrivals.entry(lot.available_date).or_default();
            slot.0 += lot.shipped_quantity as u64;
            slot.1 += 1;
        }
        let mut recoveries: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        let mut balance = opening as i64;
        let mut backlog = vec![0u64; consumers.len()];
        let mut cum_gross = 0u64;
        let mut cum_consumption = 0u64;
        let mut in_shortfall = false;

        let mut entries = Vec::with_capacity(400);
        let mut allocations: BTreeMap<String, BTreeMap<NaiveDate, u32>> = BTreeMap::new();
        let mut warnings = Vec::new();

        let mut date = start_date.min(self.year_start);
        loop {
            let post_year = date > self.year_end;
            let backlog_before = backlog_units(&backlog, consumers);
            if post_year && backlog_before == 0 {
                break;
            }
            if date > cutoff {
                tracing::warn!("物料 {} 延伸到 {} 仍有欠量 {}", component_id, cutoff, backlog_before);
                warnings.push(SimWarning::error(
                    component_id,
                    Some(cutoff),
                    WarningKind::CutoffReached,
                    format!("延伸模擬到 {} 仍有欠量 {}", cutoff, backlog_before),
                ));
                break;
            }

            let mut events = Vec::new();
            let opening_balance = balance;

            let (arrived, lot_count) = arrivals.get(&date).copied().unwrap_or((0, 0));
            if arrived > 0 {
                events.push(DayEvent::Arrival {
                    quantity: to_u32(arrived)?,
                    lots: lot_count,
                });
            }
            let recovered = recoveries.remove(&date).unwrap_or(0);
            if recovered > 0 {
                events.push(DayEvent::Recovery {
                    quantity: to_u32(recovered)?,
                });
            }
            balance += (arrived + recovered) as i64;

            let mut written_off = 0u64;
            for write_off in write_offs
                .iter()
                .filter(|w| w.date == date && w.applies_to(component_id))
            {
                let quantity = (Decimal::from(balance.max(0)) * write_off.fraction_pct
                    / Decimal::from(100))
                .floor()
                .to_u64()
                .unwrap_or(0);
                balance -= quantity as i64;
                written_off += quantity;
                if let Some(delay) = write_off.recovery_delay_days {
                    *recoveries
                        .entry(date + Duration::days(delay as i64))
                        .or_default() += quantity;
                }
            }
            if written_off > 0 {
                tracing::debug!("物料 {} 於 {} 報廢 {} 件", component_id, date, written_off);
                events.push(DayEvent::WriteOff {
                    quantity: to_u32(written_off)?,
                });
            }

            let working = self.plant.is_working_day(date);
            let scheduled: Vec<u64> = consumers
                .iter()
                .map(|c| if post_year { 0 } else { c.plan.scheduled_on(date) as u64 })
                .collect();
            let gross: u64 = scheduled
                .iter()
                .zip(consumers)
                .map(|(&units, c)| units * c.quantity_per_unit as u64)
                .sum();
            let atp = (balance - safety).max(0) as u64;

            let (requirement, consumption) = if working {
                let outstanding: Vec<(u64, u32)> = scheduled
                    .iter()
                    .zip(&backlog)
                    .zip(consumers)
                    .map(|((&s, &b), c)| (s + b, c.quantity_per_unit))
                    .collect();
                let allocated = allocate_fair_share(&outstanding, atp);

                let mut consumption = 0u64;
                for (i, consumer) in consumers.iter().enumerate() {
                    backlog[i] = outstanding[i].0 - allocated[i];
                    consumption += allocated[i] * consumer.quantity_per_unit as u64;
                    if allocated[i] > 0 {
                        allocations
                            .entry(consumer.variant_id.to_string())
                            .or_default()
                            .insert(date, to_u32(allocated[i])?);
                    }
                }
                (gross + backlog_before, consumption)
            } else {
                for (b, s) in backlog.iter_mut().zip(&scheduled) {
                    *b += s;
                }
                (0, 0)
            };

            balance -= consumption as i64;
            if balance < 0 {
                tracing::error!("物料 {} 於 {} 庫存為負: {}", component_id, date, balance);
                return Err(ScmError::NegativeInventory {
                    component_id: component_id.to_string(),
                    date,
                    balance,
                });
            }

            cum_gross += gross;
            cum_consumption += consumption;
            let backlog_after = backlog_units(&backlog, consumers);
            if cum_gross != cum_consumption + backlog_after {
                return Err(ScmError::BacklogConservation {
                    component_id: component_id.to_string(),
                    date,
                    requirement: cum_gross,
                    consumption: cum_consumption,
                    backlog: backlog_after,
                });
            }

            if working && backlog_after > 0 {
                events.push(DayEvent::Shortfall {
                    unmet: to_u32(backlog_after)?,
                    growth: backlog_after as i64 - backlog_before as i64,
                });
                if !in_shortfall {
                    tracing::warn!("物料 {} 於 {} 開始缺料，欠量 {}", component_id, date, backlog_after);
                    warnings.push(SimWarning::warning(
                        component_id,
                        Some(date),
                        WarningKind::Shortfall,
                        format!("開始缺料，欠量 {}", backlog_after),
                    ));
                }
                in_shortfall = true;
            } else if backlog_after == 0 {
                in_shortfall = false;
            }
            if post_year {
                events.push(DayEvent::PostYearExtension);
            }
            if date == self.year_end && backlog_after > 0 {
                warnings.push(SimWarning::warning(
                    component_id,
                    Some(date),
                    WarningKind::TrailingBacklog,
                    format!("年底仍有欠量 {}，延伸模擬", backlog_after),
                ));
            }

            let days_of_supply =
                avg_daily.map(|avg| (Decimal::from(balance) / avg).round_dp(1));
            let status = StockStatus::classify(
                balance,
                self.policy.safety_stock,
                days_of_supply,
                self.policy.low_supply_days,
            );

            entries.push(InventoryDayEntry {
                date,
                is_working_day: working,
                opening_balance: to_u32(opening_balance as u64)?,
                arrivals: to_u32(arrived + recovered)?,
                write_off: to_u32(written_off)?,
                gross_requirement: to_u32(gross)?,
                backlog_before: to_u32(backlog_before)?,
                requirement: to_u32(requirement)?,
                available_to_promise: to_u32(atp)?,
                consumption: to_u32(consumption)?,
                backlog_after: to_u32(backlog_after)?,
                closing_balance: to_u32(balance as u64)?,
                days_of_supply,
                status,
                events,
            });

            date = date
                .succ_opt()
                .ok_or_else(|| ScmError::InvalidDate(format!("{date} 之後日期溢出")))?;
        }

        Ok(ComponentInventory {
            component_id: component_id.to_string(),
            entries,
            allocations,
            warnings,
        })
    }
}

fn backlog_units(backlog: &[u64], consumers: &[VariantDemand]) -> u64 {
    backlog
        .iter()
        .zip(consumers)
        .map(|(&b, c)| b * c.quantity_per_unit as u64)
        .sum()
}

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| ScmError::CalculationError(format!("庫存數量溢出: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use scm_core::{LotContribution, Order, ProductionDayEntry};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, day).unwrap()
    }

    fn always_open() -> WorkCalendar {
        WorkCalendar::new("24-7".to_string(), "XX".to_string()).with_working_days([true; 7])
    }

    /// 全年計劃，前 `days` 天每天排程 `daily` 台
    fn plan(id: &str, daily: u32, days: usize) -> VariantPlan {
        let entries = d(1, 1)
            .iter_days()
            .take_while(|date| *date <= d(12, 31))
            .enumerate()
            .map(|(i, date)| {
                let qty = if i < days { daily } else { 0 };
                ProductionDayEntry {
                    is_working_day: true,
                    planned: qty,
                    scheduled: qty,
                    ..ProductionDayEntry::idle(date)
                }
            })
            .collect();
        VariantPlan {
            variant_id: id.to_string(),
            annual_target: daily * days as u32,
            days: entries,
        }
    }

    fn lot(quantity: u32, available: NaiveDate) -> Lot {
        Lot {
            component_id: "SAT-A".to_string(),
            sailing_date: available - Duration::days(40),
            arrival_date: available - Duration::days(1),
            available_date: available,
            pooled_quantity: quantity,
            shipped_quantity: quantity,
            carried_remainder: 0,
            withheld_quantity: 0,
            delay_days: 0,
            contributions: vec![LotContribution {
                order_id: Order::derive_id("lot"),
                order_date: available - Duration::days(60),
                need_date: available,
                quantity,
            }],
        }
    }

    #[rstest]
    #[case(&[(3, 1), (2, 1)], 4, vec![2, 2])]
    #[case(&[(1, 1), (1, 1)], 1, vec![1, 0])]
    #[case(&[(10, 1), (10, 2)], 100, vec![10, 10])]
    #[case(&[(10, 1), (10, 2)], 0, vec![0, 0])]
    #[case(&[(5, 2), (5, 1)], 6, vec![2, 2])]
    fn test_fair_share_allocation(
        #[case] outstanding: &[(u64, u32)],
        #[case] available: u64,
        #[case] expected: Vec<u64>,
    ) {
        assert_eq!(allocate_fair_share(outstanding, available), expected);
    }

    #[test]
    fn test_backlog_consumed_when_lot_arrives() {
        let calendar = always_open();
        let policy = InventoryPolicy::default();
        let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
        let plan = plan("V1", 100, 60);
        let consumers = [VariantDemand {
            variant_id: "V1",
            quantity_per_unit: 1,
            plan: &plan,
        }];

        // 第 50 天到貨 500
        let lots = [lot(500, d(2, 19))];
        let result = sim.simulate("SAT-A", d(1, 1), &consumers, &lots, &[]).unwrap();

        let day50 = &result.entries[49];
        assert_eq!(day50.date, d(2, 19));
        assert_eq!(day50.backlog_before, 4900);
        assert_eq!(day50.requirement, 5000);
        assert_eq!(day50.consumption, 500);
        assert_eq!(day50.backlog_after, 4500);
        assert_eq!(day50.closing_balance, 0);
        assert_eq!(result.allocations["V1"][&d(2, 19)], 500);

        // 年底仍有 5500 欠量 → 延伸到上限
        assert_eq!(result.entries.len(), 365 + 120);
        assert!(result.entries.last().unwrap().is_post_year());
        let kinds: Vec<_> = result.warnings.iter().map(|w| w.kind).collect();
        assert!(kinds.contains(&WarningKind::Shortfall));
        assert!(kinds.contains(&WarningKind::TrailingBacklog));
        assert!(kinds.contains(&WarningKind::CutoffReached));
    }

    #[test]
    fn test_post_year_extension_clears_backlog() {
        let calendar = always_open();
        let policy = InventoryPolicy::default();
        let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
        let plan = plan("V1", 100, 365);
        let consumers = [VariantDemand {
            variant_id: "V1",
            quantity_per_unit: 1,
            plan: &plan,
        }];

        // 最後一天的需求由隔年 1/3 到貨補足
        let lots = [
            lot(36_400, d(1, 1)),
            lot(500, NaiveDate::from_ymd_opt(2028, 1, 3).unwrap()),
        ];
        let result = sim.simulate("SAT-A", d(1, 1), &consumers, &lots, &[]).unwrap();

        let last = result.entries.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2028, 1, 3).unwrap());
        assert_eq!(last.backlog_after, 0);
        assert_eq!(last.consumption, 100);
        assert!(last.is_post_year());
        assert_eq!(last.gross_requirement, 0);
    }

    #[test]
    fn test_safety_stock_is_reserved() {
        let calendar = always_open();
        let policy = InventoryPolicy {
            safety_stock: 40,
            ..InventoryPolicy::default()
        }
        .with_opening("SAT-A", 100);
        let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
        let plan = plan("V1", 100, 1);
        let consumers = [VariantDemand {
            variant_id: "V1",
            quantity_per_unit: 1,
            plan: &plan,
        }];

        let result = sim.simulate("SAT-A", d(1, 1), &consumers, &[], &[]).unwrap();
        let day1 = &result.entries[0];
        assert_eq!(day1.available_to_promise, 60);
        assert_eq!(day1.consumption, 60);
        assert_eq!(day1.backlog_after, 40);
        assert_eq!(day1.closing_balance, 40);
        // 期末等於安全庫存：欠量只以缺料事件呈現
        assert!(day1.has_shortfall());
        assert_ne!(day1.status, StockStatus::Critical);
    }

    #[test]
    fn test_write_off_and_recovery() {
        let calendar = always_open();
        let policy = InventoryPolicy::default().with_opening("SAT-A", 1000);
        let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
        let plan = plan("V1", 0, 0);
        let consumers = [VariantDemand {
            variant_id: "V1",
            quantity_per_unit: 1,
            plan: &plan,
        }];
        let write_offs = [StockWriteOff {
            component_ids: vec!["SAT-A".to_string()],
            date: d(3, 1),
            fraction_pct: Decimal::from(25),
            recovery_delay_days: Some(7),
        }];

        let result = sim
            .simulate("SAT-A", d(1, 1), &consumers, &[], &write_offs)
            .unwrap();
        let hit = result.entries.iter().find(|e| e.date == d(3, 1)).unwrap();
        assert_eq!(hit.write_off, 250);
        assert_eq!(hit.closing_balance, 750);
        let back = result.entries.iter().find(|e| e.date == d(3, 8)).unwrap();
        assert_eq!(back.arrivals, 250);
        assert_eq!(back.closing_balance, 1000);
        assert!(back.events.contains(&DayEvent::Recovery { quantity: 250 }));
        assert!(result.entries.iter().all(|e| e.balance_identity_holds()));
    }

    #[test]
    fn test_non_working_days_carry_backlog() {
        let calendar = WorkCalendar::weekend_only("DE");
        let policy = InventoryPolicy::default();
        let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
        let plan = plan("V1", 0, 0);
        let consumers = [VariantDemand {
            variant_id: "V1",
            quantity_per_unit: 1,
            plan: &plan,
        }];

        // 1/2 是星期六：到貨但不消耗
        let lots = [lot(500, d(1, 2))];
        let result = sim.simulate("SAT-A", d(1, 1), &consumers, &lots, &[]).unwrap();
        let saturday = &result.entries[1];
        assert!(!saturday.is_working_day);
        assert_eq!(saturday.requirement, 0);
        assert_eq!(saturday.consumption, 0);
        assert_eq!(saturday.closing_balance, 500);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_inventory_identities_hold(
            daily_a in 0u32..120,
            daily_b in 0u32..80,
            arrivals in proptest::collection::vec((0i64..360, 1u32..6), 0..20),
            opening in 0u32..2000,
        ) {
            let calendar = WorkCalendar::weekend_only("DE");
            let policy = InventoryPolicy::default().with_opening("SAT-A", opening);
            let sim = InventorySimulator::new(&calendar, &policy, d(1, 1), d(12, 31));
            let plan_a = plan("VA", daily_a, 365);
            let plan_b = plan("VB", daily_b, 365);
            let consumers = [
                VariantDemand { variant_id: "VA", quantity_per_unit: 1, plan: &plan_a },
                VariantDemand { variant_id: "VB", quantity_per_unit: 2, plan: &plan_b },
            ];
            let lots: Vec<Lot> = arrivals
                .iter()
                .map(|&(offset, lots)| lot(lots * 500, d(1, 1) + Duration::days(offset)))
                .collect();

            let result = sim.simulate("SAT-A", d(1, 1), &consumers, &lots, &[]).unwrap();
            let mut consumed = 0u64;
            for entry in &result.entries {
                prop_assert!(entry.balance_identity_holds());
                prop_assert!(entry.backlog_identity_holds());
                prop_assert!(entry.consumption <= entry.available_to_promise || !entry.is_working_day);
                consumed += entry.consumption as u64;
            }
            let supplied = opening as u64 + lots.iter().map(|l| l.shipped_quantity as u64).sum::<u64>();
            prop_assert!(consumed <= supplied);
        }
    }
}
