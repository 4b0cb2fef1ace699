//! 模擬主流程
//!
//! 計劃 → BOM 展開 → 訂單生成只做一次，基準與情境共用；
//! 港口與庫存模擬則各自執行。

use chrono::NaiveDate;
use rayon::prelude::*;
use scm_core::{
    DailyRequirement, InventoryDayEntry, Order, Result, ScenarioModifier, SimConfig,
    StockWriteOff, VariantPlan, WorkCalendar,
};
use std::collections::BTreeMap;

use crate::backlog::{ComponentInventory, InventorySimulator, VariantDemand};
use crate::bom::BomResolver;
use crate::lead_time::LeadTimeCalculator;
use crate::metrics::MetricsAggregator;
use crate::ordering::OrderGenerator;
use crate::planning::ProductionPlanner;
use crate::scenario::ScenarioSet;
use crate::shipping::{PortSimulator, ShippingAdjustments};
use crate::{RunResult, SimWarning, SimulationOutput};

/// 基準與情境共用的上游結果
struct SharedPlan {
    production: BTreeMap<String, VariantPlan>,
    requirements: BTreeMap<String, Vec<DailyRequirement>>,
    orders: Vec<Order>,
    warnings: Vec<SimWarning>,
}

/// 模擬器
pub struct Simulator {
    config: SimConfig,
    plant: WorkCalendar,
    origin: WorkCalendar,
    bom: BomResolver,
}

impl Simulator {
    /// 驗證配置並建立日曆與 BOM 索引
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let bom = BomResolver::new(&config)?;
        let plant = config.plant_calendar();
        let origin = config.supplier_calendar();
        Ok(Self {
            config,
            plant,
            origin,
            bom,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn lead_time(&self) -> LeadTimeCalculator<'_> {
        LeadTimeCalculator::new(
            &self.config.supplier,
            &self.plant,
            &self.origin,
            self.config.ordering.processing_buffer_days,
        )
    }

    /// 主模擬入口：基準結果，加上情境不為空時的情境結果
    pub fn run(&self, scenarios: &[ScenarioModifier]) -> Result<SimulationOutput> {
        tracing::info!(
            "開始模擬：年度 {}，總量 {}，變體 {} 個，零件 {} 個，情境 {} 個",
            self.config.year,
            self.config.annual_volume,
            self.config.variants.len(),
            self.config.components.len(),
            scenarios.len()
        );
        let start_time = std::time::Instant::now();

        let scenario_set = ScenarioSet::new(scenarios)?;

        tracing::debug!("Step 1: 生產計劃、BOM 展開、訂單生成");
        let shared = self.plan()?;

        tracing::debug!("Step 2: 基準模擬");
        let baseline = self.execute(
            &shared,
            &shared.production,
            shared.requirements.clone(),
            &ShippingAdjustments::none(),
            &[],
        )?;

        let scenario = if scenario_set.is_empty() {
            None
        } else {
            tracing::debug!("Step 3: 情境模擬 {:?}", scenario_set.names());
            let production = scenario_set.apply_demand(&shared.production);
            let requirements = self
                .bom
                .component_requirements(&production, &self.config.days_of_year()?)?;
            Some(self.execute(
                &shared,
                &production,
                requirements,
                &scenario_set.shipping_adjustments(),
                &scenario_set.write_offs(),
            )?)
        };

        tracing::info!("模擬完成，耗時 {:?}", start_time.elapsed());
        Ok(SimulationOutput { baseline, scenario })
    }

    fn plan(&self) -> Result<SharedPlan> {
        let (production, mut warnings) =
            ProductionPlanner::new(&self.config, &self.plant).plan_all()?;
        let requirements = self
            .bom
            .component_requirements(&production, &self.config.days_of_year()?)?;

        let lead_time = self.lead_time();
        let book = OrderGenerator::new(&self.config, &lead_time).generate(&requirements)?;
        warnings.extend(book.warnings);

        Ok(SharedPlan {
            production,
            requirements,
            orders: book.orders,
            warnings,
        })
    }

    fn execute(
        &self,
        shared: &SharedPlan,
        production: &BTreeMap<String, VariantPlan>,
        requirements: BTreeMap<String, Vec<DailyRequirement>>,
        adjustments: &ShippingAdjustments,
        write_offs: &[StockWriteOff],
    ) -> Result<RunResult> {
        let year_start = self.config.year_start()?;
        let year_end = self.config.year_end()?;
        let lead_time = self.lead_time();

        let mut orders = shared.orders.clone();
        let mut warnings = shared.warnings.clone();

        let shipping = PortSimulator::new(&lead_time, self.config.ordering.long_wait_days)
            .simulate(&mut orders, adjustments)?;
        warnings.extend(shipping.warnings);

        let simulator =
            InventorySimulator::new(&self.plant, &self.config.inventory, year_start, year_end);
        let component_ids: Vec<&String> = self.bom.component_ids().collect();
        let results: Vec<ComponentInventory> = component_ids
            .par_iter()
            .map(|component_id| {
                let consumers: Vec<VariantDemand> = self
                    .bom
                    .consumers(component_id)
                    .iter()
                    .filter_map(|c| {
                        production.get(&c.variant_id).map(|plan| VariantDemand {
                            variant_id: &c.variant_id,
                            quantity_per_unit: c.quantity_per_unit,
                            plan,
                        })
                    })
                    .collect();
                let start = orders
                    .iter()
                    .filter(|o| o.quantity_for(component_id) > 0)
                    .map(|o| o.order_date)
                    .min()
                    .unwrap_or(year_start);
                let lots = shipping
                    .lots
                    .get(component_id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                simulator.simulate(component_id, start, &consumers, lots, write_offs)
            })
            .collect::<Result<_>>()?;

        let mut inventory: BTreeMap<String, Vec<InventoryDayEntry>> = BTreeMap::new();
        let mut allocations: BTreeMap<String, BTreeMap<String, BTreeMap<NaiveDate, u32>>> =
            BTreeMap::new();
        for result in results {
            warnings.extend(result.warnings);
            allocations.insert(result.component_id.clone(), result.allocations);
            inventory.insert(result.component_id, result.entries);
        }

        let mut production = production.clone();
        for plan in production.values_mut() {
            let components = self.bom.components_of(&plan.variant_id);
            for day in plan.days.iter_mut() {
                day.actual_units = components
                    .iter()
                    .map(|(component_id, _)| {
                        allocations
                            .get(component_id)
                            .and_then(|by_variant| by_variant.get(&plan.variant_id))
                            .and_then(|by_date| by_date.get(&day.date))
                            .copied()
                            .unwrap_or(0)
                    })
                    .min()
                    .unwrap_or(0);
            }
        }

        let horizon_end = inventory
            .values()
            .filter_map(|entries| entries.last().map(|e| e.date))
            .max()
            .unwrap_or(year_end)
            .max(year_end);
        for order in orders.iter_mut() {
            order.refresh_status(horizon_end);
        }

        let metrics = MetricsAggregator::new(
            year_start,
            year_end,
            self.config.inventory.trailing_consumption_days,
            self.config.supplier.total_lead_time_days,
        )
        .compute(&production, &orders, &shipping.lots, &inventory);

        tracing::info!(
            "執行完成：訂單 {} 張，批次 {} 批，缺料天數 {}，警告 {} 則",
            orders.len(),
            shipping.lots.values().map(Vec::len).sum::<usize>(),
            metrics.shortfall_days,
            warnings.len()
        );

        Ok(RunResult {
            production,
            requirements,
            orders,
            lots: shipping.lots,
            inventory,
            metrics,
            warnings,
        })
    }
}

/// 便利函式：以配置與情境執行一次完整模擬
pub fn simulate(config: &SimConfig, scenarios: &[ScenarioModifier]) -> Result<SimulationOutput> {
    Simulator::new(config.clone())?.run(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use scm_core::{DateWindow, ScmError};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, day).unwrap()
    }

    #[test]
    fn test_reference_baseline() {
        let config = SimConfig::reference(2027);
        let output = simulate(&config, &[]).unwrap();
        let baseline = &output.baseline;

        assert!(output.scenario.is_none());
        assert_eq!(baseline.production.len(), 8);
        for plan in baseline.production.values() {
            assert_eq!(plan.total_planned(), plan.annual_target as u64);
            assert!(plan.total_actual() <= plan.total_planned());
        }
        for lots in baseline.lots.values() {
            assert!(lots.iter().all(|l| l.shipped_quantity % 500 == 0));
        }
        for entries in baseline.inventory.values() {
            assert!(entries.iter().all(|e| e.balance_identity_holds()));
            assert!(entries.iter().all(|e| e.backlog_identity_holds()));
        }
        assert!(baseline.metrics.plan_attainment_pct.is_some());
    }

    #[test]
    fn test_runs_are_idempotent() {
        let config = SimConfig::reference(2027);
        let scenarios = [ScenarioModifier::shipping_delay(
            DateWindow::new(d(4, 1), d(4, 30)),
            vec![],
            7,
        )];
        let first = simulate(&config, &scenarios).unwrap();
        let second = simulate(&config, &scenarios).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_surge_keeps_orders_and_raises_requirement() {
        let config = SimConfig::reference(2027);
        let scenarios = [ScenarioModifier::demand_surge(
            DateWindow::new(d(5, 1), d(5, 31)),
            vec!["MTB-AR".to_string()],
            Decimal::from(25),
        )];
        let output = simulate(&config, &scenarios).unwrap();
        let scenario = output.scenario.as_ref().unwrap();

        let total = |run: &RunResult| -> u64 {
            run.requirements["SAT-FT"].iter().map(|r| r.quantity as u64).sum()
        };
        assert!(total(scenario) > total(&output.baseline));
        assert_eq!(
            scenario.orders.iter().map(|o| (o.id, o.order_date)).collect::<Vec<_>>(),
            output.baseline.orders.iter().map(|o| (o.id, o.order_date)).collect::<Vec<_>>()
        );
        // 計劃量不受情境影響
        assert_eq!(
            scenario.production["MTB-AR"].total_planned(),
            output.baseline.production["MTB-AR"].total_planned()
        );
    }

    #[test]
    fn test_delay_shifts_lot_arrivals() {
        let config = SimConfig::reference(2027);
        let window = DateWindow::new(d(6, 1), d(6, 30));
        let scenarios = [ScenarioModifier::shipping_delay(window, vec![], 7)];
        let output = simulate(&config, &scenarios).unwrap();
        let scenario = output.scenario.as_ref().unwrap();

        for (component_id, base_lots) in &output.baseline.lots {
            let delayed = &scenario.lots[component_id];
            assert_eq!(base_lots.len(), delayed.len());
            for (base, lot) in base_lots.iter().zip(delayed) {
                if window.contains(base.sailing_date) {
                    assert_eq!(lot.arrival_date, base.arrival_date + Duration::days(7));
                } else {
                    assert_eq!(lot, base);
                }
            }
        }
    }

    #[test]
    fn test_saturated_surge_reports_overflow() {
        // MTB-AR 與 MTB-FR 共用 SAT-FT，排程量飽和後毛需求超出 u32
        let config = SimConfig::reference(2027);
        let scenarios = [ScenarioModifier::demand_surge(
            DateWindow::new(d(5, 1), d(5, 31)),
            vec!["MTB-AR".to_string(), "MTB-FR".to_string()],
            Decimal::from(10_000_000_000i64),
        )];
        let err = simulate(&config, &scenarios).unwrap_err();
        assert!(matches!(err, ScmError::CalculationError(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimConfig::reference(2027);
        config.supplier.lot_size = 0;
        let err = Simulator::new(config).err().unwrap();
        assert!(matches!(err, ScmError::InvalidLotSize { .. }));
    }
}
