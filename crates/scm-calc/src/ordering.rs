//! 補貨訂單生成
//!
//! 未下單需求依需求日進入 FIFO 佇列，累計達到批量即發出一張訂單，
//! 訂單需求日取佇列最前端的日期，再由交期計算器逆推下單日。

use chrono::NaiveDate;
use scm_core::{DailyRequirement, Order, OrderLine, OrderReason, Result, ScmError, SimConfig};
use std::collections::{BTreeMap, VecDeque};

use crate::lead_time::LeadTimeCalculator;
use crate::{SimWarning, WarningKind};

/// 訂單簿
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// 依（下單日、需求日、ID）排序
    pub orders: Vec<Order>,
    pub warnings: Vec<SimWarning>,
}

/// 訂單生成器
pub struct OrderGenerator<'a> {
    config: &'a SimConfig,
    lead_time: &'a LeadTimeCalculator<'a>,
}

impl<'a> OrderGenerator<'a> {
    pub fn new(config: &'a SimConfig, lead_time: &'a LeadTimeCalculator<'a>) -> Self {
        Self { config, lead_time }
    }

    /// 為所有零件生成訂單（含手動訂單）
    pub fn generate(
        &self,
        requirements: &BTreeMap<String, Vec<DailyRequirement>>,
    ) -> Result<OrderBook> {
        let mut book = OrderBook::default();

        for (component_id, series) in requirements {
            let (orders, warnings) = self.threshold_orders(component_id, series)?;
            tracing::debug!("物料 {} 生成 {} 張訂單", component_id, orders.len());
            book.orders.extend(orders);
            book.warnings.extend(warnings);
        }

        book.orders.extend(self.manual_orders()?);
        book.orders
            .sort_by(|a, b| (a.order_date, a.need_date, a.id).cmp(&(b.order_date, b.need_date, b.id)));

        tracing::info!(
            "訂單生成完成：{} 張訂單，{} 則警告",
            book.orders.len(),
            book.warnings.len()
        );
        Ok(book)
    }

    /// 單一零件的批量門檻訂單
    pub fn threshold_orders(
        &self,
        component_id: &str,
        requirements: &[DailyRequirement],
    ) -> Result<(Vec<Order>, Vec<SimWarning>)> {
        let lot = self.config.supplier.lot_size as u64;
        let round = self.config.ordering.round_to_lot_size;

        let mut queue: VecDeque<(NaiveDate, u64)> = VecDeque::new();
        let mut pending = 0u64;
        let mut orders = Vec::new();
        let mut warnings = Vec::new();

        for req in requirements.iter().filter(|r| r.quantity > 0) {
            queue.push_back((req.date, req.quantity as u64));
            pending += req.quantity as u64;
            if pending < lot {
                continue;
            }

            let quantity = if round { pending / lot * lot } else { pending };
            let need_date = queue.front().map(|(date, _)| *date).unwrap_or(req.date);
            drain_fifo(&mut queue, quantity);
            pending -= quantity;

            let quantity = u32::try_from(quantity)
                .map_err(|_| ScmError::CalculationError(format!("訂單數量溢出: {quantity}")))?;
            let order = self.threshold_order(component_id, need_date, quantity, orders.len() + 1)?;
            if let Some(warning) = schedule_warning(component_id, &order) {
                warnings.push(warning);
            }
            orders.push(order);
        }

        if pending > 0 {
            let since = queue.front().map(|(date, _)| *date);
            tracing::debug!("物料 {} 年底剩餘 {} 件未達批量", component_id, pending);
            warnings.push(SimWarning::info(
                component_id,
                since,
                WarningKind::UnorderedRemainder,
                format!("剩餘 {} 件需求未達批量 {}，未下單", pending, lot),
            ));
        }

        Ok((orders, warnings))
    }

    fn threshold_order(
        &self,
        component_id: &str,
        need_date: NaiveDate,
        quantity: u32,
        sequence: usize,
    ) -> Result<Order> {
        let schedule = self.lead_time.schedule_for_need(need_date)?;
        let port_ready = self.lead_time.port_ready_date(schedule.order_date)?;
        let id = Order::derive_id(&format!("{component_id}:{need_date}:{sequence}"));

        Ok(Order::new(
            id,
            schedule.order_date,
            need_date,
            vec![OrderLine::new(component_id, quantity)],
            OrderReason::LotThreshold,
            port_ready,
        )
        .with_shutdown_pull(schedule.nominal_order_date)
        .with_at_risk(schedule.at_risk))
    }

    /// 手動訂單：數量平均分給零件族的各零件，餘數給最後一個
    pub fn manual_orders(&self) -> Result<Vec<Order>> {
        let lot = self.config.supplier.lot_size;
        let round = self.config.ordering.round_to_lot_size;
        let mut orders = Vec::with_capacity(self.config.manual_orders.len());

        for (index, manual) in self.config.manual_orders.iter().enumerate() {
            let members = self.config.components_in_family(&manual.family);
            if members.is_empty() {
                return Err(ScmError::UnknownComponent(manual.family.clone()));
            }

            let count = members.len() as u32;
            let base = manual.quantity / count;
            let remainder = manual.quantity % count;

            let lines: Vec<OrderLine> = members
                .iter()
                .enumerate()
                .filter_map(|(i, component)| {
                    let mut quantity = base;
                    if i as u32 == count - 1 {
                        quantity += remainder;
                    }
                    if round && lot > 0 {
                        quantity = quantity.div_ceil(lot) * lot;
                    }
                    (quantity > 0).then(|| OrderLine::new(&component.id, quantity))
                })
                .collect();

            if lines.is_empty() {
                continue;
            }

            let port_ready = self.lead_time.port_ready_date(manual.order_date)?;
            let need_date = self.lead_time.earliest_available_date(manual.order_date)?;
            let id = Order::derive_id(&format!(
                "MANUAL:{}:{}:{}",
                index, manual.order_date, manual.family
            ));

            orders.push(Order::new(
                id,
                manual.order_date,
                need_date,
                lines,
                OrderReason::Manual,
                port_ready,
            ));
        }

        Ok(orders)
    }
}

/// 自佇列前端移除指定數量
fn drain_fifo(queue: &mut VecDeque<(NaiveDate, u64)>, mut quantity: u64) {
    while quantity > 0 {
        let Some(front) = queue.front_mut() else {
            break;
        };
        if front.1 <= quantity {
            quantity -= front.1;
            queue.pop_front();
        } else {
            front.1 -= quantity;
            quantity = 0;
        }
    }
}

fn schedule_warning(component_id: &str, order: &Order) -> Option<SimWarning> {
    if order.pulled_for_shutdown {
        tracing::warn!(
            "物料 {} 訂單因停工由 {} 提前到 {}",
            component_id,
            order.nominal_order_date,
            order.order_date
        );
        Some(SimWarning::warning(
            component_id,
            Some(order.order_date),
            WarningKind::OrderPulledForShutdown,
            format!(
                "名目下單日 {} 落在停工窗口，提前至 {}",
                order.nominal_order_date, order.order_date
            ),
        ))
    } else if order.at_risk {
        Some(SimWarning::warning(
            component_id,
            Some(order.order_date),
            WarningKind::AtRiskOrder,
            format!("需求日 {} 的補貨管線與停工窗口重疊", order.need_date),
        ))
    } else {
        None
    }
}
