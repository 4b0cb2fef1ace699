//! 港口併批模擬
//!
//! 訂單貨物抵達起運港後進入該零件的港口池，每週固定開船日
//! 以批量整數倍裝船，餘量留待下一班；池內先進先出。
//! 到港日不晚於開船日的貨物都會併入該班，到港當天正好開船時同日裝船。

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scm_core::{CapacityLoss, Lot, LotContribution, Order, Result, ScmError, ShippingDelay};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

use crate::lead_time::LeadTimeCalculator;
use crate::{SimWarning, WarningKind};

/// 最後一筆貨物到港後仍無法出貨的最長追蹤天數
const MAX_TAIL_DAYS: i64 = 730;

/// 情境對海運的修正（產能損失、延誤）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingAdjustments {
    pub capacity_losses: Vec<CapacityLoss>,
    pub delays: Vec<ShippingDelay>,
}

impl ShippingAdjustments {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.capacity_losses.is_empty() && self.delays.is_empty()
    }

    /// 產能損失後的裝船量（仍為批量整數倍，多個損失依序套用）
    pub fn shippable_after_loss(&self, sailing_date: NaiveDate, shippable: u32, lot_size: u32) -> u32 {
        let hundred = Decimal::from(100);
        let lot = Decimal::from(lot_size.max(1));
        self.capacity_losses
            .iter()
            .filter(|loss| loss.window.contains(sailing_date))
            .fold(shippable, |quantity, loss| {
                let kept = Decimal::from(quantity) * (hundred - loss.loss_pct) / hundred;
                ((kept / lot).floor() * lot).to_u32().unwrap_or(0).min(quantity)
            })
    }

    /// 某班船的延誤天數（多個延誤相加）
    pub fn delay_for(&self, component_id: &str, sailing_date: NaiveDate) -> u32 {
        self.delays
            .iter()
            .filter(|delay| delay.applies_to(component_id, sailing_date))
            .map(|delay| delay.delay_days)
            .sum()
    }
}

/// 港口模擬結果
#[derive(Debug, Clone, Default)]
pub struct ShippingOutcome {
    pub lots: BTreeMap<String, Vec<Lot>>,
    pub warnings: Vec<SimWarning>,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    order_index: usize,
    order_id: Uuid,
    order_date: NaiveDate,
    need_date: NaiveDate,
    ready_date: NaiveDate,
    remaining: u32,
    latest_arrival: Option<NaiveDate>,
    latest_available: Option<NaiveDate>,
    warned: bool,
}

/// 港口併批模擬器
pub struct PortSimulator<'a> {
    lead_time: &'a LeadTimeCalculator<'a>,
    lot_size: u32,
    long_wait_days: u32,
}

impl<'a> PortSimulator<'a> {
    pub fn new(lead_time: &'a LeadTimeCalculator<'a>, long_wait_days: u32) -> Self {
        Self {
            lead_time,
            lot_size: lead_time.supplier().lot_size,
            long_wait_days,
        }
    }

    /// 模擬所有零件；訂單明細的出貨狀態會就地更新
    pub fn simulate(
        &self,
        orders: &mut [Order],
        adjustments: &ShippingAdjustments,
    ) -> Result<ShippingOutcome> {
        if self.lot_size == 0 {
            return Err(ScmError::InvalidLotSize {
                supplier_id: self.lead_time.supplier().id.clone(),
            });
        }

        let component_ids: BTreeSet<String> = orders
            .iter()
            .flat_map(|o| o.lines.iter().map(|l| l.component_id.clone()))
            .collect();

        let mut outcome = ShippingOutcome::default();
        for component_id in component_ids {
            let (lots, warnings) = self.simulate_component(&component_id, orders, adjustments)?;
            tracing::debug!("物料 {} 出貨 {} 批", component_id, lots.len());
            outcome.lots.insert(component_id, lots);
            outcome.warnings.extend(warnings);
        }
        Ok(outcome)
    }

    fn simulate_component(
        &self,
        component_id: &str,
        orders: &mut [Order],
        adjustments: &ShippingAdjustments,
    ) -> Result<(Vec<Lot>, Vec<SimWarning>)> {
        let mut entries: Vec<PoolEntry> = orders
            .iter()
            .enumerate()
            .filter_map(|(order_index, order)| {
                let quantity = order.quantity_for(component_id);
                (quantity > 0).then(|| PoolEntry {
                    order_index,
                    order_id: order.id,
                    order_date: order.order_date,
                    need_date: order.need_date,
                    ready_date: order.port_ready_date,
                    remaining: quantity,
                    latest_arrival: None,
                    latest_available: None,
                    warned: false,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.ready_date, a.order_date, a.order_id).cmp(&(b.ready_date, b.order_date, b.order_id))
        });

        let mut pending: VecDeque<PoolEntry> = entries.into();
        let mut pool: VecDeque<PoolEntry> = VecDeque::new();
        let mut lots = Vec::new();
        let mut warnings = Vec::new();

        let Some(last_ready) = pending.back().map(|e| e.ready_date) else {
            return Ok((lots, warnings));
        };
        let guard = last_ready + Duration::days(MAX_TAIL_DAYS);
        let lot = self.lot_size as u64;
        let mut sailing = match pending.front() {
            Some(first) => self.lead_time.sailing_on_or_after(first.ready_date),
            None => return Ok((lots, warnings)),
        };

        loop {
            while pending.front().is_some_and(|e| e.ready_date <= sailing) {
                if let Some(entry) = pending.pop_front() {
                    pool.push_back(entry);
                }
            }

            for entry in pool.iter_mut().filter(|e| !e.warned) {
                let waited = (sailing - entry.ready_date).num_days();
                if waited > self.long_wait_days as i64 {
                    entry.warned = true;
                    warnings.push(SimWarning::warning(
                        component_id,
                        Some(sailing),
                        WarningKind::LongWaitingLot,
                        format!("訂單 {} 的貨物已在港口等待 {} 天", entry.order_id, waited),
                    ));
                }
            }

            let pooled: u64 = pool.iter().map(|e| e.remaining as u64).sum();
            if pooled >= lot {
                let full = to_u32(pooled / lot * lot)?;
                let shipped = adjustments.shippable_after_loss(sailing, full, self.lot_size);
                if shipped > 0 {
                    let delay = adjustments.delay_for(component_id, sailing);
                    let (arrival, available) = self.lead_time.arrival_for_sailing(sailing)?;
                    let arrival = arrival + Duration::days(delay as i64);
                    let available = available + Duration::days(delay as i64);

                    let contributions = take_fifo(&mut pool, shipped, (arrival, available), orders, component_id, sailing);
                    lots.push(Lot {
                        component_id: component_id.to_string(),
                        sailing_date: sailing,
                        arrival_date: arrival,
                        available_date: available,
                        pooled_quantity: to_u32(pooled)?,
                        shipped_quantity: shipped,
                        carried_remainder: to_u32(pooled - shipped as u64)?,
                        withheld_quantity: full - shipped,
                        delay_days: delay,
                        contributions,
                    });
                } else {
                    tracing::debug!("物料 {} 於 {} 因產能損失全數扣留 {} 件", component_id, sailing, full);
                }
            }

            let left: u64 = pool.iter().map(|e| e.remaining as u64).sum();
            if pending.is_empty() && left < lot {
                if left > 0 {
                    tracing::warn!("物料 {} 港口剩餘 {} 件無法湊滿批量", component_id, left);
                    warnings.push(SimWarning::warning(
                        component_id,
                        pool.front().map(|e| e.ready_date),
                        WarningKind::NeverShipped,
                        format!("港口剩餘 {} 件不足一個批量 {}，不會出貨", left, lot),
                    ));
                }
                break;
            }
            if sailing > guard {
                warnings.push(SimWarning::error(
                    component_id,
                    Some(sailing),
                    WarningKind::NeverShipped,
                    format!("港口仍有 {} 件，超過追蹤上限後停止", left),
                ));
                break;
            }

            sailing = match (pool.is_empty(), pending.front()) {
                (true, Some(next)) => self.lead_time.sailing_on_or_after(next.ready_date),
                _ => sailing + Duration::days(7),
            };
        }

        Ok((lots, warnings))
    }
}

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| ScmError::CalculationError(format!("批次數量溢出: {value}")))
}

/// 依先進先出取出裝船量，並回寫訂單明細
fn take_fifo(
    pool: &mut VecDeque<PoolEntry>,
    mut quantity: u32,
    (arrival, available): (NaiveDate, NaiveDate),
    orders: &mut [Order],
    component_id: &str,
    sailing: NaiveDate,
) -> Vec<LotContribution> {
    let mut contributions = Vec::new();

    while quantity > 0 {
        let Some(entry) = pool.front_mut() else {
            break;
        };
        let taken = entry.remaining.min(quantity);
        entry.remaining -= taken;
        quantity -= taken;
        let latest_arrival = entry.latest_arrival.map_or(arrival, |d| d.max(arrival));
        let latest = entry.latest_available.map_or(available, |d| d.max(available));
        entry.latest_arrival = Some(latest_arrival);
        entry.latest_available = Some(latest);

        contributions.push(LotContribution {
            order_id: entry.order_id,
            order_date: entry.order_date,
            need_date: entry.need_date,
            quantity: taken,
        });

        if let Some(line) = orders
            .get_mut(entry.order_index)
            .and_then(|o| o.line_mut(component_id))
        {
            line.shipped_quantity += taken;
            line.sailing_date = Some(sailing);
            if line.is_fully_shipped() {
                line.arrival_date = Some(latest_arrival);
                line.available_date = Some(latest);
            }
        }

        if entry.remaining == 0 {
            pool.pop_front();
        }
    }

    contributions
}
