//! 補貨訂單與海運批次模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 訂單來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderReason {
    /// 累計未下單需求達到批量門檻
    LotThreshold,
    /// 手動輸入
    Manual,
}

/// 訂單狀態：Created → Shipped → Arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Shipped,
    Arrived,
}

/// 訂單明細（單一零件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub component_id: String,
    /// 下單數量（建立後不再變動）
    pub quantity: u32,
    /// 已裝船數量
    pub shipped_quantity: u32,
    /// 最後一批裝船日
    pub sailing_date: Option<NaiveDate>,
    /// 最後一批實體到廠日；未全部出貨時為 None
    pub arrival_date: Option<NaiveDate>,
    /// 最後一批可用日；未全部出貨時為 None
    pub available_date: Option<NaiveDate>,
}

impl OrderLine {
    pub fn new(component_id: &str, quantity: u32) -> Self {
        Self {
            component_id: component_id.to_string(),
            quantity,
            shipped_quantity: 0,
            sailing_date: None,
            arrival_date: None,
            available_date: None,
        }
    }

    pub fn is_fully_shipped(&self) -> bool {
        self.shipped_quantity >= self.quantity
    }
}

/// 補貨訂單
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID（由內容推導，重跑結果一致）
    pub id: Uuid,

    /// 下單日期
    pub order_date: NaiveDate,

    /// 停工調整前的名目下單日期
    pub nominal_order_date: NaiveDate,

    /// 需求日期（最早覆蓋的需求日）
    pub need_date: NaiveDate,

    pub lines: Vec<OrderLine>,

    pub reason: OrderReason,

    pub status: OrderStatus,

    /// 貨物抵達起運港的日期
    pub port_ready_date: NaiveDate,

    /// 因供應商停工而提前下單
    pub pulled_for_shutdown: bool,

    /// 管線與停工窗口重疊，交期有風險
    pub at_risk: bool,
}

impl Order {
    /// 創建新的訂單
    pub fn new(
        id: Uuid,
        order_date: NaiveDate,
        need_date: NaiveDate,
        lines: Vec<OrderLine>,
        reason: OrderReason,
        port_ready_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            order_date,
            nominal_order_date: order_date,
            need_date,
            lines,
            reason,
            status: OrderStatus::Created,
            port_ready_date,
            pulled_for_shutdown: false,
            at_risk: false,
        }
    }

    /// 以內容推導可重現的訂單ID
    pub fn derive_id(key: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }

    /// 建構器模式：標記停工提前
    pub fn with_shutdown_pull(mut self, nominal_order_date: NaiveDate) -> Self {
        self.nominal_order_date = nominal_order_date;
        self.pulled_for_shutdown = nominal_order_date != self.order_date;
        self
    }

    /// 建構器模式：標記風險
    pub fn with_at_risk(mut self, at_risk: bool) -> Self {
        self.at_risk = at_risk;
        self
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn quantity_for(&self, component_id: &str) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.component_id == component_id)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn line_mut(&mut self, component_id: &str) -> Option<&mut OrderLine> {
        self.lines.iter_mut().find(|l| l.component_id == component_id)
    }

    /// 全部明細實體到廠的日期；任一明細未出貨時為 None
    pub fn arrival_date(&self) -> Option<NaiveDate> {
        self.lines
            .iter()
            .map(|l| l.arrival_date)
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    /// 全部明細可用的日期；任一明細未出貨時為 None
    pub fn available_date(&self) -> Option<NaiveDate> {
        self.lines
            .iter()
            .map(|l| l.available_date)
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    /// 最後一批裝船日
    pub fn sailing_date(&self) -> Option<NaiveDate> {
        self.lines
            .iter()
            .map(|l| l.sailing_date)
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    /// 依模擬終點推導狀態
    pub fn refresh_status(&mut self, horizon_end: NaiveDate) {
        self.status = if !self.lines.iter().all(OrderLine::is_fully_shipped) {
            OrderStatus::Created
        } else {
            match self.available_date() {
                Some(date) if date <= horizon_end => OrderStatus::Arrived,
                _ => OrderStatus::Shipped,
            }
        };
    }

    /// 實際提前期（下單到實體到廠，天）
    pub fn lead_time_days(&self) -> Option<i64> {
        self.arrival_date()
            .map(|date| (date - self.order_date).num_days())
    }
}

/// 批次中某張訂單的貢獻量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotContribution {
    pub order_id: Uuid,
    pub order_date: NaiveDate,
    pub need_date: NaiveDate,
    pub quantity: u32,
}

/// 海運批次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub component_id: String,

    pub sailing_date: NaiveDate,

    /// 實體到廠日
    pub arrival_date: NaiveDate,

    /// 可投入生產日（到廠次日）
    pub available_date: NaiveDate,

    /// 開船時港口累積量
    pub pooled_quantity: u32,

    /// 裝船量（批量的整數倍）
    pub shipped_quantity: u32,

    /// 留待下一班船的餘量
    pub carried_remainder: u32,

    /// 因產能損失被扣留的量（仍留在港口）
    pub withheld_quantity: u32,

    /// 情境延誤天數
    pub delay_days: u32,

    pub contributions: Vec<LotContribution>,
}

impl Lot {
    /// 批次中最早的下單日
    pub fn earliest_order_date(&self) -> Option<NaiveDate> {
        self.contributions.iter().map(|c| c.order_date).min()
    }
}
