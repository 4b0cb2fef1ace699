//! 情境修正模型
//!
//! 每種情境各有強型別參數；多個情境依序套用，基準結果不會被就地修改。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, ScmError};

/// 日期窗口（含首尾）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn validate(&self, label: &str) -> Result<()> {
        if self.end < self.start {
            return Err(ScmError::InvalidScenario(format!(
                "{label}: 窗口結束日 {} 早於開始日 {}",
                self.end, self.start
            )));
        }
        Ok(())
    }
}

/// 需求激增：窗口內指定變體的生產需求乘以 (1 + 百分比)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandSurge {
    pub window: DateWindow,
    /// 空列表代表全部變體
    pub variant_ids: Vec<String>,
    pub increase_pct: Decimal,
}

/// 供應商產能損失：窗口內開船的批次裝船量按比例扣留
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLoss {
    pub window: DateWindow,
    /// 100 代表完全停運
    pub loss_pct: Decimal,
}

/// 庫存報廢：指定日期扣除庫存的一定比例，可選擇延遲補回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWriteOff {
    /// 空列表代表全部零件
    pub component_ids: Vec<String>,
    pub date: NaiveDate,
    pub fraction_pct: Decimal,
    pub recovery_delay_days: Option<u32>,
}

/// 海運延誤：窗口內開船的批次到貨日延後 N 天
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDelay {
    pub window: DateWindow,
    /// 空列表代表全部零件
    pub component_ids: Vec<String>,
    pub delay_days: u32,
}

/// 情境修正
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioModifier {
    DemandSurge(DemandSurge),
    CapacityLoss(CapacityLoss),
    StockWriteOff(StockWriteOff),
    ShippingDelay(ShippingDelay),
}

impl ScenarioModifier {
    pub fn demand_surge(window: DateWindow, variant_ids: Vec<String>, increase_pct: Decimal) -> Self {
        Self::DemandSurge(DemandSurge {
            window,
            variant_ids,
            increase_pct,
        })
    }

    pub fn capacity_loss(window: DateWindow, loss_pct: Decimal) -> Self {
        Self::CapacityLoss(CapacityLoss { window, loss_pct })
    }

    pub fn stock_write_off(
        component_ids: Vec<String>,
        date: NaiveDate,
        fraction_pct: Decimal,
        recovery_delay_days: Option<u32>,
    ) -> Self {
        Self::StockWriteOff(StockWriteOff {
            component_ids,
            date,
            fraction_pct,
            recovery_delay_days,
        })
    }

    pub fn shipping_delay(window: DateWindow, component_ids: Vec<String>, delay_days: u32) -> Self {
        Self::ShippingDelay(ShippingDelay {
            window,
            component_ids,
            delay_days,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioModifier::DemandSurge(_) => "demand-surge",
            ScenarioModifier::CapacityLoss(_) => "capacity-loss",
            ScenarioModifier::StockWriteOff(_) => "stock-write-off",
            ScenarioModifier::ShippingDelay(_) => "shipping-delay",
        }
    }

    /// 驗證參數範圍
    pub fn validate(&self) -> Result<()> {
        let hundred = Decimal::from(100);
        match self {
            ScenarioModifier::DemandSurge(surge) => {
                surge.window.validate(self.name())?;
                if surge.increase_pct < -hundred {
                    return Err(ScmError::InvalidScenario(format!(
                        "需求激增百分比 {} 低於 -100",
                        surge.increase_pct
                    )));
                }
            }
            ScenarioModifier::CapacityLoss(loss) => {
                loss.window.validate(self.name())?;
                if loss.loss_pct < Decimal::ZERO || loss.loss_pct > hundred {
                    return Err(ScmError::InvalidScenario(format!(
                        "產能損失百分比 {} 超出 0..=100",
                        loss.loss_pct
                    )));
                }
            }
            ScenarioModifier::StockWriteOff(write_off) => {
                if write_off.fraction_pct < Decimal::ZERO || write_off.fraction_pct > hundred {
                    return Err(ScmError::InvalidScenario(format!(
                        "報廢百分比 {} 超出 0..=100",
                        write_off.fraction_pct
                    )));
                }
            }
            ScenarioModifier::ShippingDelay(delay) => {
                delay.window.validate(self.name())?;
            }
        }
        Ok(())
    }
}

/// 空列表代表全部
pub(crate) fn selects(ids: &[String], id: &str) -> bool {
    ids.is_empty() || ids.iter().any(|x| x == id)
}

impl DemandSurge {
    pub fn applies_to(&self, variant_id: &str, date: NaiveDate) -> bool {
        self.window.contains(date) && selects(&self.variant_ids, variant_id)
    }
}

impl StockWriteOff {
    pub fn applies_to(&self, component_id: &str) -> bool {
        selects(&self.component_ids, component_id)
    }
}

impl ShippingDelay {
    pub fn applies_to(&self, component_id: &str, sailing_date: NaiveDate) -> bool {
        self.window.contains(sailing_date) && selects(&self.component_ids, component_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, day).unwrap()
    }

    #[test]
    fn test_surge_selection() {
        let ScenarioModifier::DemandSurge(surge) = ScenarioModifier::demand_surge(
            DateWindow::new(d(4, 1), d(4, 30)),
            vec!["MTB-AR".to_string()],
            Decimal::from(20),
        ) else {
            unreachable!()
        };
        assert!(surge.applies_to("MTB-AR", d(4, 15)));
        assert!(!surge.applies_to("MTB-DH", d(4, 15)));
        assert!(!surge.applies_to("MTB-AR", d(5, 1)));
    }

    #[test]
    fn test_empty_ids_select_all() {
        let delay = ShippingDelay {
            window: DateWindow::single(d(3, 3)),
            component_ids: vec![],
            delay_days: 7,
        };
        assert!(delay.applies_to("SAT-FT", d(3, 3)));
        assert!(!delay.applies_to("SAT-FT", d(3, 10)));
    }

    #[test]
    fn test_validation() {
        assert!(ScenarioModifier::capacity_loss(DateWindow::new(d(3, 1), d(3, 31)), Decimal::from(150))
            .validate()
            .is_err());
        assert!(ScenarioModifier::shipping_delay(DateWindow::new(d(3, 31), d(3, 1)), vec![], 7)
            .validate()
            .is_err());
        assert!(ScenarioModifier::stock_write_off(vec![], d(6, 1), Decimal::from(25), Some(14))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_serde_tagging() {
        let modifier = ScenarioModifier::shipping_delay(DateWindow::single(d(3, 3)), vec![], 7);
        let json = serde_json::to_string(&modifier).unwrap();
        assert!(json.contains("ShippingDelay"));
        let back: ScenarioModifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, modifier);
    }
}
