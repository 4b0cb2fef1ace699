//! 模擬配置模型
//!
//! `SimConfig` 是整條管線唯一的輸入值物件，各階段以參考方式取用，不存在全域狀態。

use chrono::{Duration, NaiveDate, Weekday};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::calendar::{CalendarService, Holiday, WorkCalendar};
use crate::holidays::{self, COUNTRY_CN, COUNTRY_DE};
use crate::{Result, ScmError};

/// 可銷售的成品變體
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    /// 年度產量佔比（0..=1）
    pub annual_share: Decimal,
    pub unit_cost: Decimal,
    pub price: Decimal,
}

impl Variant {
    pub fn new(id: &str, name: &str, annual_share: Decimal) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            annual_share,
            unit_cost: Decimal::ZERO,
            price: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置成本與售價
    pub fn with_pricing(mut self, unit_cost: Decimal, price: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self.price = price;
        self
    }

    /// 年度目標產量 = 年總量 × 佔比（四捨五入）
    pub fn annual_target(&self, annual_volume: u32) -> u32 {
        (Decimal::from(annual_volume) * self.annual_share)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(0)
    }
}

/// 採購零件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    /// 零件族（手動訂單依此平均分配）
    pub category: String,
    pub supplier_id: String,
}

impl Component {
    pub fn new(id: &str, name: &str, category: &str, supplier_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            supplier_id: supplier_id.to_string(),
        }
    }
}

/// BOM 位置（變體 → 零件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomPosition {
    pub variant_id: String,
    pub component_id: String,
    pub quantity_per_unit: u32,
}

impl BomPosition {
    pub fn new(variant_id: &str, component_id: &str, quantity_per_unit: u32) -> Self {
        Self {
            variant_id: variant_id.to_string(),
            component_id: component_id.to_string(),
            quantity_per_unit,
        }
    }
}

/// 提前期分段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTimeLegs {
    /// 供應商生產（供應商國工作日）
    pub production_days: u32,
    /// 起運港內陸運輸（供應商國工作日）
    pub origin_inland_days: u32,
    /// 海運（日曆日）
    pub ocean_transit_days: u32,
    /// 目的港內陸運輸（工廠國工作日）
    pub destination_inland_days: u32,
}

impl LeadTimeLegs {
    pub fn new(
        production_days: u32,
        origin_inland_days: u32,
        ocean_transit_days: u32,
        destination_inland_days: u32,
    ) -> Self {
        Self {
            production_days,
            origin_inland_days,
            ocean_transit_days,
            destination_inland_days,
        }
    }

    pub fn total(&self) -> u32 {
        self.production_days
            + self.origin_inland_days
            + self.ocean_transit_days
            + self.destination_inland_days
    }
}

/// 供應商停工窗口（含首尾）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownWindow {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ShutdownWindow {
    pub fn new(name: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 區間 [from, to] 是否與停工窗口重疊
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        from <= self.end && self.start <= to
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// 供應商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub country: String,
    pub legs: LeadTimeLegs,
    /// 總提前期（天），必須等於各分段合計
    pub total_lead_time_days: u32,
    pub lot_size: u32,
    /// 每週固定開船日
    pub sailing_weekday: Weekday,
    pub shutdowns: Vec<ShutdownWindow>,
}

impl Supplier {
    pub fn new(id: &str, country: &str, legs: LeadTimeLegs, lot_size: u32) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            country: country.to_string(),
            legs,
            total_lead_time_days: legs.total(),
            lot_size,
            sailing_weekday: Weekday::Wed,
            shutdowns: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_sailing_weekday(mut self, weekday: Weekday) -> Self {
        self.sailing_weekday = weekday;
        self
    }

    pub fn with_shutdown(mut self, window: ShutdownWindow) -> Self {
        self.shutdowns.push(window);
        self
    }

    /// 建構器模式：另外指定總提前期（需與分段合計一致，否則驗證失敗）
    pub fn with_total_lead_time(mut self, days: u32) -> Self {
        self.total_lead_time_days = days;
        self
    }

    pub fn shutdown_containing(&self, date: NaiveDate) -> Option<&ShutdownWindow> {
        self.shutdowns.iter().find(|w| w.contains(date))
    }
}

/// 季節分佈：12 個月的百分比
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub monthly_shares_pct: [Decimal; 12],
}

impl Seasonality {
    pub fn new(monthly_shares_pct: [Decimal; 12]) -> Self {
        Self { monthly_shares_pct }
    }

    /// 平均分佈（每月 100/12 %）
    pub fn uniform() -> Self {
        Self {
            monthly_shares_pct: [Decimal::from(100) / Decimal::from(12); 12],
        }
    }

    pub fn total_pct(&self) -> Decimal {
        self.monthly_shares_pct.iter().copied().sum()
    }

    /// 正規化後的月佔比（0..=1）
    pub fn normalized_share(&self, month: u32) -> Decimal {
        let total = self.total_pct();
        if total <= Decimal::ZERO || !(1..=12).contains(&month) {
            return Decimal::ZERO;
        }
        self.monthly_shares_pct[(month - 1) as usize] / total
    }
}

impl Default for Seasonality {
    fn default() -> Self {
        Self::uniform()
    }
}

/// 庫存策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPolicy {
    /// 期初庫存（依物料）
    pub opening_stock: BTreeMap<String, u32>,
    /// 安全庫存（ATP 保留量）
    pub safety_stock: u32,
    /// 可用天數低於此值視為偏低
    pub low_supply_days: u32,
    /// 計算存貨天數時的消耗回看窗口（日曆日）
    pub trailing_consumption_days: u32,
    /// 年底後仍有欠量時最多延伸模擬的天數
    pub post_year_cutoff_days: u32,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            opening_stock: BTreeMap::new(),
            safety_stock: 0,
            low_supply_days: 14,
            trailing_consumption_days: 30,
            post_year_cutoff_days: 120,
        }
    }
}

impl InventoryPolicy {
    /// 建構器模式：設置某物料的期初庫存
    pub fn with_opening(mut self, component_id: &str, quantity: u32) -> Self {
        self.opening_stock.insert(component_id.to_string(), quantity);
        self
    }
}

/// 訂貨策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingPolicy {
    /// 是否將訂單量取整到批量倍數（自動與手動訂單一致適用）
    pub round_to_lot_size: bool,
    /// 下單處理緩衝（日曆日）
    pub processing_buffer_days: u32,
    /// 港口等待超過此天數即發出警告
    pub long_wait_days: u32,
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self {
            round_to_lot_size: true,
            processing_buffer_days: 1,
            long_wait_days: 14,
        }
    }
}

/// 手動訂單（以零件族為單位輸入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrder {
    pub order_date: NaiveDate,
    pub family: String,
    pub quantity: u32,
}

impl ManualOrder {
    pub fn new(order_date: NaiveDate, family: &str, quantity: u32) -> Self {
        Self {
            order_date,
            family: family.to_string(),
            quantity,
        }
    }
}

/// 模擬配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// 計劃年度
    pub year: i32,
    /// 年總產量
    pub annual_volume: u32,
    /// 工廠國家
    pub plant_country: String,
    pub variants: Vec<Variant>,
    pub components: Vec<Component>,
    pub bom: Vec<BomPosition>,
    pub supplier: Supplier,
    pub seasonality: Seasonality,
    pub plant_holidays: Vec<Holiday>,
    pub supplier_holidays: Vec<Holiday>,
    pub inventory: InventoryPolicy,
    pub ordering: OrderingPolicy,
    pub manual_orders: Vec<ManualOrder>,
}

impl SimConfig {
    /// 創建新的模擬配置（無變體、無假日、平均季節分佈）
    pub fn new(year: i32, annual_volume: u32, plant_country: &str, supplier: Supplier) -> Self {
        Self {
            year,
            annual_volume,
            plant_country: plant_country.to_string(),
            variants: Vec::new(),
            components: Vec::new(),
            bom: Vec::new(),
            supplier,
            seasonality: Seasonality::uniform(),
            plant_holidays: Vec::new(),
            supplier_holidays: Vec::new(),
            inventory: InventoryPolicy::default(),
            ordering: OrderingPolicy::default(),
            manual_orders: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_bom_position(mut self, position: BomPosition) -> Self {
        self.bom.push(position);
        self
    }

    pub fn with_seasonality(mut self, seasonality: Seasonality) -> Self {
        self.seasonality = seasonality;
        self
    }

    pub fn with_plant_holidays(mut self, holidays: Vec<Holiday>) -> Self {
        self.plant_holidays = holidays;
        self
    }

    pub fn with_supplier_holidays(mut self, holidays: Vec<Holiday>) -> Self {
        self.supplier_holidays = holidays;
        self
    }

    /// 建構器模式：設置安全庫存
    pub fn with_safety_stock(mut self, stock: u32) -> Self {
        self.inventory.safety_stock = stock;
        self
    }

    pub fn with_opening_stock(mut self, component_id: &str, quantity: u32) -> Self {
        self.inventory = self.inventory.with_opening(component_id, quantity);
        self
    }

    pub fn with_post_year_cutoff(mut self, days: u32) -> Self {
        self.inventory.post_year_cutoff_days = days;
        self
    }

    /// 建構器模式：設置是否取整到批量倍數
    pub fn with_round_to_lot_size(mut self, round: bool) -> Self {
        self.ordering.round_to_lot_size = round;
        self
    }

    pub fn with_manual_order(mut self, order: ManualOrder) -> Self {
        self.manual_orders.push(order);
        self
    }

    pub fn year_start(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 1, 1)
            .ok_or_else(|| ScmError::InvalidDate(format!("年度 {} 無效", self.year)))
    }

    pub fn year_end(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 12, 31)
            .ok_or_else(|| ScmError::InvalidDate(format!("年度 {} 無效", self.year)))
    }

    /// 年度內所有日期
    pub fn days_of_year(&self) -> Result<Vec<NaiveDate>> {
        let start = self.year_start()?;
        let end = self.year_end()?;
        Ok(start.iter_days().take_while(|d| *d <= end).collect())
    }

    pub fn plant_calendar(&self) -> WorkCalendar {
        WorkCalendar::new(format!("PLANT-{}", self.plant_country), self.plant_country.clone())
            .with_holidays(self.plant_holidays.clone())
    }

    pub fn supplier_calendar(&self) -> WorkCalendar {
        WorkCalendar::new(
            format!("SUPPLIER-{}", self.supplier.id),
            self.supplier.country.clone(),
        )
        .with_holidays(self.supplier_holidays.clone())
    }

    pub fn calendar_service(&self) -> CalendarService {
        CalendarService::new()
            .with_calendar(self.plant_calendar())
            .with_calendar(self.supplier_calendar())
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// 某零件族的所有零件（依 ID 排序）
    pub fn components_in_family(&self, family: &str) -> Vec<&Component> {
        let mut members: Vec<_> = self
            .components
            .iter()
            .filter(|c| c.category == family)
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    pub fn opening_stock(&self, component_id: &str) -> u32 {
        self.inventory
            .opening_stock
            .get(component_id)
            .copied()
            .unwrap_or(0)
    }

    /// 驗證配置（任何錯誤皆為致命的配置錯誤）
    pub fn validate(&self) -> Result<()> {
        self.year_start()?;

        if self.variants.is_empty() {
            return Err(ScmError::InvalidShare("沒有任何變體".to_string()));
        }
        let mut share_sum = Decimal::ZERO;
        for variant in &self.variants {
            if variant.annual_share < Decimal::ZERO || variant.annual_share > Decimal::ONE {
                return Err(ScmError::InvalidShare(format!(
                    "變體 {} 比例 {} 超出 0..=1",
                    variant.id, variant.annual_share
                )));
            }
            share_sum += variant.annual_share;
        }
        if share_sum > Decimal::new(10001, 4) {
            return Err(ScmError::InvalidShare(format!(
                "變體比例合計 {share_sum} 超過 1"
            )));
        }

        let season_sum = self.seasonality.total_pct();
        if (season_sum - Decimal::from(100)).abs() > Decimal::new(1, 1) {
            return Err(ScmError::InvalidSeasonality { sum: season_sum });
        }

        let variant_ids: BTreeSet<&str> = self.variants.iter().map(|v| v.id.as_str()).collect();
        let component_ids: BTreeSet<&str> =
            self.components.iter().map(|c| c.id.as_str()).collect();

        for position in &self.bom {
            if !variant_ids.contains(position.variant_id.as_str()) {
                return Err(ScmError::UnknownVariant(position.variant_id.clone()));
            }
            if !component_ids.contains(position.component_id.as_str()) {
                return Err(ScmError::UnknownComponent(position.component_id.clone()));
            }
            if position.quantity_per_unit == 0 {
                return Err(ScmError::InvalidBomQuantity {
                    variant_id: position.variant_id.clone(),
                    component_id: position.component_id.clone(),
                });
            }
        }
        for variant in &self.variants {
            if !self.bom.iter().any(|p| p.variant_id == variant.id) {
                return Err(ScmError::MissingBomMapping {
                    variant_id: variant.id.clone(),
                });
            }
        }

        self.validate_supplier()?;

        for component_id in self.inventory.opening_stock.keys() {
            if !component_ids.contains(component_id.as_str()) {
                return Err(ScmError::UnknownComponent(component_id.clone()));
            }
        }
        for order in &self.manual_orders {
            if self.components_in_family(&order.family).is_empty() {
                return Err(ScmError::UnknownComponent(order.family.clone()));
            }
        }

        Ok(())
    }

    fn validate_supplier(&self) -> Result<()> {
        let supplier = &self.supplier;
        if supplier.lot_size == 0 {
            return Err(ScmError::InvalidLotSize {
                supplier_id: supplier.id.clone(),
            });
        }
        let legs_sum = supplier.legs.total();
        if legs_sum != supplier.total_lead_time_days {
            return Err(ScmError::LeadTimeMismatch {
                supplier_id: supplier.id.clone(),
                legs_sum,
                total: supplier.total_lead_time_days,
            });
        }
        for window in &supplier.shutdowns {
            if window.end < window.start {
                return Err(ScmError::MalformedShutdown {
                    name: window.name.clone(),
                    start: window.start,
                    end: window.end,
                });
            }
        }
        Ok(())
    }

    /// 從 JSON 字串載入配置
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScmError::ConfigIo(e.to_string()))
    }

    /// 從 JSON 檔案載入配置
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScmError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScmError::ConfigIo(e.to_string()))
    }

    /// 參考配置：8 款登山車共用 4 種座墊，座墊由中國單一供應商海運至德國工廠
    pub fn reference(year: i32) -> Self {
        let legs = LeadTimeLegs::new(14, 2, 30, 3);
        let mut supplier = Supplier::new("SUP-SADDLE-CN", COUNTRY_CN, legs, 500)
            .with_name("Saddle Works Dongguan")
            .with_sailing_weekday(Weekday::Wed);

        // 春節停工：春節假期前兩天起共 8 天
        if let Some(spring) = holidays::chinese_holidays(year)
            .into_iter()
            .find(|h| h.name == "春節")
        {
            supplier = supplier.with_shutdown(ShutdownWindow::new(
                "Spring Festival closure",
                spring.date - Duration::days(2),
                spring.date + Duration::days(5),
            ));
        }

        let pct = |v: i64| Decimal::from(v);
        let seasonality = Seasonality::new([
            pct(4),
            pct(6),
            pct(10),
            pct(12),
            pct(14),
            pct(13),
            pct(12),
            pct(9),
            pct(6),
            pct(5),
            pct(5),
            pct(4),
        ]);

        let share = |permille: i64| Decimal::new(permille, 3);
        let variants = [
            ("MTB-AR", "MTB Allrounder", share(300), 170, 1050),
            ("MTB-CP", "MTB Competition", share(150), 320, 1650),
            ("MTB-DH", "MTB Downhill", share(100), 420, 2100),
            ("MTB-EX", "MTB Extreme", share(70), 470, 2400),
            ("MTB-FR", "MTB Freeride", share(50), 380, 1900),
            ("MTB-MA", "MTB Marathon", share(80), 300, 1550),
            ("MTB-PF", "MTB Performance", share(120), 260, 1400),
            ("MTB-TR", "MTB Trail", share(130), 230, 1200),
        ];
        let saddles = [
            ("SAT-FT", "Fizik Tundra"),
            ("SAT-RL", "Fizik Raceline"),
            ("SAT-SP", "Fizik Spark"),
            ("SAT-SL", "Fizik Speedline"),
        ];
        let mapping = [
            ("MTB-AR", "SAT-FT"),
            ("MTB-CP", "SAT-RL"),
            ("MTB-DH", "SAT-SP"),
            ("MTB-EX", "SAT-SP"),
            ("MTB-FR", "SAT-FT"),
            ("MTB-MA", "SAT-SL"),
            ("MTB-PF", "SAT-RL"),
            ("MTB-TR", "SAT-SL"),
        ];

        let mut plant_holidays = Vec::new();
        let mut supplier_holidays = Vec::new();
        for y in (year - 1)..=(year + 1) {
            plant_holidays.extend(holidays::german_holidays(y));
            supplier_holidays.extend(holidays::chinese_holidays(y));
        }

        let mut config = SimConfig::new(year, 370_000, COUNTRY_DE, supplier)
            .with_seasonality(seasonality)
            .with_plant_holidays(plant_holidays)
            .with_supplier_holidays(supplier_holidays);

        for (id, name, share, cost, price) in variants {
            config = config.with_variant(
                Variant::new(id, name, share)
                    .with_pricing(Decimal::from(cost), Decimal::from(price)),
            );
        }
        for (id, name) in saddles {
            config = config.with_component(Component::new(id, name, "SADDLE", "SUP-SADDLE-CN"));
        }
        for (variant_id, component_id) in mapping {
            config = config.with_bom_position(BomPosition::new(variant_id, component_id, 1));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_supplier() -> Supplier {
        Supplier::new("SUP-1", "CN", LeadTimeLegs::new(5, 2, 35, 7), 500)
    }

    fn simple_config() -> SimConfig {
        SimConfig::new(2027, 1000, "DE", simple_supplier())
            .with_variant(Variant::new("V1", "Variant 1", Decimal::ONE))
            .with_component(Component::new("C1", "Saddle 1", "SADDLE", "SUP-1"))
            .with_bom_position(BomPosition::new("V1", "C1", 1))
    }

    #[test]
    fn test_reference_config_is_valid() {
        let config = SimConfig::reference(2027);
        config.validate().unwrap();

        assert_eq!(config.variants.len(), 8);
        assert_eq!(config.components.len(), 4);
        assert_eq!(config.supplier.total_lead_time_days, 49);
        assert_eq!(config.supplier.shutdowns.len(), 1);
        assert_eq!(config.supplier.shutdowns[0].days(), 8);
        assert_eq!(config.seasonality.total_pct(), Decimal::from(100));
    }

    #[test]
    fn test_variant_annual_target() {
        let variant = Variant::new("V", "V", Decimal::new(125, 3));
        assert_eq!(variant.annual_target(1000), 125);
        // 370000 × 0.3 = 111000
        let variant = Variant::new("V", "V", Decimal::new(3, 1));
        assert_eq!(variant.annual_target(370_000), 111_000);
    }

    #[test]
    fn test_missing_bom_mapping() {
        let config = simple_config().with_variant(Variant::new("V2", "V2", Decimal::ZERO));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScmError::MissingBomMapping { ref variant_id } if variant_id == "V2"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_zero_lot_size() {
        let mut config = simple_config();
        config.supplier.lot_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ScmError::InvalidLotSize { .. })
        ));
    }

    #[test]
    fn test_lead_time_mismatch() {
        let mut config = simple_config();
        config.supplier = config.supplier.with_total_lead_time(50);
        assert!(matches!(
            config.validate(),
            Err(ScmError::LeadTimeMismatch { legs_sum: 49, total: 50, .. })
        ));
    }

    #[test]
    fn test_malformed_shutdown() {
        let mut config = simple_config();
        config.supplier = config.supplier.with_shutdown(ShutdownWindow::new(
            "broken",
            NaiveDate::from_ymd_opt(2027, 2, 10).unwrap(),
            NaiveDate::from_ymd_opt(2027, 2, 3).unwrap(),
        ));
        assert!(matches!(
            config.validate(),
            Err(ScmError::MalformedShutdown { .. })
        ));
    }

    #[test]
    fn test_seasonality_must_sum_to_100() {
        let mut shares = [Decimal::from(8); 12];
        shares[0] = Decimal::from(20);
        let config = simple_config().with_seasonality(Seasonality::new(shares));
        assert!(matches!(
            config.validate(),
            Err(ScmError::InvalidSeasonality { .. })
        ));
    }

    #[test]
    fn test_rounded_uniform_shares_accepted() {
        // 8.33% × 12 = 99.96%，在容差內
        let config =
            simple_config().with_seasonality(Seasonality::new([Decimal::new(833, 2); 12]));
        config.validate().unwrap();
        assert_eq!(
            config.seasonality.normalized_share(1),
            config.seasonality.normalized_share(12)
        );
    }

    #[test]
    fn test_bom_zero_quantity() {
        let mut config = simple_config();
        config.bom[0].quantity_per_unit = 0;
        assert!(matches!(
            config.validate(),
            Err(ScmError::InvalidBomQuantity { .. })
        ));
    }

    #[test]
    fn test_manual_order_unknown_family() {
        let config = simple_config().with_manual_order(ManualOrder::new(
            NaiveDate::from_ymd_opt(2027, 1, 4).unwrap(),
            "GRIPS",
            100,
        ));
        assert!(matches!(
            config.validate(),
            Err(ScmError::UnknownComponent(ref family)) if family == "GRIPS"
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimConfig::reference(2027);
        let json = config.to_json_string().unwrap();
        let loaded = SimConfig::from_json_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.is_config_error());
    }
}
