//! 交期計算：多段提前期的逆推與順推
//!
//! 生產與內陸運輸以工作日計（生產與起運段用供應商日曆，目的地內陸段用工廠日曆），
//! 海運以日曆天計；開船只在固定的星期幾。

use chrono::{Datelike, Duration, NaiveDate};
use scm_core::{Result, ShutdownWindow, Supplier, WorkCalendar};

/// 由需求日逆推出的補貨排程
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSchedule {
    pub need_date: NaiveDate,
    /// 必須到廠的日期（需求日前一個工廠工作日）
    pub arrival_date: NaiveDate,
    pub destination_port_date: NaiveDate,
    pub sailing_date: NaiveDate,
    pub truck_start_date: NaiveDate,
    pub production_start_date: NaiveDate,
    /// 停工調整前的下單日
    pub nominal_order_date: NaiveDate,
    pub order_date: NaiveDate,
    pub pulled_for_shutdown: bool,
    pub at_risk: bool,
}

/// 交期計算器
pub struct LeadTimeCalculator<'a> {
    supplier: &'a Supplier,
    plant: &'a WorkCalendar,
    origin: &'a WorkCalendar,
    processing_buffer_days: u32,
}

impl<'a> LeadTimeCalculator<'a> {
    pub fn new(
        supplier: &'a Supplier,
        plant: &'a WorkCalendar,
        origin: &'a WorkCalendar,
        processing_buffer_days: u32,
    ) -> Self {
        Self {
            supplier,
            plant,
            origin,
            processing_buffer_days,
        }
    }

    pub fn supplier(&self) -> &Supplier {
        self.supplier
    }

    /// 逆推：需求日 → 下單日
    pub fn schedule_for_need(&self, need_date: NaiveDate) -> Result<OrderSchedule> {
        let legs = &self.supplier.legs;

        let arrival_date = self
            .plant
            .roll_back_to_working_day(need_date - Duration::days(1))?;
        let destination_port_date = self
            .plant
            .subtract_working_days(arrival_date, legs.destination_inland_days)?;
        let latest_sailing =
            destination_port_date - Duration::days(legs.ocean_transit_days as i64);
        let sailing_date = self.sailing_on_or_before(latest_sailing);
        let truck_start_date = self
            .origin
            .subtract_working_days(sailing_date, legs.origin_inland_days)?;
        let production_start_date = self
            .origin
            .subtract_working_days(truck_start_date, legs.production_days)?;
        let nominal_order_date = self.origin.roll_back_to_working_day(
            production_start_date - Duration::days(self.processing_buffer_days as i64),
        )?;

        let order_date = self.pull_before_shutdowns(nominal_order_date)?;
        let pulled_for_shutdown = order_date != nominal_order_date;
        let at_risk = pulled_for_shutdown
            || self
                .supplier
                .shutdowns
                .iter()
                .any(|w| w.overlaps(order_date, sailing_date));

        Ok(OrderSchedule {
            need_date,
            arrival_date,
            destination_port_date,
            sailing_date,
            truck_start_date,
            production_start_date,
            nominal_order_date,
            order_date,
            pulled_for_shutdown,
            at_risk,
        })
    }

    /// 下單日落在停工窗口時，提前到窗口開始前的最後一個工作日
    fn pull_before_shutdowns(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut current = date;
        // 相鄰窗口可能需要連續提前
        for _ in 0..=self.supplier.shutdowns.len() {
            match self.supplier.shutdown_containing(current) {
                Some(window) => current = self.last_working_day_before(window)?,
                None => break,
            }
        }
        Ok(current)
    }

    fn last_working_day_before(&self, window: &ShutdownWindow) -> Result<NaiveDate> {
        self.origin.subtract_working_days(window.start, 1)
    }

    /// 順推：下單日 → 貨物抵達起運港
    pub fn port_ready_date(&self, order_date: NaiveDate) -> Result<NaiveDate> {
        let legs = &self.supplier.legs;
        let production_start = order_date + Duration::days(self.processing_buffer_days as i64);
        self.origin
            .add_working_days(production_start, legs.production_days + legs.origin_inland_days)
    }

    /// 開船日 → (到廠日, 可用日)
    pub fn arrival_for_sailing(&self, sailing_date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let legs = &self.supplier.legs;
        let port_date = sailing_date + Duration::days(legs.ocean_transit_days as i64);
        let arrival = self
            .plant
            .add_working_days(port_date, legs.destination_inland_days)?;
        Ok((arrival, arrival + Duration::days(1)))
    }

    /// 當天或之後的第一個開船日
    pub fn sailing_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        let target = self.supplier.sailing_weekday.num_days_from_monday() as i64;
        let current = date.weekday().num_days_from_monday() as i64;
        date + Duration::days((target - current).rem_euclid(7))
    }

    /// 當天或之前的最後一個開船日
    pub fn sailing_on_or_before(&self, date: NaiveDate) -> NaiveDate {
        let target = self.supplier.sailing_weekday.num_days_from_monday() as i64;
        let current = date.weekday().num_days_from_monday() as i64;
        date - Duration::days((current - target).rem_euclid(7))
    }

    /// 下單後最早可用日（順推完整管線）
    pub fn earliest_available_date(&self, order_date: NaiveDate) -> Result<NaiveDate> {
        let ready = self.port_ready_date(order_date)?;
        let sailing = self.sailing_on_or_after(ready);
        Ok(self.arrival_for_sailing(sailing)?.1)
    }
}
