//! 工作日曆模型
//!
//! 工廠國與供應商國各自持有獨立的日曆：同一天可能在一方是工作日、在另一方是假日。

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Result, ScmError};

/// 假日類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolidayKind {
    /// 全國法定假日
    Public,
    /// 地區性假日
    Regional,
    /// 公司停工
    CompanyClosure,
}

/// 假日
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    /// 國家代碼（如 "DE"、"CN"）
    pub country: String,
    pub kind: HolidayKind,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: &str, country: &str, kind: HolidayKind) -> Self {
        Self {
            date,
            name: name.to_string(),
            country: country.to_string(),
            kind,
        }
    }
}

/// 日曆日（按需推導，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
}

impl CalendarDay {
    pub fn is_working_day(&self) -> bool {
        !self.is_weekend && !self.is_holiday
    }
}

/// 工作日曆
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// 日曆ID
    pub calendar_id: String,

    /// 國家代碼
    pub country: String,

    /// 工作日（索引 0 = 週一, ..., 6 = 週日）
    pub working_days: [bool; 7],

    /// 假日列表（依日期排序）
    pub holidays: Vec<Holiday>,
}

impl WorkCalendar {
    /// 創建新的工作日曆（預設週一到週五為工作日）
    pub fn new(calendar_id: String, country: String) -> Self {
        Self {
            calendar_id,
            country,
            working_days: [true, true, true, true, true, false, false],
            holidays: Vec::new(),
        }
    }

    /// 僅依週末判斷的日曆（假日表未載入時的降級方案）
    pub fn weekend_only(country: &str) -> Self {
        Self::new(format!("{country}-WEEKEND-ONLY"), country.to_string())
    }

    /// 建構器模式：設置工作日
    pub fn with_working_days(mut self, working_days: [bool; 7]) -> Self {
        self.working_days = working_days;
        self
    }

    /// 建構器模式：添加假日（只收同一國家的假日）
    pub fn with_holidays(mut self, holidays: Vec<Holiday>) -> Self {
        for holiday in holidays {
            self.add_holiday(holiday);
        }
        self
    }

    /// 添加假日
    pub fn add_holiday(&mut self, holiday: Holiday) {
        if holiday.country != self.country {
            return;
        }
        match self
            .holidays
            .binary_search_by_key(&holiday.date, |h| h.date)
        {
            Ok(_) => {}
            Err(pos) => self.holidays.insert(pos, holiday),
        }
    }

    fn find_holiday(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays
            .binary_search_by_key(&date, |h| h.date)
            .ok()
            .map(|idx| &self.holidays[idx])
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        let weekday_index = date.weekday().num_days_from_monday() as usize;
        !self.working_days[weekday_index]
    }

    /// 檢查是否為工作日
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_weekend(date) && self.find_holiday(date).is_none()
    }

    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.find_holiday(date).map(|h| h.name.as_str())
    }

    pub fn calendar_day(&self, date: NaiveDate) -> CalendarDay {
        let holiday = self.find_holiday(date);
        CalendarDay {
            date,
            is_weekend: self.is_weekend(date),
            is_holiday: holiday.is_some(),
            holiday_name: holiday.map(|h| h.name.clone()),
        }
    }

    fn ensure_has_working_days(&self) -> Result<()> {
        if self.working_days.iter().any(|&w| w) {
            Ok(())
        } else {
            Err(ScmError::CalculationError(format!(
                "日曆 {} 沒有任何工作日",
                self.calendar_id
            )))
        }
    }

    /// 計算工作日（向前推算）
    pub fn add_working_days(&self, start_date: NaiveDate, days: u32) -> Result<NaiveDate> {
        self.ensure_has_working_days()?;
        let mut current = start_date;
        let mut remaining = days;

        while remaining > 0 {
            current = current
                .succ_opt()
                .ok_or_else(|| ScmError::InvalidDate(format!("{current} 之後日期溢出")))?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }

        Ok(current)
    }

    /// 計算工作日（向後推算）
    pub fn subtract_working_days(&self, start_date: NaiveDate, days: u32) -> Result<NaiveDate> {
        self.ensure_has_working_days()?;
        let mut current = start_date;
        let mut remaining = days;

        while remaining > 0 {
            current = current
                .pred_opt()
                .ok_or_else(|| ScmError::InvalidDate(format!("{current} 之前日期溢出")))?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }

        Ok(current)
    }

    /// 依正負號前後移動 n 個工作日
    pub fn shift_by_working_days(&self, date: NaiveDate, n: i32) -> Result<NaiveDate> {
        if n >= 0 {
            self.add_working_days(date, n.unsigned_abs())
        } else {
            self.subtract_working_days(date, n.unsigned_abs())
        }
    }

    /// 回退到當天或之前最近的工作日
    pub fn roll_back_to_working_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        if self.is_working_day(date) {
            Ok(date)
        } else {
            self.subtract_working_days(date, 1)
        }
    }

    /// 計算兩個日期之間的工作日數量（不含起點，含終點）
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = start;

        while current < end {
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
            if self.is_working_day(current) {
                count += 1;
            }
        }

        count
    }

    /// 某月的工作日數
    pub fn working_days_in_month(&self, year: i32, month: u32) -> u32 {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return 0;
        };
        first
            .iter_days()
            .take_while(|d| d.month() == month)
            .filter(|d| self.is_working_day(*d))
            .count() as u32
    }

    /// 獲取下一個工作日
    pub fn next_working_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.add_working_days(date, 1)
    }

    /// 獲取上一個工作日
    pub fn previous_working_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.subtract_working_days(date, 1)
    }
}

/// 多國日曆服務
///
/// 未載入的國家一律退回僅判斷週末的日曆。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarService {
    calendars: BTreeMap<String, WorkCalendar>,
}

impl CalendarService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.insert(calendar);
        self
    }

    pub fn insert(&mut self, calendar: WorkCalendar) {
        self.calendars.insert(calendar.country.clone(), calendar);
    }

    /// 取得某國日曆
    pub fn calendar(&self, country: &str) -> WorkCalendar {
        self.calendars
            .get(country)
            .cloned()
            .unwrap_or_else(|| WorkCalendar::weekend_only(country))
    }

    pub fn is_working_day(&self, date: NaiveDate, country: &str) -> bool {
        match self.calendars.get(country) {
            Some(calendar) => calendar.is_working_day(date),
            None => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }

    pub fn shift_by_working_days(
        &self,
        date: NaiveDate,
        country: &str,
        n: i32,
    ) -> Result<NaiveDate> {
        match self.calendars.get(country) {
            Some(calendar) => calendar.shift_by_working_days(date, n),
            None => WorkCalendar::weekend_only(country).shift_by_working_days(date, n),
        }
    }
}
