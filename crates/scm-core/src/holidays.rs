//! 預載假日表
//!
//! 德國：固定日期假日 + 以復活節推算的移動假日（任何年份皆可計算）。
//! 中國：固定日期假日任何年份可用；農曆假日只收錄 2025–2028 年，其餘年份只剩週末邏輯。

use chrono::{Duration, NaiveDate};

use crate::calendar::{Holiday, HolidayKind};

pub const COUNTRY_DE: &str = "DE";
pub const COUNTRY_CN: &str = "CN";

/// 農曆假日表：(年, 名稱, 起始月, 起始日, 天數)
const CN_LUNAR_TABLE: &[(i32, &str, u32, u32, i64)] = &[
    (2025, "春節", 1, 28, 8),
    (2025, "清明節", 4, 4, 3),
    (2025, "端午節", 5, 31, 3),
    (2026, "春節", 2, 15, 9),
    (2026, "清明節", 4, 4, 3),
    (2026, "端午節", 6, 19, 3),
    (2026, "中秋節", 9, 25, 3),
    (2027, "春節", 2, 5, 7),
    (2027, "清明節", 4, 3, 3),
    (2027, "端午節", 6, 9, 3),
    (2027, "中秋節", 9, 15, 3),
    (2028, "春節", 1, 25, 7),
    (2028, "清明節", 4, 2, 3),
    (2028, "端午節", 5, 28, 3),
];

/// 依國家代碼取得某年假日；未知國家回傳空表
pub fn holidays_for(country: &str, year: i32) -> Vec<Holiday> {
    match country {
        COUNTRY_DE => german_holidays(year),
        COUNTRY_CN => chinese_holidays(year),
        _ => Vec::new(),
    }
}

/// 復活節週日（格里曆算法）
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// 德國假日（全國 + 巴登-符騰堡邦）
pub fn german_holidays(year: i32) -> Vec<Holiday> {
    let mut holidays = Vec::new();
    let mut fixed = |month: u32, day: u32, name: &str, kind: HolidayKind| {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            holidays.push(Holiday::new(date, name, COUNTRY_DE, kind));
        }
    };

    fixed(1, 1, "Neujahr", HolidayKind::Public);
    fixed(1, 6, "Heilige Drei Könige", HolidayKind::Regional);
    fixed(5, 1, "Tag der Arbeit", HolidayKind::Public);
    fixed(10, 3, "Tag der Deutschen Einheit", HolidayKind::Public);
    fixed(11, 1, "Allerheiligen", HolidayKind::Regional);
    fixed(12, 25, "1. Weihnachtstag", HolidayKind::Public);
    fixed(12, 26, "2. Weihnachtstag", HolidayKind::Public);

    if let Some(easter) = easter_sunday(year) {
        let movable = [
            (-2, "Karfreitag", HolidayKind::Public),
            (1, "Ostermontag", HolidayKind::Public),
            (39, "Christi Himmelfahrt", HolidayKind::Public),
            (50, "Pfingstmontag", HolidayKind::Public),
            (60, "Fronleichnam", HolidayKind::Regional),
        ];
        for (offset, name, kind) in movable {
            holidays.push(Holiday::new(
                easter + Duration::days(offset),
                name,
                COUNTRY_DE,
                kind,
            ));
        }
    }

    holidays.sort_by_key(|h| h.date);
    holidays
}

/// 中國法定假日
pub fn chinese_holidays(year: i32) -> Vec<Holiday> {
    let mut holidays = Vec::new();

    let mut span = |start: Option<NaiveDate>, days: i64, name: &str| {
        if let Some(start) = start {
            for offset in 0..days {
                holidays.push(Holiday::new(
                    start + Duration::days(offset),
                    name,
                    COUNTRY_CN,
                    HolidayKind::Public,
                ));
            }
        }
    };

    span(NaiveDate::from_ymd_opt(year, 1, 1), 1, "元旦");
    span(NaiveDate::from_ymd_opt(year, 5, 1), 5, "勞動節");
    span(NaiveDate::from_ymd_opt(year, 10, 1), 7, "國慶節");

    for &(table_year, name, month, day, days) in CN_LUNAR_TABLE {
        if table_year == year {
            span(NaiveDate::from_ymd_opt(year, month, day), days, name);
        }
    }

    holidays.sort_by_key(|h| h.date);
    holidays.dedup_by_key(|h| h.date);
    holidays
}
