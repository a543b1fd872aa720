// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// 构造固定时区偏移，非法值回退为 UTC+8
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600)
        .or_else(|| FixedOffset::east_opt(8 * 3600))
        .unwrap_or_else(|| Utc.fix())
}

/// 指定时区下的当前时间
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// 指定时区下的日历日
pub fn today_in(offset: FixedOffset) -> NaiveDate {
    now_in(offset).date_naive()
}

/// 索引键使用的日期格式 `YYYY-MM-DD`
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_format() {
        let day = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(day_key(day), "2025-09-01");
    }

    #[test]
    fn test_offset_from_hours() {
        assert_eq!(offset_from_hours(8).local_minus_utc(), 8 * 3600);
        assert_eq!(offset_from_hours(99).local_minus_utc(), 8 * 3600);
    }
}
