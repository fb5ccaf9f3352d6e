// ==========================================
// 注塑排产管理系统 - 节假日查询
// ==========================================
// 职责: 回答"某日是否节假日 / 区间内有几个节假日"
// 数据: 由 CalendarRepository 一次性取出查询视野内的节假日,
//       构建为内存有序集合, 传播期间不再访问数据库
// 降级: 日历未同步时集合为空, 按"无节假日"处理
// ==========================================

use crate::domain::calendar::HolidayEntry;
use crate::domain::types::ShiftDirection;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::ops::Bound::Excluded;

/// 内存节假日集合 (一次传播请求的只读快照)
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    days: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// 从仓储条目构建 (只保留 is_holiday 的日期)
    pub fn from_entries(entries: &[HolidayEntry]) -> Self {
        Self {
            days: entries
                .iter()
                .filter(|e| e.is_holiday)
                .map(|e| e.calendar_date)
                .collect(),
        }
    }

    /// 从日期集合构建 (测试用)
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            days: dates.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// 某日是否节假日
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.days.contains(&date)
    }

    /// 严格位于两个日期之间的节假日数 (两端排除, 参数顺序无关)
    pub fn count_strictly_between(&self, a: NaiveDate, b: NaiveDate) -> i64 {
        if a == b {
            return 0;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.days.range((Excluded(lo), Excluded(hi))).count() as i64
    }

    /// 两个时点之间的节假日数 (按日期口径)
    pub fn count_between_instants(&self, a: NaiveDateTime, b: NaiveDateTime) -> i64 {
        self.count_strictly_between(a.date(), b.date())
    }

    /// 将落在节假日上的时点按方向逐日移动, 直到落在工作日
    ///
    /// 顺延向后走, 提前向前走; 时刻 (时分秒) 保持不变
    pub fn shift_off_holiday(&self, instant: NaiveDateTime, direction: ShiftDirection) -> NaiveDateTime {
        let step = if direction.is_postpone() {
            Duration::days(1)
        } else {
            Duration::days(-1)
        };
        let mut current = instant;
        while self.is_holiday(current.date()) {
            current += step;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn dt(day: u32) -> NaiveDateTime {
        d(day).and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_count_strictly_between_excludes_endpoints() {
        let cal = HolidayCalendar::from_dates([d(5), d(10), d(15)]);
        assert_eq!(cal.count_strictly_between(d(5), d(15)), 1); // 只有 10 号
        assert_eq!(cal.count_strictly_between(d(4), d(16)), 3);
        assert_eq!(cal.count_strictly_between(d(16), d(4)), 3); // 顺序无关
        assert_eq!(cal.count_strictly_between(d(5), d(5)), 0);
    }

    #[test]
    fn test_shift_off_holiday_walks_over_consecutive_days() {
        let cal = HolidayCalendar::from_dates([d(10), d(11), d(12)]);
        assert_eq!(
            cal.shift_off_holiday(dt(10), ShiftDirection::Postpone),
            dt(13)
        );
        assert_eq!(
            cal.shift_off_holiday(dt(12), ShiftDirection::Advance),
            dt(9)
        );
        // 工作日原样返回
        assert_eq!(
            cal.shift_off_holiday(dt(9), ShiftDirection::Postpone),
            dt(9)
        );
    }

    #[test]
    fn test_empty_calendar_degrades_to_no_holidays() {
        let cal = HolidayCalendar::default();
        assert!(cal.is_empty());
        assert!(!cal.is_holiday(d(1)));
        assert_eq!(cal.count_strictly_between(d(1), d(31)), 0);
    }
}
