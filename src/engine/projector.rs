// ==========================================
// 注塑排产管理系统 - 工作日推算器
// ==========================================
// 职责: project_finish(start, workdays) → finish
// 算法: 初始候选 = start + workdays 个日历日; 统计严格介于 start 与
//       候选完工之间的节假日数, 补齐同样天数后重算; 迭代至两次计数
//       不变 (不动点)。计数单调不减且受查询视野约束, 必然终止。
// 越界: 视野 = workdays × 倍率 (默认2); 超出即报 LookaheadExceeded,
//       不做静默欠移
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::holiday::HolidayCalendar;
use chrono::{Duration, NaiveDateTime};

/// 默认查询视野倍率 (相对 workdays)
pub const DEFAULT_LOOKAHEAD_MULTIPLIER: i64 = 2;

pub struct WorkdayProjector<'a> {
    calendar: &'a HolidayCalendar,
    lookahead_multiplier: i64,
}

impl<'a> WorkdayProjector<'a> {
    pub fn new(calendar: &'a HolidayCalendar, lookahead_multiplier: i64) -> Self {
        Self {
            calendar,
            lookahead_multiplier: lookahead_multiplier.max(1),
        }
    }

    /// 由上机时点与需求工作日数推算完工时点
    ///
    /// 不动点迭代后, 若完工时点本身落在节假日上, 再逐日后移到工作日
    /// (保证结果起讫均不落节假日)
    pub fn project_finish(&self, start: NaiveDateTime, workdays: i64) -> EngineResult<NaiveDateTime> {
        if workdays <= 0 {
            return Err(EngineError::InvalidWindow(format!(
                "工作日数必须为正: {}",
                workdays
            )));
        }
        let lookahead_days = workdays.saturating_mul(self.lookahead_multiplier);
        let exceeded = || EngineError::LookaheadExceeded {
            start: start.to_string(),
            workdays,
            lookahead_days,
        };

        let mut holidays = 0i64;
        loop {
            let candidate = start + Duration::days(workdays + holidays);
            let recount = self
                .calendar
                .count_strictly_between(start.date(), candidate.date());
            if recount == holidays {
                // 不动点达成; 完工时点落节假日时继续逐日后移
                let mut finish = candidate;
                while self.calendar.is_holiday(finish.date()) {
                    finish += Duration::days(1);
                    if finish - start > Duration::days(lookahead_days) {
                        return Err(exceeded());
                    }
                }
                return Ok(finish);
            }
            if workdays + recount > lookahead_days {
                return Err(exceeded());
            }
            holidays = recount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn dt(m: u32, day: u32) -> NaiveDateTime {
        d(m, day).and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_no_holidays_plain_addition() {
        let cal = HolidayCalendar::default();
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        // 规格场景: 2025-03-03 上机, 5个工作日, 无节假日 → 2025-03-08 完工
        let finish = projector.project_finish(dt(3, 3), 5).expect("project");
        assert_eq!(finish, dt(3, 8));
    }

    #[test]
    fn test_single_holiday_extends_by_one_day() {
        let cal = HolidayCalendar::from_dates([d(3, 5)]);
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        let finish = projector.project_finish(dt(3, 3), 5).expect("project");
        assert_eq!(finish, dt(3, 9));
    }

    #[test]
    fn test_fixed_point_cascading_holiday() {
        // 补偿跨过 03-08 后, 边界外一天 03-09 又是节假日 → 需要第二轮迭代
        let cal = HolidayCalendar::from_dates([d(3, 5), d(3, 9)]);
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        let finish = projector.project_finish(dt(3, 3), 5).expect("project");
        assert_eq!(finish, dt(3, 10));
    }

    #[test]
    fn test_finish_never_lands_on_holiday() {
        // 不动点候选 03-08 本身是节假日 → 后移到 03-09 — 但两端排除口径下
        // 03-08 不计入 between, 需要落点修正
        let cal = HolidayCalendar::from_dates([d(3, 8)]);
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        let finish = projector.project_finish(dt(3, 3), 5).expect("project");
        assert_eq!(finish, dt(3, 9));
        assert!(!cal.is_holiday(finish.date()));
    }

    #[test]
    fn test_dense_holidays_exceed_lookahead() {
        // 连续15天节假日, 5个工作日 × 倍率2 = 视野10天 → 必须显式报错
        let dense: Vec<NaiveDate> = (4..=18).map(|day| d(3, day)).collect();
        let cal = HolidayCalendar::from_dates(dense);
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        let err = projector.project_finish(dt(3, 3), 5).unwrap_err();
        assert!(matches!(err, EngineError::LookaheadExceeded { .. }));
    }

    #[test]
    fn test_zero_workdays_rejected() {
        let cal = HolidayCalendar::default();
        let projector = WorkdayProjector::new(&cal, DEFAULT_LOOKAHEAD_MULTIPLIER);
        assert!(matches!(
            projector.project_finish(dt(3, 3), 0),
            Err(EngineError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_workday_count_property() {
        // 性质: start 与 finish 之间的非节假日天数恰为 workdays
        let cal = HolidayCalendar::from_dates([d(3, 4), d(3, 6), d(3, 11)]);
        let projector = WorkdayProjector::new(&cal, 3);
        let workdays = 7;
        let finish = projector.project_finish(dt(3, 1), workdays).expect("project");

        let mut non_holiday = 0i64;
        let mut cursor = d(3, 1) + Duration::days(1);
        while cursor <= finish.date() {
            if !cal.is_holiday(cursor) {
                non_holiday += 1;
            }
            cursor += Duration::days(1);
        }
        assert_eq!(non_holiday, workdays);
    }
}
