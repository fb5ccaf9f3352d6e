// ==========================================
// 工作日推算端到端测试
// ==========================================
// 测试目标: 排程创建路径上的完工推算 (不动点迭代 + 视野越界)
// 覆盖范围: 级联节假日、完工落点修正、LookaheadExceeded 显式拒绝
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use injection_molding_aps::api::error::ApiError;
use injection_molding_aps::api::schedule_api::CreateScheduleRequest;
use injection_molding_aps::app::AppState;
use test_helpers::{at, create_test_state, iso, seed_holidays, seed_machine};

fn create_request(start_offset: i64, work_days: i64) -> CreateScheduleRequest {
    CreateScheduleRequest {
        order_no: format!("MO-{}", work_days),
        machine_sn: "A1".to_string(),
        product_name: None,
        plan_on_machine_date: iso(at(start_offset)),
        work_days,
        mold_work_days: 0,
        operator: "tester".to_string(),
    }
}

fn finish_of(state: &AppState, request: CreateScheduleRequest) -> String {
    state
        .schedule_api
        .create_schedule(request)
        .expect("create schedule")
        .schedule
        .plan_finish_date
}

#[test]
fn test_cascading_holiday_needs_second_iteration() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    // day2 放假; 补偿一天后边界外的 day6 又是节假日
    seed_holidays(&state, &[2, 6]);

    // 5个工作日: 候选 day5 (跨1假) → day6 (又撞假) → day7
    let finish = finish_of(&state, create_request(0, 5));
    assert_eq!(finish, iso(at(7)).replace('T', " "));
}

#[test]
fn test_finish_walks_off_holiday_boundary() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    // 两端排除口径下 day5 不计入区间, 但完工落点必须修正
    seed_holidays(&state, &[5]);

    let finish = finish_of(&state, create_request(0, 5));
    assert_eq!(finish, iso(at(6)).replace('T', " "));
}

#[test]
fn test_mold_work_days_extend_projection() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");

    let response = state
        .schedule_api
        .create_schedule(CreateScheduleRequest {
            order_no: "MO-001".to_string(),
            machine_sn: "A1".to_string(),
            product_name: Some("外壳-上盖".to_string()),
            plan_on_machine_date: iso(at(0)),
            work_days: 5,
            mold_work_days: 2,
            operator: "tester".to_string(),
        })
        .expect("create schedule");
    // 生产5天 + 上下模2天 = 7个日历日 (无节假日)
    assert_eq!(
        response.schedule.plan_finish_date,
        iso(at(7)).replace('T', " ")
    );
}

#[test]
fn test_dense_holidays_fail_loudly_not_undershift() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    // 连续20天节假日 > 5工作日 × 默认倍率2 的视野
    let dense: Vec<i64> = (1..=20).collect();
    seed_holidays(&state, &dense);

    let err = state
        .schedule_api
        .create_schedule(create_request(0, 5))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    assert_eq!(err.status_code(), 400);

    // 被拒绝的排程不得落库
    let schedules = state
        .schedule_api
        .list_by_machine("A1")
        .expect("list");
    assert!(schedules.is_empty());
}

#[test]
fn test_raised_lookahead_multiplier_allows_dense_window() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let dense: Vec<i64> = (1..=6).collect();
    seed_holidays(&state, &dense);

    // 默认倍率2: 5工作日视野10天, 6连假可过 (5+6=11 > 10 则拒)
    let err = state
        .schedule_api
        .create_schedule(create_request(0, 5))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    // 调高倍率后同样的请求可以完成
    state
        .config_manager
        .set_global_config_value("projection_lookahead_multiplier", "4")
        .expect("set config");
    let finish = finish_of(&state, create_request(0, 5));
    // 6连假 + 5工作日 → 完工 day11
    assert_eq!(finish, iso(at(11)).replace('T', " "));
}
