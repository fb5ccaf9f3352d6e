// ==========================================
// 平移传播器集成测试
// ==========================================
// 测试目标: 工单改排 / 机台状态增删 的链式重打包
// 覆盖范围: 背靠背不变量、节假日规避、前置校验拒绝、原子回滚口径
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use injection_molding_aps::api::error::ApiError;
use injection_molding_aps::api::schedule_api::{CreateScheduleRequest, ScheduleDto};
use injection_molding_aps::api::smart_schedule_api::ChangeWorkOrderRequest;
use injection_molding_aps::api::machine_status_api::CreateMachineStatusRequest;
use injection_molding_aps::app::AppState;
use test_helpers::{at, create_test_state, iso, seed_holidays, seed_machine};

// ==========================================
// 测试辅助函数
// ==========================================

/// 经 API 创建排程并返回 DTO
fn create_schedule(
    state: &AppState,
    order_no: &str,
    machine_sn: &str,
    start_offset: i64,
    work_days: i64,
) -> ScheduleDto {
    let response = state
        .schedule_api
        .create_schedule(CreateScheduleRequest {
            order_no: order_no.to_string(),
            machine_sn: machine_sn.to_string(),
            product_name: None,
            plan_on_machine_date: iso(at(start_offset)),
            work_days,
            mold_work_days: 0,
            operator: "tester".to_string(),
        })
        .expect("Failed to create schedule");
    response.schedule
}

/// 断言机台时间轴背靠背 (entry[i].end == entry[i+1].start)
fn assert_back_to_back(state: &AppState, machine_sn: &str) {
    let schedules = state
        .schedule_api
        .list_by_machine(machine_sn)
        .expect("list schedules");
    for pair in schedules.windows(2) {
        assert_eq!(
            pair[0].plan_finish_date, pair[1].plan_on_machine_date,
            "机台{}时间轴出现空洞或重叠: {:?} → {:?}",
            machine_sn, pair[0].order_no, pair[1].order_no
        );
    }
}

// ==========================================
// 工单改排: 顺延
// ==========================================

#[test]
fn test_postpone_repacks_downstream_back_to_back() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");

    // 背靠背初始时间轴: S1[0,5) S2[5,9) S3[9,12)
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);
    let s2 = create_schedule(&state, "MO-002", "A1", 5, 4);
    let s3 = create_schedule(&state, "MO-003", "A1", 9, 3);

    // S1 顺延2天: 0 → 2 (无节假日, 完工 2+5=7)
    let response = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(2)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .expect("change work order");

    assert!(response.success);
    assert_eq!(response.direction, "POSTPONE");
    assert_eq!(response.repacked_count, 2);
    // 2个日历日的纯工作时间移动
    assert_eq!(response.working_delta_seconds, 2 * 86_400);

    let detail = |id: &str| state.schedule_api.get_schedule_detail(id).expect("detail");
    let s1_after = detail(&s1.schedule_id);
    let s2_after = detail(&s2.schedule_id);
    let s3_after = detail(&s3.schedule_id);

    assert_eq!(s1_after.plan_on_machine_date, iso(at(2)).replace('T', " "));
    assert_eq!(s1_after.plan_finish_date, iso(at(7)).replace('T', " "));
    // 下游链式重打包: S2 从 S1 新完工接续, S3 从 S2 接续
    assert_eq!(s2_after.plan_on_machine_date, s1_after.plan_finish_date);
    assert_eq!(s2_after.plan_finish_date, iso(at(11)).replace('T', " "));
    assert_eq!(s3_after.plan_on_machine_date, s2_after.plan_finish_date);

    assert_back_to_back(&state, "A1");
}

#[test]
fn test_advance_pulls_downstream_forward() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");

    let s1 = create_schedule(&state, "MO-001", "A1", 3, 5);
    let s2 = create_schedule(&state, "MO-002", "A1", 8, 4);

    // S1 提前到 day1
    let response = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(1)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .expect("change work order");

    assert_eq!(response.direction, "ADVANCE");

    let s1_after = state
        .schedule_api
        .get_schedule_detail(&s1.schedule_id)
        .expect("detail");
    let s2_after = state
        .schedule_api
        .get_schedule_detail(&s2.schedule_id)
        .expect("detail");
    assert_eq!(s1_after.plan_on_machine_date, iso(at(1)).replace('T', " "));
    assert_eq!(s1_after.plan_finish_date, iso(at(6)).replace('T', " "));
    // 下游被拉前补洞
    assert_eq!(s2_after.plan_on_machine_date, s1_after.plan_finish_date);
    assert_back_to_back(&state, "A1");
}

// ==========================================
// 节假日规避
// ==========================================

#[test]
fn test_projection_skips_holidays_and_boundaries_avoid_them() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    // day3 / day4 放假
    seed_holidays(&state, &[3, 4]);

    // 5个工作日, 跨2个节假日 → 完工 = 0 + 5 + 2 = day7
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);
    assert_eq!(s1.plan_finish_date, iso(at(7)).replace('T', " "));

    // 下游排程从 day7 接续, 起讫均不落节假日
    let s2 = create_schedule(&state, "MO-002", "A1", 7, 3);
    assert_eq!(s2.plan_on_machine_date, iso(at(7)).replace('T', " "));
    assert_eq!(s2.plan_finish_date, iso(at(10)).replace('T', " "));
}

#[test]
fn test_postpone_over_holiday_discounts_working_delta() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    seed_holidays(&state, &[1]);

    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);
    // 顺延2个日历日, 其中 day1 是节假日 → 工作时间移动只算1天
    let response = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(2)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .expect("change work order");
    assert_eq!(response.working_delta_seconds, 86_400);
}

// ==========================================
// 前置校验 (写入前拒绝)
// ==========================================

#[test]
fn test_same_start_rejected_with_400() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);

    let err = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(0)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert_eq!(err.status_code(), 400);

    // 拒绝后排程保持原样 (绝不静默重放)
    let detail = state
        .schedule_api
        .get_schedule_detail(&s1.schedule_id)
        .expect("detail");
    assert_eq!(detail.plan_on_machine_date, iso(at(0)).replace('T', " "));
    assert_eq!(detail.revision, s1.revision);
}

#[test]
fn test_start_in_past_rejected() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);

    let err = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(-60)), // 基准-60天 = 过去
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_start_on_holiday_rejected() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    seed_holidays(&state, &[2]);
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);

    let err = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(2)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_missing_schedule_rejected_with_404() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");

    let err = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: "does-not-exist".to_string(),
            new_start_date: iso(at(2)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn test_started_schedule_not_movable() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);
    state
        .schedule_api
        .report_start(&s1.schedule_id, &iso(at(0)))
        .expect("report start");

    let err = state
        .smart_schedule_api
        .change_work_order(ChangeWorkOrderRequest {
            schedule_id: s1.schedule_id.clone(),
            new_start_date: iso(at(2)),
            machine_sn: None,
            operator: "tester".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

// ==========================================
// 机台状态窗口: 登记让位 / 删除回收
// ==========================================

#[test]
fn test_machine_status_create_then_delete_roundtrip() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let s1 = create_schedule(&state, "MO-001", "A1", 2, 5);

    // 登记 day0–day2 的换模窗口: S1 从 day2 被推后到 day2(不变)?
    // 窗口终点恰为 S1 起点, 链式重打包后 S1 新起点 = day2, 无实际移动
    let create_response = state
        .machine_status_api
        .create_machine_status(CreateMachineStatusRequest {
            machine_sn: "A1".to_string(),
            kind: "MOLD_CHANGE".to_string(),
            plan_start_date: iso(at(0)),
            plan_end_date: iso(at(2)),
            note: Some("换 M-204 模具".to_string()),
            operator: "tester".to_string(),
        })
        .expect("create status");
    assert_eq!(create_response.repacked_count, 0);

    // 再登记一个 day0–day3 的故障窗口会把 S1 推到 day3
    let breakdown = state
        .machine_status_api
        .create_machine_status(CreateMachineStatusRequest {
            machine_sn: "A1".to_string(),
            kind: "BREAKDOWN".to_string(),
            plan_start_date: iso(at(0)),
            plan_end_date: iso(at(3)),
            note: None,
            operator: "tester".to_string(),
        })
        .expect("create breakdown");
    assert!(breakdown.repacked_count >= 1);

    let s1_after = state
        .schedule_api
        .get_schedule_detail(&s1.schedule_id)
        .expect("detail");
    assert!(s1_after.plan_on_machine_date > iso(at(2)).replace('T', " "));

    // 删除故障窗口: 时间还给时间轴, 下游拉前
    let delete_response = state
        .machine_status_api
        .delete_machine_status(&breakdown.status_id, "tester")
        .expect("delete status");
    assert!(delete_response.success);

    // 回收后换模窗口回到 day0–day2, S1 紧随其后回到 day2
    let s1_restored = state
        .schedule_api
        .get_schedule_detail(&s1.schedule_id)
        .expect("detail");
    assert_eq!(
        s1_restored.plan_on_machine_date,
        iso(at(2)).replace('T', " ")
    );
}

#[test]
fn test_cancel_schedule_gives_time_back() {
    let (_tmp, state) = create_test_state();
    seed_machine(&state, "A1", "一厂A区");
    let s1 = create_schedule(&state, "MO-001", "A1", 0, 5);
    let s2 = create_schedule(&state, "MO-002", "A1", 5, 4);

    let response = state
        .schedule_api
        .cancel_schedule(&s1.schedule_id, "tester")
        .expect("cancel");
    assert_eq!(response.repacked_count, 1);

    let s1_after = state
        .schedule_api
        .get_schedule_detail(&s1.schedule_id)
        .expect("detail");
    assert_eq!(s1_after.status, "CANCEL");

    // S2 拉前到被取消窗口的起点
    let s2_after = state
        .schedule_api
        .get_schedule_detail(&s2.schedule_id)
        .expect("detail");
    assert_eq!(s2_after.plan_on_machine_date, iso(at(0)).replace('T', " "));
}
