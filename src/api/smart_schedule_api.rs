// ==========================================
// 注塑排产管理系统 - 智慧排程 API
// ==========================================
// 职责:
// 1. changeWorkOrder - 工单改排入口 (触发平移传播)
// 2. 区域时间轴视图 - 排程与机台状态按机台合并的非规范化查询 (只读)
// ==========================================

use std::sync::Arc;

use rust_i18n::t;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::parse_datetime;
use crate::api::schedule_api::ScheduleDto;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::machine::MachineStatusWindow;
use crate::engine::propagator::ShiftPropagator;
use crate::repository::{
    ActionLogRepository, MachineRepository, MachineStatusRepository,
    ProductionScheduleRepository,
};

// ==========================================
// DTO 定义
// ==========================================

/// 工单改排请求 (等价 PUT /api/smartSchedule/changeWorkOrder)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeWorkOrderRequest {
    pub schedule_id: String,
    pub new_start_date: String,      // ISO-8601
    pub machine_sn: Option<String>,  // None = 保持原机台
    pub operator: String,
}

/// 工单改排响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeWorkOrderResponse {
    pub success: bool,
    pub message: String,
    pub direction: String,
    /// 扣除节假日后的工作时间移动量 (秒)
    pub working_delta_seconds: i64,
    pub repacked_count: usize,
    pub schedule: ScheduleDto,
}

/// 机台状态响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineStatusDto {
    pub status_id: String,
    pub machine_sn: String,
    pub kind: String,
    pub plan_start_date: String,
    pub plan_end_date: String,
    pub actual_start_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub note: Option<String>,
}

impl From<MachineStatusWindow> for MachineStatusDto {
    fn from(window: MachineStatusWindow) -> Self {
        let fmt = |dt: chrono::NaiveDateTime| dt.format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            status_id: window.status_id,
            machine_sn: window.machine_sn,
            kind: window.kind.as_str().to_string(),
            plan_start_date: fmt(window.plan_start_date),
            plan_end_date: fmt(window.plan_end_date),
            actual_start_date: window.actual_start_date.map(fmt),
            actual_end_date: window.actual_end_date.map(fmt),
            note: window.note,
        }
    }
}

/// 区域时间轴查询请求 (等价 GET /api/smartSchedule/)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaTimelineRequest {
    pub production_area: String,
    pub date_from: String, // ISO-8601
    pub date_to: String,   // ISO-8601
}

/// 单机台时间轴 (排程 + 机台状态)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineTimelineDto {
    pub machine_sn: String,
    pub machine_name: String,
    pub schedules: Vec<ScheduleDto>,
    pub statuses: Vec<MachineStatusDto>,
}

// ==========================================
// SmartScheduleApi
// ==========================================

pub struct SmartScheduleApi {
    schedule_repo: Arc<ProductionScheduleRepository>,
    status_repo: Arc<MachineStatusRepository>,
    machine_repo: Arc<MachineRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    propagator: Arc<ShiftPropagator>,
}

impl SmartScheduleApi {
    pub fn new(
        schedule_repo: Arc<ProductionScheduleRepository>,
        status_repo: Arc<MachineStatusRepository>,
        machine_repo: Arc<MachineRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        propagator: Arc<ShiftPropagator>,
    ) -> Self {
        Self {
            schedule_repo,
            status_repo,
            machine_repo,
            action_log_repo,
            propagator,
        }
    }

    /// 工单改排: 变更上机日期和/或机台, 下游链式重打包
    ///
    /// # 校验 (任何写入前拒绝)
    /// - 新日期不得在过去、不得落节假日、不得与原排程相同
    /// - 已开工排程不可改排
    pub fn change_work_order(
        &self,
        request: ChangeWorkOrderRequest,
    ) -> ApiResult<ChangeWorkOrderResponse> {
        let new_start = parse_datetime(&request.new_start_date)?;
        let outcome = self.propagator.change_work_order(
            &request.schedule_id,
            new_start,
            request.machine_sn.as_deref(),
        )?;
        let schedule = self.schedule_repo.get_by_id(&request.schedule_id)?;

        let log = ActionLog::new(ActionType::ChangeWorkOrder, request.operator.clone())
            .with_target(schedule.schedule_id.clone())
            .with_machine(schedule.machine_sn.clone())
            .with_payload(&outcome)
            .with_detail(format!(
                "{} → {} ({})",
                request.schedule_id, request.new_start_date, outcome.direction
            ));
        if let Err(e) = self.action_log_repo.create(&log) {
            tracing::warn!("操作日志写入失败(不阻断主操作): {}", e);
        }

        Ok(ChangeWorkOrderResponse {
            success: true,
            message: t!("smart_schedule.change_success").to_string(),
            direction: outcome.direction.to_string(),
            working_delta_seconds: outcome.working_delta_seconds,
            repacked_count: outcome.repacked.len(),
            schedule: schedule.into(),
        })
    }

    /// 区域时间轴视图 (只读, 不触发传播)
    ///
    /// 返回该生产区域每台机台在窗口内的排程与机台状态
    pub fn get_area_timeline(
        &self,
        request: AreaTimelineRequest,
    ) -> ApiResult<Vec<MachineTimelineDto>> {
        let from = parse_datetime(&request.date_from)?;
        let to = parse_datetime(&request.date_to)?;

        let machines = self.machine_repo.list_by_area(&request.production_area)?;
        let schedules =
            self.schedule_repo
                .list_by_area_window(&request.production_area, from, to)?;
        let statuses =
            self.status_repo
                .list_by_area_window(&request.production_area, from, to)?;

        let mut timelines: Vec<MachineTimelineDto> = machines
            .into_iter()
            .map(|m| MachineTimelineDto {
                machine_sn: m.machine_sn,
                machine_name: m.machine_name,
                schedules: Vec::new(),
                statuses: Vec::new(),
            })
            .collect();

        for schedule in schedules {
            if let Some(timeline) = timelines
                .iter_mut()
                .find(|t| t.machine_sn == schedule.machine_sn)
            {
                timeline.schedules.push(schedule.into());
            }
        }
        for status in statuses {
            if let Some(timeline) = timelines
                .iter_mut()
                .find(|t| t.machine_sn == status.machine_sn)
            {
                timeline.statuses.push(status.into());
            }
        }

        Ok(timelines)
    }
}
