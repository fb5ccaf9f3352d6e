// ==========================================
// 注塑排产管理系统 - 生产排程 API
// ==========================================
// 职责: 工单排程的创建/取消/回报/查询
// 说明: 创建与取消均经传播器原子落库 (下游让位/回收)
// ==========================================

use std::sync::Arc;

use rust_i18n::t;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::parse_datetime;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::schedule::ProductionSchedule;
use crate::engine::propagator::ShiftPropagator;
use crate::repository::{ActionLogRepository, ProductionScheduleRepository};

// ==========================================
// DTO 定义
// ==========================================

/// 排程响应 DTO (日期统一为 "YYYY-MM-DD HH:MM:SS" 字符串)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDto {
    pub schedule_id: String,
    pub order_no: String,
    pub machine_sn: String,
    pub product_name: Option<String>,
    pub plan_on_machine_date: String,
    pub plan_finish_date: String,
    pub work_days: i64,
    pub mold_work_days: i64,
    pub actual_on_machine_date: Option<String>,
    pub actual_finish_date: Option<String>,
    pub status: String,
    pub revision: i64,
}

impl From<ProductionSchedule> for ScheduleDto {
    fn from(schedule: ProductionSchedule) -> Self {
        let fmt = |dt: chrono::NaiveDateTime| dt.format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            schedule_id: schedule.schedule_id,
            order_no: schedule.order_no,
            machine_sn: schedule.machine_sn,
            product_name: schedule.product_name,
            plan_on_machine_date: fmt(schedule.plan_on_machine_date),
            plan_finish_date: fmt(schedule.plan_finish_date),
            work_days: schedule.work_days,
            mold_work_days: schedule.mold_work_days,
            actual_on_machine_date: schedule.actual_on_machine_date.map(fmt),
            actual_finish_date: schedule.actual_finish_date.map(fmt),
            status: schedule.status.as_str().to_string(),
            revision: schedule.revision,
        }
    }
}

/// 创建排程请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub order_no: String,
    pub machine_sn: String,
    pub product_name: Option<String>,
    pub plan_on_machine_date: String, // ISO-8601
    pub work_days: i64,
    pub mold_work_days: i64,
    pub operator: String,
}

/// 创建排程响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleResponse {
    pub success: bool,
    pub message: String,
    pub schedule: ScheduleDto,
    pub repacked_count: usize,
}

/// 取消排程响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelScheduleResponse {
    pub success: bool,
    pub message: String,
    pub repacked_count: usize,
}

// ==========================================
// ScheduleApi
// ==========================================

pub struct ScheduleApi {
    schedule_repo: Arc<ProductionScheduleRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    propagator: Arc<ShiftPropagator>,
}

impl ScheduleApi {
    pub fn new(
        schedule_repo: Arc<ProductionScheduleRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        propagator: Arc<ShiftPropagator>,
    ) -> Self {
        Self {
            schedule_repo,
            action_log_repo,
            propagator,
        }
    }

    /// 创建排程
    ///
    /// 完工时点由工作日推算器给出; 下游条目让位后与新排程同事务落库
    pub fn create_schedule(&self, request: CreateScheduleRequest) -> ApiResult<CreateScheduleResponse> {
        let plan_start = parse_datetime(&request.plan_on_machine_date)?;
        let (schedule, outcome) = self.propagator.plan_new_schedule(
            &request.order_no,
            &request.machine_sn,
            request.product_name.clone(),
            plan_start,
            request.work_days,
            request.mold_work_days,
        )?;

        self.write_audit(
            ActionLog::new(ActionType::CreateSchedule, request.operator.clone())
                .with_target(schedule.schedule_id.clone())
                .with_machine(schedule.machine_sn.clone())
                .with_payload(&outcome),
        );

        Ok(CreateScheduleResponse {
            success: true,
            message: t!("schedule.create_success").to_string(),
            schedule: schedule.into(),
            repacked_count: outcome.repacked.len(),
        })
    }

    /// 取消排程 (下游整体拉前补洞)
    pub fn cancel_schedule(&self, schedule_id: &str, operator: &str) -> ApiResult<CancelScheduleResponse> {
        let outcome = self.propagator.cancel_schedule(schedule_id)?;

        self.write_audit(
            ActionLog::new(ActionType::CancelSchedule, operator.to_string())
                .with_target(schedule_id.to_string())
                .with_payload(&outcome),
        );

        Ok(CancelScheduleResponse {
            success: true,
            message: t!("smart_schedule.cancel_success").to_string(),
            repacked_count: outcome.repacked.len(),
        })
    }

    /// 回报实际上机 (NOT_YET → ON_GOING, 不触发传播)
    pub fn report_start(&self, schedule_id: &str, actual_on_machine_date: &str) -> ApiResult<()> {
        let instant = parse_datetime(actual_on_machine_date)?;
        self.schedule_repo.report_start(schedule_id, instant)?;
        Ok(())
    }

    /// 回报实际完工 (ON_GOING → DONE, 不触发传播)
    pub fn report_finish(&self, schedule_id: &str, actual_finish_date: &str) -> ApiResult<()> {
        let instant = parse_datetime(actual_finish_date)?;
        self.schedule_repo.report_finish(schedule_id, instant)?;
        Ok(())
    }

    /// 排程详情
    pub fn get_schedule_detail(&self, schedule_id: &str) -> ApiResult<ScheduleDto> {
        Ok(self.schedule_repo.get_by_id(schedule_id)?.into())
    }

    /// 某机台时间轴上的全部排程
    pub fn list_by_machine(&self, machine_sn: &str) -> ApiResult<Vec<ScheduleDto>> {
        Ok(self
            .schedule_repo
            .list_by_machine(machine_sn)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// 审计写入失败不阻断主操作
    fn write_audit(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.create(&log) {
            tracing::warn!("操作日志写入失败(不阻断主操作): {}", e);
        }
    }
}
