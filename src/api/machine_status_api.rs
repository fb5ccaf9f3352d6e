// ==========================================
// 注塑排产管理系统 - 机台状态 API
// ==========================================
// 职责: 机台状态窗口的登记/调整/删除
// 说明: 三个操作均隐式触发平移传播 (登记→让位, 删除→回收, 调整→按方向)
// ==========================================

use std::sync::Arc;

use rust_i18n::t;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::parse_datetime;
use crate::api::smart_schedule_api::MachineStatusDto;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::MachineStatusKind;
use crate::engine::propagator::ShiftPropagator;
use crate::repository::{ActionLogRepository, MachineStatusRepository};

// ==========================================
// DTO 定义
// ==========================================

/// 登记机台状态请求 (等价 POST /api/machineStatus/)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMachineStatusRequest {
    pub machine_sn: String,
    pub kind: String, // MOLD_CHANGE / MAINTENANCE / TRIAL / BREAKDOWN
    pub plan_start_date: String,
    pub plan_end_date: String,
    pub note: Option<String>,
    pub operator: String,
}

/// 调整机台状态请求 (等价 PUT /api/machineStatus/)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMachineStatusRequest {
    pub status_id: String,
    pub new_start_date: String,
    pub new_end_date: String,
    pub operator: String,
}

/// 机台状态操作响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineStatusResponse {
    pub success: bool,
    pub message: String,
    pub status_id: String,
    pub repacked_count: usize,
}

// ==========================================
// MachineStatusApi
// ==========================================

pub struct MachineStatusApi {
    status_repo: Arc<MachineStatusRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    propagator: Arc<ShiftPropagator>,
}

impl MachineStatusApi {
    pub fn new(
        status_repo: Arc<MachineStatusRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        propagator: Arc<ShiftPropagator>,
    ) -> Self {
        Self {
            status_repo,
            action_log_repo,
            propagator,
        }
    }

    /// 登记机台状态窗口 (下游排程顺延让位)
    pub fn create_machine_status(
        &self,
        request: CreateMachineStatusRequest,
    ) -> ApiResult<MachineStatusResponse> {
        let kind = MachineStatusKind::from_str(&request.kind)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知机台状态类别: {}", request.kind)))?;
        let plan_start = parse_datetime(&request.plan_start_date)?;
        let plan_end = parse_datetime(&request.plan_end_date)?;

        let (window, outcome) = self.propagator.register_machine_status(
            &request.machine_sn,
            kind,
            plan_start,
            plan_end,
            request.note.clone(),
        )?;

        self.write_audit(
            ActionLog::new(ActionType::CreateMachineStatus, request.operator.clone())
                .with_target(window.status_id.clone())
                .with_machine(window.machine_sn.clone())
                .with_payload(&outcome),
        );

        Ok(MachineStatusResponse {
            success: true,
            message: t!("machine_status.create_success").to_string(),
            status_id: window.status_id,
            repacked_count: outcome.repacked.len(),
        })
    }

    /// 调整机台状态窗口 (下游按方向重打包)
    pub fn update_machine_status(
        &self,
        request: UpdateMachineStatusRequest,
    ) -> ApiResult<MachineStatusResponse> {
        let new_start = parse_datetime(&request.new_start_date)?;
        let new_end = parse_datetime(&request.new_end_date)?;

        let outcome =
            self.propagator
                .reschedule_machine_status(&request.status_id, new_start, new_end)?;
        let window = self.status_repo.get_by_id(&request.status_id)?;

        self.write_audit(
            ActionLog::new(ActionType::UpdateMachineStatus, request.operator.clone())
                .with_target(window.status_id.clone())
                .with_machine(window.machine_sn.clone())
                .with_payload(&outcome),
        );

        Ok(MachineStatusResponse {
            success: true,
            message: t!("machine_status.update_success").to_string(),
            status_id: window.status_id,
            repacked_count: outcome.repacked.len(),
        })
    }

    /// 删除机台状态窗口 (时间还给时间轴, 下游提前)
    pub fn delete_machine_status(
        &self,
        status_id: &str,
        operator: &str,
    ) -> ApiResult<MachineStatusResponse> {
        // 先取机台编号用于审计 (传播器内部会再做存在性与可移动校验)
        let window = self.status_repo.get_by_id(status_id)?;
        let outcome = self.propagator.remove_machine_status(status_id)?;

        self.write_audit(
            ActionLog::new(ActionType::DeleteMachineStatus, operator.to_string())
                .with_target(status_id.to_string())
                .with_machine(window.machine_sn.clone())
                .with_payload(&outcome),
        );

        Ok(MachineStatusResponse {
            success: true,
            message: t!("machine_status.delete_success").to_string(),
            status_id: status_id.to_string(),
            repacked_count: outcome.repacked.len(),
        })
    }

    /// 某机台全部状态窗口
    pub fn list_by_machine(&self, machine_sn: &str) -> ApiResult<Vec<MachineStatusDto>> {
        Ok(self
            .status_repo
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
