// ==========================================
// 注塑排产管理系统 - 时间轴读取器
// ==========================================
// 职责: 取出某机台下游必须保持非重叠的有序条目序列
// 口径: 排程 + 机台状态两类; 计划开始不早于变更窗口; 尚未实际
//       开始 (NOT_YET / 无 actual_start_date); 排除被变更条目本身;
//       按计划开始升序
// ==========================================

use crate::domain::types::TimelineKind;
use crate::repository::error::RepositoryResult;
use crate::repository::machine_status_repo::MachineStatusRepository;
use crate::repository::schedule_repo::ProductionScheduleRepository;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// 时间轴条目 (排程与机台状态的统一视图)
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub kind: TimelineKind,
    pub entry_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// 排程条目: 生产 + 上下模工作天数 (重投影用);
    /// 状态条目: 0 (平移时保持日历时长)
    pub work_days: i64,
    /// 排程条目的乐观锁修订号; 状态条目恒为 0
    pub revision: i64,
}

pub struct TimelineFetcher {
    schedule_repo: Arc<ProductionScheduleRepository>,
    status_repo: Arc<MachineStatusRepository>,
}

impl TimelineFetcher {
    pub fn new(
        schedule_repo: Arc<ProductionScheduleRepository>,
        status_repo: Arc<MachineStatusRepository>,
    ) -> Self {
        Self {
            schedule_repo,
            status_repo,
        }
    }

    /// 取出下游有序条目
    ///
    /// # 参数
    /// - `machine_sn`: 机台编号
    /// - `from`: 变更窗口起点 (含)
    /// - `exclude`: 被变更条目 (类别, id), 不参与重打包
    pub fn fetch_downstream(
        &self,
        machine_sn: &str,
        from: NaiveDateTime,
        exclude: Option<(TimelineKind, &str)>,
    ) -> RepositoryResult<Vec<TimelineEntry>> {
        let exclude_schedule = match exclude {
            Some((TimelineKind::Schedule, id)) => Some(id),
            _ => None,
        };
        let exclude_status = match exclude {
            Some((TimelineKind::MachineStatus, id)) => Some(id),
            _ => None,
        };

        let mut entries: Vec<TimelineEntry> = Vec::new();

        for schedule in self
            .schedule_repo
            .find_downstream(machine_sn, from, exclude_schedule)?
        {
            entries.push(TimelineEntry {
                kind: TimelineKind::Schedule,
                entry_id: schedule.schedule_id.clone(),
                start: schedule.plan_on_machine_date,
                end: schedule.plan_finish_date,
                work_days: schedule.total_work_days(),
                revision: schedule.revision,
            });
        }

        for window in self
            .status_repo
            .find_downstream(machine_sn, from, exclude_status)?
        {
            entries.push(TimelineEntry {
                kind: TimelineKind::MachineStatus,
                entry_id: window.status_id.clone(),
                start: window.plan_start_date,
                end: window.plan_end_date,
                work_days: 0,
                revision: 0,
            });
        }

        entries.sort_by_key(|e| e.start);
        Ok(entries)
    }
}
