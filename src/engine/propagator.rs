// ==========================================
// 注塑排产管理系统 - 平移传播器
// ==========================================
// 核心算法: 单遍线性扫描的链式重打包
// - 判定方向 (顺延/提前), 计算扣除节假日后的工作时间 delta
// - 取下游有序时间轴, 逐条目令 新start = 前一条目的新end
//   (背靠背重打包, 非等量平移)
// - 排程条目按工作日重投影完工; 状态条目保持日历时长,
//   落点在节假日时按方向逐日修正
// - 机台改派 = 旧机台回收一遍 + 新机台让位一遍
// - 全部写入经 TimelineShiftRepository 单事务提交, 失败整体回滚
// 前置校验 (过去日期/节假日/空操作/已开工) 在任何写入前拒绝
// ==========================================

use crate::config::ConfigManager;
use crate::domain::machine::MachineStatusWindow;
use crate::domain::schedule::ProductionSchedule;
use crate::domain::types::{MachineStatusKind, ScheduleStatus, ShiftDirection, TimelineKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::holiday::HolidayCalendar;
use crate::engine::projector::WorkdayProjector;
use crate::engine::timeline::{TimelineEntry, TimelineFetcher};
use crate::repository::error::RepositoryError;
use crate::repository::{
    CalendarRepository, MachineRepository, MachineStatusRepository,
    ProductionScheduleRepository, ScheduleWindowUpdate, ShiftBatch, StatusWindowUpdate,
    TimelineShiftRepository,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const SECONDS_PER_DAY: i64 = 86_400;

// ==========================================
// 传播结果
// ==========================================

/// 单个条目的重打包记录 (审计与响应用)
#[derive(Debug, Clone, Serialize)]
pub struct RepackedEntry {
    pub kind: TimelineKind,
    pub entry_id: String,
    pub old_start: NaiveDateTime,
    pub old_end: NaiveDateTime,
    pub new_start: NaiveDateTime,
    pub new_end: NaiveDateTime,
}

/// 一次传播请求的结果
#[derive(Debug, Clone, Serialize)]
pub struct PropagationOutcome {
    pub direction: ShiftDirection,
    /// 扣除节假日后的工作时间移动量 (秒)
    pub working_delta_seconds: i64,
    /// 事务内实际改写的行数
    pub touched_rows: usize,
    /// 被连带重打包的下游条目 (不含被变更条目本身)
    pub repacked: Vec<RepackedEntry>,
}

/// 重打包中间计划 (含落库所需的修订号)
struct RepackedPlan {
    entry: TimelineEntry,
    new_start: NaiveDateTime,
    new_end: NaiveDateTime,
}

// ==========================================
// ShiftPropagator
// ==========================================

pub struct ShiftPropagator {
    schedule_repo: Arc<ProductionScheduleRepository>,
    status_repo: Arc<MachineStatusRepository>,
    calendar_repo: Arc<CalendarRepository>,
    machine_repo: Arc<MachineRepository>,
    shift_repo: Arc<TimelineShiftRepository>,
    fetcher: TimelineFetcher,
    config_manager: Arc<ConfigManager>,
}

impl ShiftPropagator {
    pub fn new(
        schedule_repo: Arc<ProductionScheduleRepository>,
        status_repo: Arc<MachineStatusRepository>,
        calendar_repo: Arc<CalendarRepository>,
        machine_repo: Arc<MachineRepository>,
        shift_repo: Arc<TimelineShiftRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        let fetcher = TimelineFetcher::new(schedule_repo.clone(), status_repo.clone());
        Self {
            schedule_repo,
            status_repo,
            calendar_repo,
            machine_repo,
            shift_repo,
            fetcher,
            config_manager,
        }
    }

    // ==========================================
    // 操作: 工单改排 (changeWorkOrder)
    // ==========================================

    /// 变更排程的上机日期和/或机台
    ///
    /// # 参数
    /// - `schedule_id`: 被变更排程
    /// - `new_start`: 新上机时点
    /// - `new_machine_sn`: 目标机台 (None = 保持原机台)
    ///
    /// # 红线
    /// - 已开工排程不可平移
    /// - 新上机日期不得在过去、不得落节假日、不得与原值相同 (空操作)
    /// - 全部落库在单事务内, 失败不留半套时间轴
    pub fn change_work_order(
        &self,
        schedule_id: &str,
        new_start: NaiveDateTime,
        new_machine_sn: Option<&str>,
    ) -> EngineResult<PropagationOutcome> {
        let schedule = self.schedule_repo.get_by_id(schedule_id)?;
        if !schedule.is_movable() {
            return Err(EngineError::ScheduleNotMovable(schedule_id.to_string()));
        }

        let old_start = schedule.plan_on_machine_date;
        let old_machine = schedule.machine_sn.clone();
        let target_machine = new_machine_sn.unwrap_or(&old_machine).to_string();
        let machine_changed = target_machine != old_machine;

        if machine_changed && !self.machine_repo.exists(&target_machine)? {
            return Err(RepositoryError::NotFound {
                entity: "Machine".to_string(),
                id: target_machine,
            }
            .into());
        }
        if !machine_changed && new_start == old_start {
            return Err(EngineError::SameAsOriginal);
        }

        let earliest = old_start.min(new_start);
        let calendar = self.load_calendar(earliest.date())?;
        self.validate_new_start(&calendar, new_start)?;

        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);
        let new_finish = projector.project_finish(new_start, schedule.total_work_days())?;

        let direction = if new_start >= old_start {
            ShiftDirection::Postpone
        } else {
            ShiftDirection::Advance
        };
        let delta = Self::working_delta_seconds(&calendar, old_start, new_start);

        let mut plans: Vec<RepackedPlan> = Vec::new();
        if machine_changed {
            // 旧机台: 回收留下的空洞, 下游整体拉前
            let left = self.fetcher.fetch_downstream(
                &old_machine,
                old_start,
                Some((TimelineKind::Schedule, schedule_id)),
            )?;
            plans.extend(self.repack_chain(
                &calendar,
                &projector,
                &left,
                old_start,
                ShiftDirection::Advance,
            )?);

            // 新机台: 为移入窗口让位, 下游整体推后
            let right = self.fetcher.fetch_downstream(
                &target_machine,
                new_start,
                Some((TimelineKind::Schedule, schedule_id)),
            )?;
            plans.extend(self.repack_chain(
                &calendar,
                &projector,
                &right,
                new_finish,
                ShiftDirection::Postpone,
            )?);
        } else {
            let downstream = self.fetcher.fetch_downstream(
                &old_machine,
                earliest,
                Some((TimelineKind::Schedule, schedule_id)),
            )?;
            plans.extend(self.repack_chain(&calendar, &projector, &downstream, new_finish, direction)?);
        }

        let (mut schedule_updates, status_updates, repacked) = Self::plans_to_updates(&plans);
        schedule_updates.insert(
            0,
            ScheduleWindowUpdate {
                schedule_id: schedule.schedule_id.clone(),
                new_machine_sn: if machine_changed {
                    Some(target_machine.clone())
                } else {
                    None
                },
                new_start,
                new_end: new_finish,
                new_status: None,
                expected_revision: schedule.revision,
            },
        );

        let touched = self.shift_repo.apply(&ShiftBatch {
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            schedule_id = %schedule.schedule_id,
            old_machine = %old_machine,
            new_machine = %target_machine,
            direction = %direction,
            working_delta_seconds = delta,
            touched_rows = touched,
            "工单改排完成"
        );
        Ok(PropagationOutcome {
            direction,
            working_delta_seconds: delta,
            touched_rows: touched,
            repacked,
        })
    }

    // ==========================================
    // 操作: 创建排程 (初始落位 + 让位传播)
    // ==========================================

    /// 创建新排程: 经工作日推算器给出完工时点, 下游让位后原子落库
    #[allow(clippy::too_many_arguments)]
    pub fn plan_new_schedule(
        &self,
        order_no: &str,
        machine_sn: &str,
        product_name: Option<String>,
        plan_start: NaiveDateTime,
        work_days: i64,
        mold_work_days: i64,
    ) -> EngineResult<(ProductionSchedule, PropagationOutcome)> {
        if !self.machine_repo.exists(machine_sn)? {
            return Err(RepositoryError::NotFound {
                entity: "Machine".to_string(),
                id: machine_sn.to_string(),
            }
            .into());
        }
        if mold_work_days < 0 {
            return Err(EngineError::InvalidWindow(format!(
                "上下模工作天数不得为负: {}",
                mold_work_days
            )));
        }

        let calendar = self.load_calendar(plan_start.date())?;
        self.validate_new_start(&calendar, plan_start)?;

        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);
        let plan_finish = projector.project_finish(plan_start, work_days + mold_work_days)?;

        let downstream = self.fetcher.fetch_downstream(machine_sn, plan_start, None)?;
        let plans = self.repack_chain(
            &calendar,
            &projector,
            &downstream,
            plan_finish,
            ShiftDirection::Postpone,
        )?;

        let schedule = ProductionSchedule::new(
            order_no.to_string(),
            machine_sn.to_string(),
            product_name,
            plan_start,
            plan_finish,
            work_days,
            mold_work_days,
        );

        let (schedule_updates, status_updates, repacked) = Self::plans_to_updates(&plans);
        let touched = self.shift_repo.apply(&ShiftBatch {
            schedule_insert: Some(schedule.clone()),
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            schedule_id = %schedule.schedule_id,
            machine_sn = %machine_sn,
            touched_rows = touched,
            "排程创建完成"
        );
        Ok((
            schedule,
            PropagationOutcome {
                direction: ShiftDirection::Postpone,
                working_delta_seconds: Self::working_delta_seconds(&calendar, plan_start, plan_finish),
                touched_rows: touched,
                repacked,
            },
        ))
    }

    // ==========================================
    // 操作: 取消排程 (时间还给时间轴)
    // ==========================================

    /// 取消排程: 状态置 CANCEL, 下游整体拉前补洞
    pub fn cancel_schedule(&self, schedule_id: &str) -> EngineResult<PropagationOutcome> {
        let schedule = self.schedule_repo.get_by_id(schedule_id)?;
        if !schedule.is_movable() {
            return Err(EngineError::ScheduleNotMovable(schedule_id.to_string()));
        }

        let old_start = schedule.plan_on_machine_date;
        let calendar = self.load_calendar(old_start.date())?;
        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);

        let downstream = self.fetcher.fetch_downstream(
            &schedule.machine_sn,
            old_start,
            Some((TimelineKind::Schedule, schedule_id)),
        )?;
        let plans = self.repack_chain(
            &calendar,
            &projector,
            &downstream,
            old_start,
            ShiftDirection::Advance,
        )?;

        let (mut schedule_updates, status_updates, repacked) = Self::plans_to_updates(&plans);
        schedule_updates.insert(
            0,
            ScheduleWindowUpdate {
                schedule_id: schedule.schedule_id.clone(),
                new_machine_sn: None,
                new_start: schedule.plan_on_machine_date,
                new_end: schedule.plan_finish_date,
                new_status: Some(ScheduleStatus::Cancel),
                expected_revision: schedule.revision,
            },
        );

        let touched = self.shift_repo.apply(&ShiftBatch {
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            schedule_id = %schedule.schedule_id,
            machine_sn = %schedule.machine_sn,
            touched_rows = touched,
            "排程取消完成, 下游已回收时间"
        );
        Ok(PropagationOutcome {
            direction: ShiftDirection::Advance,
            working_delta_seconds: Self::working_delta_seconds(
                &calendar,
                schedule.plan_on_machine_date,
                schedule.plan_finish_date,
            ),
            touched_rows: touched,
            repacked,
        })
    }

    // ==========================================
    // 操作: 机台状态窗口增 / 改 / 删
    // ==========================================

    /// 登记机台状态窗口: 下游让位后原子落库
    pub fn register_machine_status(
        &self,
        machine_sn: &str,
        kind: MachineStatusKind,
        plan_start: NaiveDateTime,
        plan_end: NaiveDateTime,
        note: Option<String>,
    ) -> EngineResult<(MachineStatusWindow, PropagationOutcome)> {
        if !self.machine_repo.exists(machine_sn)? {
            return Err(RepositoryError::NotFound {
                entity: "Machine".to_string(),
                id: machine_sn.to_string(),
            }
            .into());
        }
        Self::validate_window(plan_start, plan_end)?;

        let calendar = self.load_calendar(plan_start.date())?;
        self.validate_new_start(&calendar, plan_start)?;

        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);

        let downstream = self.fetcher.fetch_downstream(machine_sn, plan_start, None)?;
        let plans = self.repack_chain(
            &calendar,
            &projector,
            &downstream,
            plan_end,
            ShiftDirection::Postpone,
        )?;

        let window = MachineStatusWindow::new(
            machine_sn.to_string(),
            kind,
            plan_start,
            plan_end,
            note,
        );

        let (schedule_updates, status_updates, repacked) = Self::plans_to_updates(&plans);
        let touched = self.shift_repo.apply(&ShiftBatch {
            status_insert: Some(window.clone()),
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            status_id = %window.status_id,
            machine_sn = %machine_sn,
            kind = %kind,
            touched_rows = touched,
            "机台状态登记完成"
        );
        Ok((
            window,
            PropagationOutcome {
                direction: ShiftDirection::Postpone,
                working_delta_seconds: Self::working_delta_seconds(&calendar, plan_start, plan_end),
                touched_rows: touched,
                repacked,
            },
        ))
    }

    /// 调整机台状态窗口
    pub fn reschedule_machine_status(
        &self,
        status_id: &str,
        new_start: NaiveDateTime,
        new_end: NaiveDateTime,
    ) -> EngineResult<PropagationOutcome> {
        let window = self.status_repo.get_by_id(status_id)?;
        if !window.is_movable() {
            return Err(EngineError::StatusNotMovable(status_id.to_string()));
        }
        Self::validate_window(new_start, new_end)?;
        if new_start == window.plan_start_date && new_end == window.plan_end_date {
            return Err(EngineError::SameAsOriginal);
        }

        let old_start = window.plan_start_date;
        let earliest = old_start.min(new_start);
        let calendar = self.load_calendar(earliest.date())?;
        self.validate_new_start(&calendar, new_start)?;

        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);
        let direction = if new_start >= old_start {
            ShiftDirection::Postpone
        } else {
            ShiftDirection::Advance
        };

        let downstream = self.fetcher.fetch_downstream(
            &window.machine_sn,
            earliest,
            Some((TimelineKind::MachineStatus, status_id)),
        )?;
        let plans = self.repack_chain(&calendar, &projector, &downstream, new_end, direction)?;

        let (schedule_updates, mut status_updates, repacked) = Self::plans_to_updates(&plans);
        status_updates.insert(
            0,
            StatusWindowUpdate {
                status_id: window.status_id.clone(),
                new_start,
                new_end,
            },
        );

        let touched = self.shift_repo.apply(&ShiftBatch {
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            status_id = %window.status_id,
            machine_sn = %window.machine_sn,
            direction = %direction,
            touched_rows = touched,
            "机台状态调整完成"
        );
        Ok(PropagationOutcome {
            direction,
            working_delta_seconds: Self::working_delta_seconds(&calendar, old_start, new_start),
            touched_rows: touched,
            repacked,
        })
    }

    /// 删除机台状态窗口: 时间还给时间轴, 下游整体拉前
    pub fn remove_machine_status(&self, status_id: &str) -> EngineResult<PropagationOutcome> {
        let window = self.status_repo.get_by_id(status_id)?;
        if !window.is_movable() {
            return Err(EngineError::StatusNotMovable(status_id.to_string()));
        }

        let old_start = window.plan_start_date;
        let calendar = self.load_calendar(old_start.date())?;
        let multiplier = self.config_manager.projection_lookahead_multiplier();
        let projector = WorkdayProjector::new(&calendar, multiplier);

        let downstream = self.fetcher.fetch_downstream(
            &window.machine_sn,
            old_start,
            Some((TimelineKind::MachineStatus, status_id)),
        )?;
        let plans = self.repack_chain(
            &calendar,
            &projector,
            &downstream,
            old_start,
            ShiftDirection::Advance,
        )?;

        let (schedule_updates, status_updates, repacked) = Self::plans_to_updates(&plans);
        let touched = self.shift_repo.apply(&ShiftBatch {
            status_delete: Some(window.status_id.clone()),
            schedule_updates,
            status_updates,
            ..Default::default()
        })?;

        tracing::info!(
            status_id = %window.status_id,
            machine_sn = %window.machine_sn,
            touched_rows = touched,
            "机台状态删除完成, 下游已回收时间"
        );
        Ok(PropagationOutcome {
            direction: ShiftDirection::Advance,
            working_delta_seconds: Self::working_delta_seconds(
                &calendar,
                window.plan_start_date,
                window.plan_end_date,
            ),
            touched_rows: touched,
            repacked,
        })
    }

    // ==========================================
    // 内部: 链式重打包
    // ==========================================

    /// 对有序下游条目做链式重打包
    ///
    /// 每个条目的新 start = 前一条目的新 end (锚点为被变更窗口的边界);
    /// 排程条目按工作日重投影完工, 状态条目保持日历时长并做节假日修正
    fn repack_chain(
        &self,
        calendar: &HolidayCalendar,
        projector: &WorkdayProjector<'_>,
        entries: &[TimelineEntry],
        anchor_end: NaiveDateTime,
        direction: ShiftDirection,
    ) -> EngineResult<Vec<RepackedPlan>> {
        let mut prev_end = calendar.shift_off_holiday(anchor_end, ShiftDirection::Postpone);
        let mut plans = Vec::with_capacity(entries.len());

        for entry in entries {
            let new_start = prev_end;
            let new_end = match entry.kind {
                TimelineKind::Schedule => projector.project_finish(new_start, entry.work_days)?,
                TimelineKind::MachineStatus => {
                    let span = entry.end - entry.start;
                    let adjusted = calendar.shift_off_holiday(new_start + span, direction);
                    if adjusted <= new_start {
                        // 提前修正不得把终点走到起点之前, 此时改向后走
                        calendar.shift_off_holiday(new_start + span, ShiftDirection::Postpone)
                    } else {
                        adjusted
                    }
                }
            };
            prev_end = new_end;
            plans.push(RepackedPlan {
                entry: entry.clone(),
                new_start,
                new_end,
            });
        }
        Ok(plans)
    }

    /// 把重打包计划拆为落库更新与审计记录 (窗口未变化的条目不写库)
    fn plans_to_updates(
        plans: &[RepackedPlan],
    ) -> (
        Vec<ScheduleWindowUpdate>,
        Vec<StatusWindowUpdate>,
        Vec<RepackedEntry>,
    ) {
        let mut schedule_updates = Vec::new();
        let mut status_updates = Vec::new();
        let mut repacked = Vec::new();

        for plan in plans {
            if plan.new_start == plan.entry.start && plan.new_end == plan.entry.end {
                continue;
            }
            match plan.entry.kind {
                TimelineKind::Schedule => schedule_updates.push(ScheduleWindowUpdate {
                    schedule_id: plan.entry.entry_id.clone(),
                    new_machine_sn: None,
                    new_start: plan.new_start,
                    new_end: plan.new_end,
                    new_status: None,
                    expected_revision: plan.entry.revision,
                }),
                TimelineKind::MachineStatus => status_updates.push(StatusWindowUpdate {
                    status_id: plan.entry.entry_id.clone(),
                    new_start: plan.new_start,
                    new_end: plan.new_end,
                }),
            }
            repacked.push(RepackedEntry {
                kind: plan.entry.kind,
                entry_id: plan.entry.entry_id.clone(),
                old_start: plan.entry.start,
                old_end: plan.entry.end,
                new_start: plan.new_start,
                new_end: plan.new_end,
            });
        }
        (schedule_updates, status_updates, repacked)
    }

    // ==========================================
    // 内部: 校验与日历
    // ==========================================

    /// 工厂时区下的当日日期 (过去日期校验基准)
    fn today(&self) -> NaiveDate {
        let offset = self.config_manager.timezone_offset_minutes();
        (Utc::now() + Duration::minutes(offset)).date_naive()
    }

    fn validate_new_start(
        &self,
        calendar: &HolidayCalendar,
        new_start: NaiveDateTime,
    ) -> EngineResult<()> {
        if new_start.date() < self.today() {
            return Err(EngineError::StartInPast(new_start.date().to_string()));
        }
        if calendar.is_holiday(new_start.date()) {
            return Err(EngineError::StartOnHoliday(new_start.date().to_string()));
        }
        Ok(())
    }

    fn validate_window(start: NaiveDateTime, end: NaiveDateTime) -> EngineResult<()> {
        if end <= start {
            return Err(EngineError::InvalidWindow(format!(
                "结束 {} 不晚于开始 {}",
                end, start
            )));
        }
        Ok(())
    }

    /// 节假日取数: 自 `from` 起按配置视野取出并构建内存集合
    fn load_calendar(&self, from: NaiveDate) -> EngineResult<HolidayCalendar> {
        let horizon = self.config_manager.holiday_fetch_horizon_days();
        let entries = self.calendar_repo.find_holidays_from(from, horizon)?;
        Ok(HolidayCalendar::from_entries(&entries))
    }

    /// 扣除节假日后的工作时间移动量 (秒); 节假日不构成排程压力
    fn working_delta_seconds(
        calendar: &HolidayCalendar,
        a: NaiveDateTime,
        b: NaiveDateTime,
    ) -> i64 {
        let raw = (b - a).num_seconds().abs();
        let holidays = calendar.count_between_instants(a, b);
        (raw - holidays * SECONDS_PER_DAY).max(0)
    }
}
