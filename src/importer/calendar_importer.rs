// ==========================================
// 注塑排产管理系统 - 节假日历导入器
// ==========================================
// 职责: 解析政府开放数据的节假日文件 (CSV / JSON), 清洗后写入 calendar 表
// 容错: 逐行解析, 坏行计入 skipped 并 warn, 不中断整文件
// ==========================================

use crate::domain::calendar::HolidayEntry;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::CalendarRepository;
use chrono::{NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// 导入统计
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CalendarImportSummary {
    pub imported: usize, // 成功写库条数
    pub skipped: usize,  // 坏行/重复行条数
}

/// JSON 文件中的单条记录
#[derive(Debug, Deserialize)]
struct JsonCalendarRecord {
    date: String,
    #[serde(default, rename = "isHoliday")]
    is_holiday: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct CalendarImporter {
    calendar_repo: Arc<CalendarRepository>,
}

impl CalendarImporter {
    pub fn new(calendar_repo: Arc<CalendarRepository>) -> Self {
        Self { calendar_repo }
    }

    /// 按扩展名分派解析并写库
    pub fn import_file(&self, file_path: &Path) -> ImportResult<CalendarImportSummary> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let (entries, skipped) = match ext.as_str() {
            "csv" => self.parse_csv(file_path)?,
            "json" => self.parse_json(file_path)?,
            other => return Err(ImportError::UnsupportedFormat(other.to_string())),
        };

        let imported = self.calendar_repo.upsert_many(&entries)?;
        tracing::info!(
            file = %file_path.display(),
            imported = imported,
            skipped = skipped,
            "节假日历导入完成"
        );
        Ok(CalendarImportSummary { imported, skipped })
    }

    /// 解析 CSV: 必需列 date, 可选列 is_holiday / description
    ///
    /// is_holiday 缺失时按 1 处理 (政府节假日文件常只列放假日)
    fn parse_csv(&self, file_path: &Path) -> ImportResult<(Vec<HolidayEntry>, usize)> {
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let date_idx = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| ImportError::MissingColumn("date".to_string()))?;
        let holiday_idx = headers.iter().position(|h| h == "is_holiday");
        let desc_idx = headers.iter().position(|h| h == "description");

        let mut dedup: BTreeMap<NaiveDate, HolidayEntry> = BTreeMap::new();
        let mut skipped = 0usize;

        for (row_idx, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(row = row_idx + 2, "CSV 行解析失败, 已跳过: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            let raw_date = record.get(date_idx).unwrap_or("").trim();
            if raw_date.is_empty() {
                skipped += 1;
                continue;
            }
            let date = match NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    tracing::warn!(
                        row = row_idx + 2,
                        value = raw_date,
                        "日期格式错误, 已跳过 (期望 YYYY-MM-DD)"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let is_holiday = holiday_idx
                .and_then(|idx| record.get(idx))
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "Y"))
                .unwrap_or(true);
            let description = desc_idx
                .and_then(|idx| record.get(idx))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            if dedup
                .insert(
                    date,
                    HolidayEntry {
                        calendar_date: date,
                        is_holiday,
                        description,
                        synced_at: Utc::now().naive_utc(),
                    },
                )
                .is_some()
            {
                // 同一文件内重复日期: 保留后者, 计入 skipped
                skipped += 1;
            }
        }

        Ok((dedup.into_values().collect(), skipped))
    }

    /// 解析 JSON: 顶层数组 [{date, isHoliday, description}]
    fn parse_json(&self, file_path: &Path) -> ImportResult<(Vec<HolidayEntry>, usize)> {
        let raw = std::fs::read_to_string(file_path)?;
        let records: Vec<JsonCalendarRecord> = serde_json::from_str(&raw)?;

        let mut dedup: BTreeMap<NaiveDate, HolidayEntry> = BTreeMap::new();
        let mut skipped = 0usize;

        for (row_idx, record) in records.into_iter().enumerate() {
            let date = match NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    tracing::warn!(
                        row = row_idx,
                        value = %record.date,
                        "日期格式错误, 已跳过 (期望 YYYY-MM-DD)"
                    );
                    skipped += 1;
                    continue;
                }
            };
            if dedup
                .insert(
                    date,
                    HolidayEntry {
                        calendar_date: date,
                        is_holiday: record.is_holiday,
                        description: record.description.filter(|d| !d.trim().is_empty()),
                        synced_at: Utc::now().naive_utc(),
                    },
                )
                .is_some()
            {
                skipped += 1;
            }
        }

        Ok((dedup.into_values().collect(), skipped))
    }
}
