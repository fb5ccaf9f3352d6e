// ==========================================
// 注塑排产管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约定: 读取失败降级为默认值, 配置问题不阻断排产主链路
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 时区偏移 (分钟), 默认 480 = UTC+8 (Asia/Taipei)
pub const DEFAULT_TIMEZONE_OFFSET_MINUTES: i64 = 480;

/// 工作日推算查询视野倍率默认值
pub const DEFAULT_PROJECTION_LOOKAHEAD_MULTIPLIER: i64 = 2;

/// 节假日取数视野 (天) 默认值
pub const DEFAULT_HOLIDAY_FETCH_HORIZON_DAYS: i64 = 730;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_tables()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致, 会对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        let manager = Self { conn };
        manager.ensure_tables()?;
        Ok(manager)
    }

    fn ensure_tables(&self) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_scope (
              scope_id TEXT PRIMARY KEY,
              scope_type TEXT NOT NULL,
              scope_key TEXT NOT NULL,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              UNIQUE(scope_type, scope_key)
            );

            INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
            VALUES ('global', 'GLOBAL', 'global');

            CREATE TABLE IF NOT EXISTS config_kv (
              scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值 (公开方法, 供其他模块复用)
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (Upsert)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 整数配置读取, 解析失败/缺失时回落默认值
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_config_value(key)
            .ok()
            .flatten()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// 时区偏移 (分钟)
    ///
    /// 优先级: 环境变量 TIMEZONE_OFFSET_MINUTES > config_kv > 默认 480
    pub fn timezone_offset_minutes(&self) -> i64 {
        if let Ok(raw) = std::env::var("TIMEZONE_OFFSET_MINUTES") {
            if let Ok(v) = raw.trim().parse::<i64>() {
                return v;
            }
        }
        self.get_i64_or(
            super::config_keys::TIMEZONE_OFFSET_MINUTES,
            DEFAULT_TIMEZONE_OFFSET_MINUTES,
        )
    }

    /// 工作日推算查询视野倍率
    pub fn projection_lookahead_multiplier(&self) -> i64 {
        self.get_i64_or(
            super::config_keys::PROJECTION_LOOKAHEAD_MULTIPLIER,
            DEFAULT_PROJECTION_LOOKAHEAD_MULTIPLIER,
        )
        .max(1)
    }

    /// 节假日取数视野 (天)
    pub fn holiday_fetch_horizon_days(&self) -> i64 {
        self.get_i64_or(
            super::config_keys::HOLIDAY_FETCH_HORIZON_DAYS,
            DEFAULT_HOLIDAY_FETCH_HORIZON_DAYS,
        )
        .max(30)
    }
}
