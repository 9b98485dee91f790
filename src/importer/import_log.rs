// ==========================================
// 骑手周结算系统 - 导入过程日志
// ==========================================
// 职责: 收集单次导入的可读日志，随结果返回给调用方
// 说明: 每条日志同时经由 tracing 输出；实例随请求创建，不跨请求共享
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportLog {
    entries: Vec<LogEntry>,
}

impl ImportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "import", "{}", message);
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "import", "{}", message);
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(target: "import", "{}", message);
        self.push(LogLevel::Error, message);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(LogEntry {
            at: Utc::now(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.level == LogLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let mut log = ImportLog::new();
        log.info("시작");
        log.warn("시트 없음");
        log.error("저장 실패");

        assert_eq!(log.len(), 3);
        assert_eq!(log.lines(), vec!["시작", "시트 없음", "저장 실패"]);
        assert_eq!(log.entries()[1].level, LogLevel::Warn);
        assert!(log.has_errors());
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = ImportLog::new();
        let b = ImportLog::new();
        a.info("only a");
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
