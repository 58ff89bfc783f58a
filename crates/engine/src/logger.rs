//! The run logger: where a backup run reports its progress.
//!
//! Whoever triggers a run (the CLI, a scheduler) supplies one. Messages are
//! plain sentences meant for people watching the run, separate from the
//! structured `tracing` diagnostics emitted by the crates themselves.

use std::sync::Mutex;

pub trait RunLogger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards run messages to `tracing` at info and error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RunLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries().into_iter().filter(|(l, _)| *l == level).map(|(_, m)| m).collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

impl RunLogger for MemoryLogger {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_keeps_order() {
        let logger = MemoryLogger::new();
        logger.info("one");
        logger.error("two");
        logger.info("three");
        assert_eq!(
            logger.entries(),
            vec![(Level::Info, "one".into()), (Level::Error, "two".into()), (Level::Info, "three".into())]
        );
        assert_eq!(logger.messages(Level::Error), vec!["two".to_string()]);
    }
}
