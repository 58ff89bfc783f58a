use crate::logger::RunLogger;
use crate::progress::percent;

const MEGABYTE: f64 = 1_048_576.0;

/// What an incremental run added to the backup folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    pub pages_total: u64,
    /// Pages that were not yet in the store (dedup misses).
    pub pages_written_new: u64,
    pub page_size: u32,
    pub manifest_bytes: u64,
}

impl Statistics {
    pub fn percentage_written(&self) -> u64 {
        percent(self.pages_written_new, self.pages_total)
    }

    pub fn bytes_added_to_store(&self) -> u64 {
        self.pages_written_new * u64::from(self.page_size)
    }

    pub fn megabytes_added_to_store(&self) -> f64 {
        megabytes(self.bytes_added_to_store())
    }

    pub fn manifest_megabytes(&self) -> f64 {
        megabytes(self.manifest_bytes)
    }

    pub fn log(&self, logger: &dyn RunLogger) {
        logger.info(&format!(
            "{} of {} Snapshot Pages ({}%) written to 'storage' folder",
            self.pages_written_new,
            self.pages_total,
            self.percentage_written()
        ));
        if self.pages_written_new != self.pages_total {
            logger.info(
                "Fewer pages were written than the snapshot holds: the others were already in 'storage', \
                 either from earlier runs or because the database contains duplicate pages",
            );
        }
        let (added, manifest) = (self.megabytes_added_to_store(), self.manifest_megabytes());
        logger.info(&format!(
            "{added:.3} MB added to 'storage' + Snapshot file {manifest:.3} MB = Total {:.3} MB",
            added + manifest
        ));
    }
}

/// Bytes as megabytes (MiB), rounded to three decimals.
fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / MEGABYTE * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Level, MemoryLogger};

    #[test]
    fn test_fresh_store() {
        let stats = Statistics {
            pages_total: 100,
            pages_written_new: 100,
            page_size: 4096,
            manifest_bytes: 7000,
        };
        assert_eq!(stats.percentage_written(), 100);
        assert_eq!(stats.bytes_added_to_store(), 409_600);
        assert_eq!(stats.megabytes_added_to_store(), 0.391);

        let logger = MemoryLogger::new();
        stats.log(&logger);
        let lines = logger.messages(Level::Info);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "100 of 100 Snapshot Pages (100%) written to 'storage' folder");
        assert_eq!(lines[1], "0.391 MB added to 'storage' + Snapshot file 0.007 MB = Total 0.398 MB");
    }

    #[test]
    fn test_partial_write_adds_note() {
        let stats = Statistics {
            pages_total: 100,
            pages_written_new: 70,
            page_size: 4096,
            manifest_bytes: 0,
        };
        let logger = MemoryLogger::new();
        stats.log(&logger);
        let lines = logger.messages(Level::Info);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("(70%)"));
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = Statistics::default();
        assert_eq!(stats.percentage_written(), 0);
        assert_eq!(stats.bytes_added_to_store(), 0);
    }
}
