use crate::logger::RunLogger;
use litevault_config::ProgressConfig;
use std::time::Duration;

/// Throttled percent-complete reporting for the page loop.
///
/// Emits a 0% line on start, one line each time another `ceil(total / steps)`
/// pages are done, and a final "finished" line. Every line after the first is
/// preceded by a cooperative pause, which also yields to other tasks.
pub struct Progress<'a> {
    logger: &'a dyn RunLogger,
    total: u64,
    step: u64,
    next: u64,
    done: u64,
    pause: Duration,
}

impl<'a> Progress<'a> {
    pub fn start(logger: &'a dyn RunLogger, total: u64, settings: &ProgressConfig) -> Self {
        let step = total.div_ceil(u64::from(settings.steps.max(1))).max(1);
        logger.info("Writing to 'storage' folder .. (0% done)");
        Self {
            logger,
            total,
            step,
            next: step,
            done: 0,
            pause: settings.pause(),
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Count one more page.
    pub async fn advance(&mut self) {
        self.done += 1;
        if self.done < self.next || self.done >= self.total {
            return;
        }
        while self.next <= self.done {
            self.next += self.step;
        }
        self.pause().await;
        self.logger.info(&format!("Writing to 'storage' folder .. ({}% done)", self.percent()));
    }

    pub async fn finish(self) {
        self.pause().await;
        self.logger.info("Writing to 'storage' folder finished (100% done)");
    }

    fn percent(&self) -> u64 {
        percent(self.done, self.total)
    }

    async fn pause(&self) {
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
    }
}

/// `part` as a percentage of `whole`, rounded to the nearest integer; 0 when
/// `whole` is 0.
pub(crate) fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u64
}
