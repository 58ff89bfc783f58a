//! Per-process context and per-run state.

use crate::layout::{self, RunKind};
use crate::timestamp::RunTime;
use derive_more::Display;
use litevault_config::Config;
use std::path::{Path, PathBuf};
use time::UtcOffset;

/// Everything a run needs that is resolved once per process.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub host_name: String,
    pub offset: UtcOffset,
}

impl Context {
    /// Resolve the host name (unless configured) and the local UTC offset.
    ///
    /// The offset can only be read reliably while the process is still single
    /// threaded, so call this before starting a multi-threaded runtime. UTC is
    /// used if it cannot be determined.
    pub fn new(config: Config) -> Self {
        let host_name = config
            .host_name
            .clone()
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned());
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Self::with(config, host_name, offset)
    }

    pub fn with(config: Config, host_name: impl Into<String>, offset: UtcOffset) -> Self {
        Self {
            config,
            host_name: host_name.into(),
            offset,
        }
    }

    pub fn source(&self) -> &Path {
        &self.config.source
    }

    /// Base name of the source database file.
    pub fn database_name(&self) -> String {
        self.config
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub(crate) fn begin(&self, kind: RunKind) -> BackupRun {
        let time = RunTime::now(self.offset);
        let destination = layout::compose(
            &self.config.backup_dir,
            &self.config.layout,
            &time.year(),
            &self.host_name,
            &self.database_name(),
            kind,
        );
        BackupRun::new(kind, time, destination)
    }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AcquiringSnapshot,
    /// Full runs only.
    Compressing,
    /// Incremental runs only, as are the two states after it.
    ChunkingAndHashing,
    WritingManifest,
    CleaningUpTemp,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether a run of `kind` may move from `self` to `next`.
    pub fn allows(&self, next: RunState, kind: RunKind) -> bool {
        use RunState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Idle, AcquiringSnapshot) => true,
            (AcquiringSnapshot, Compressing | Done) => kind == RunKind::Full,
            (Compressing, Done) => kind == RunKind::Full,
            (AcquiringSnapshot, ChunkingAndHashing) => kind == RunKind::Incremental,
            (ChunkingAndHashing, WritingManifest) | (WritingManifest, CleaningUpTemp) | (CleaningUpTemp, Done) => {
                kind == RunKind::Incremental
            },
            _ => false,
        }
    }
}

/// A single full or incremental backup run.
#[derive(Debug, Clone)]
pub struct BackupRun {
    pub kind: RunKind,
    pub time: RunTime,
    /// The `full backups` or `incremental backups` folder for this run.
    pub destination: PathBuf,
    state: RunState,
}

impl BackupRun {
    pub fn new(kind: RunKind, time: RunTime, destination: PathBuf) -> Self {
        Self {
            kind,
            time,
            destination,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Move to `next`, returning `false` (and changing nothing) if the
    /// transition is not allowed.
    pub fn transition(&mut self, next: RunState) -> bool {
        if !self.state.allows(next, self.kind) {
            tracing::warn!(kind = %self.kind, from = %self.state, to = %next, "illegal run state transition");
            return false;
        }
        tracing::debug!(kind = %self.kind, from = %self.state, to = %next, "run state");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    fn run(kind: RunKind) -> BackupRun {
        BackupRun::new(kind, RunTime::at(datetime!(2024-05-01 18:30:12.345 UTC)), PathBuf::from("/b"))
    }

    #[rstest]
    #[case(RunKind::Full, &[RunState::AcquiringSnapshot, RunState::Compressing, RunState::Done])]
    #[case(RunKind::Full, &[RunState::AcquiringSnapshot, RunState::Done])]
    #[case(RunKind::Incremental, &[
        RunState::AcquiringSnapshot,
        RunState::ChunkingAndHashing,
        RunState::WritingManifest,
        RunState::CleaningUpTemp,
        RunState::Done,
    ])]
    fn test_happy_paths(#[case] kind: RunKind, #[case] path: &[RunState]) {
        let mut run = run(kind);
        for state in path {
            assert!(run.transition(*state), "{} -> {state}", run.state());
        }
        assert_eq!(run.state(), RunState::Done);
    }

    #[rstest]
    #[case(RunKind::Full, RunState::ChunkingAndHashing)]
    #[case(RunKind::Incremental, RunState::Compressing)]
    #[case(RunKind::Incremental, RunState::Done)]
    fn test_wrong_branch_rejected(#[case] kind: RunKind, #[case] next: RunState) {
        let mut run = run(kind);
        assert!(run.transition(RunState::AcquiringSnapshot));
        assert!(!run.transition(next));
        assert_eq!(run.state(), RunState::AcquiringSnapshot);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut run = run(RunKind::Incremental);
        assert!(run.transition(RunState::AcquiringSnapshot));
        assert!(run.transition(RunState::Failed));
        assert!(!run.transition(RunState::Done));
        assert!(!run.transition(RunState::Failed));
        assert_eq!(run.state(), RunState::Failed);
    }

    #[test]
    fn test_cannot_skip_acquisition() {
        let mut run = run(RunKind::Full);
        assert!(!run.transition(RunState::Done));
        assert_eq!(run.state(), RunState::Idle);
    }

    #[test]
    fn test_context_names() {
        let config = Config {
            source: PathBuf::from("/data/app.db"),
            backup_dir: PathBuf::from("/backups"),
            ..Config::default()
        };
        let ctx = Context::with(config, "nas", UtcOffset::UTC);
        assert_eq!(ctx.database_name(), "app.db");
        let run = ctx.begin(RunKind::Incremental);
        assert!(run.destination.starts_with("/backups"));
        assert!(run.destination.ends_with("nas/app.db/incremental backups"));
    }
}
