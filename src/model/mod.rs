//! Read-only view of the build host's domain objects.
//!
//! The host owns its jobs, builds, executors and storage. Collectors only
//! read them, through the traits in this module, at scrape time. Values may
//! change between two reads of the same scrape: a build can finish while it
//! is being looked at. Collectors tolerate that and never assume a
//! consistent snapshot.
//!
//! [`snapshot`] provides plain in-memory implementations.

pub mod snapshot;

use std::fmt;
use std::io;
use std::sync::Arc;

/// Outcome of a finished build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildResult {
    /// The build succeeded.
    Success,
    /// The build succeeded but reported problems, typically failing tests.
    Unstable,
    /// The build failed.
    Failure,
    /// The build did not run, e.g. because an upstream build failed.
    NotBuilt,
    /// The build was interrupted.
    Aborted,
}

impl BuildResult {
    /// All results, in ordinal order.
    pub const ALL: [BuildResult; 5] = [
        BuildResult::Success,
        BuildResult::Unstable,
        BuildResult::Failure,
        BuildResult::NotBuilt,
        BuildResult::Aborted,
    ];

    /// Upper case name, as used in labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Aborted => "ABORTED",
        }
    }

    /// Severity ordinal, lower is better.
    pub fn ordinal(&self) -> u8 {
        match self {
            BuildResult::Success => 0,
            BuildResult::Unstable => 1,
            BuildResult::Failure => 2,
            BuildResult::NotBuilt => 3,
            BuildResult::Aborted => 4,
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StageStatus {
    NotExecuted,
    Aborted,
    Success,
    InProgress,
    PausedPendingInput,
    Failed,
    Unstable,
}

impl StageStatus {
    /// Numeric value exported for the status.
    pub fn ordinal(&self) -> u8 {
        match self {
            StageStatus::NotExecuted => 0,
            StageStatus::Aborted => 1,
            StageStatus::Success => 2,
            StageStatus::InProgress => 3,
            StageStatus::PausedPendingInput => 4,
            StageStatus::Failed => 5,
            StageStatus::Unstable => 6,
        }
    }

    /// Whether a stage with this status counts towards stage durations.
    pub fn counts_towards_duration(&self) -> bool {
        matches!(self, StageStatus::Success | StageStatus::Unstable)
    }
}

/// One node of a pipeline's stage graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    /// Display name.
    pub name: String,
    /// Current status.
    pub status: StageStatus,
    /// Time spent in the stage.
    pub duration_millis: u64,
}

impl Stage {
    /// Create a new [`Stage`].
    pub fn new(name: impl Into<String>, status: StageStatus, duration_millis: u64) -> Self {
        Stage {
            name: name.into(),
            status,
            duration_millis,
        }
    }
}

/// Test counts reported by a build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestCounts {
    /// Tests executed.
    pub total: u64,
    /// Tests that failed.
    pub failed: u64,
    /// Tests that were skipped.
    pub skipped: u64,
}

/// Covered and missed items of one coverage metric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoverageCounts {
    /// Items exercised by the tests.
    pub covered: u64,
    /// Items not exercised.
    pub missed: u64,
}

impl CoverageCounts {
    /// Create a new [`CoverageCounts`].
    pub fn new(covered: u64, missed: u64) -> Self {
        CoverageCounts { covered, missed }
    }

    /// Covered and missed items together.
    pub fn total(&self) -> u64 {
        self.covered.saturating_add(self.missed)
    }

    /// Share of covered items in percent, `-1` when there are no items.
    pub fn percent(&self) -> f64 {
        match self.total() {
            0 => -1.0,
            total => self.covered as f64 * 100.0 / total as f64,
        }
    }
}

/// Code coverage published by a build. A metric the report does not cover
/// is `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Coverage {
    pub class: Option<CoverageCounts>,
    pub branch: Option<CoverageCounts>,
    pub instruction: Option<CoverageCounts>,
    pub file: Option<CoverageCounts>,
    pub line: Option<CoverageCounts>,
}

/// A job: something that produces builds.
pub trait Job: Send + Sync {
    /// Path-like name, folders separated by `/`.
    fn full_name(&self) -> &str;

    /// Whether new builds can currently be started.
    fn is_buildable(&self) -> bool;

    /// Health score between 0 and 100.
    fn health_score(&self) -> i64;

    /// Number of builds still retained.
    fn build_count(&self) -> usize;

    /// Whether old builds are discarded by a configured policy.
    fn has_build_discarder(&self) -> bool;

    /// Most recent build, running or not.
    fn last_build(&self) -> Option<Arc<dyn Run>>;

    /// Time of the last log update, in milliseconds since the epoch.
    fn log_updated_millis(&self) -> Option<i64>;
}

/// A single build of a [`Job`].
///
/// Optional accessors return `None` when the host has no data for the build,
/// e.g. when it was never queued or published no test report.
pub trait Run: Send + Sync {
    /// Build number, unique within the job.
    fn number(&self) -> u64;

    /// Whether the build is still running.
    fn is_building(&self) -> bool;

    /// Result, `None` while running or when unknown.
    fn result(&self) -> Option<BuildResult>;

    /// Start time in milliseconds since the epoch.
    fn start_time_millis(&self) -> i64;

    /// Duration of a finished build.
    fn duration_millis(&self) -> u64;

    /// The job this build belongs to. `None` when the job no longer exists.
    fn parent(&self) -> Option<Arc<dyn Job>>;

    /// The build before this one.
    fn previous_build(&self) -> Option<Arc<dyn Run>>;

    /// Build parameters in declaration order.
    fn parameters(&self) -> Vec<(String, String)>;

    /// Time spent in the queue before the build started.
    fn queued_duration_millis(&self) -> Option<u64>;

    /// Length of the build log.
    fn log_size_bytes(&self) -> Option<u64>;

    /// Test counts, if a test report was published.
    fn test_counts(&self) -> Option<TestCounts>;

    /// Whether the executor running this build considers it stuck. `None`
    /// when no executor is attached.
    fn likely_stuck(&self) -> Option<bool>;

    /// Ordered pipeline stages. `None` for builds without an execution graph.
    fn stages(&self) -> Option<Vec<Stage>>;

    /// Code coverage, if a coverage report was published.
    fn coverage(&self) -> Option<Coverage> {
        None
    }
}

/// Enumerates the host's jobs.
pub trait JobSource: Send + Sync {
    /// Every known job, in no particular order.
    fn jobs(&self) -> Vec<Arc<dyn Job>>;
}

/// Load of the executors carrying one node label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ExecutorLoad {
    /// Node label, empty for the whole host.
    pub label: String,
    pub available: u64,
    pub busy: u64,
    pub connecting: u64,
    pub defined: u64,
    pub idle: u64,
    pub online: u64,
    pub queue_length: u64,
}

/// Reports executor load.
pub trait ExecutorSource: Send + Sync {
    /// One entry per node label.
    fn executor_loads(&self) -> Vec<ExecutorLoad>;
}

/// A first level directory of the host's home.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskItem {
    /// File store the directory lives on.
    pub file_store: String,
    /// Directory name.
    pub directory: String,
    /// Usage in KiB.
    pub usage_kib: Option<u64>,
    /// Number of files below the directory.
    pub file_count: Option<u64>,
}

/// Storage used by one job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobDiskItem {
    /// File store the job lives on.
    pub file_store: String,
    /// Full name of the job.
    pub job_name: String,
    /// URL of the job.
    pub url: String,
    /// Usage in KiB.
    pub usage_kib: Option<u64>,
}

/// A file store backing the host's storage.
pub trait FileStore: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Bytes available to the host.
    fn usable_space(&self) -> io::Result<u64>;

    /// Capacity in bytes.
    fn total_space(&self) -> io::Result<u64>;
}

/// Result of the host's last disk usage calculation.
#[derive(Clone, Default)]
pub struct DiskUsage {
    /// Top level directories.
    pub directories: Vec<DiskItem>,
    /// Per job usage.
    pub jobs: Vec<JobDiskItem>,
    /// File stores in use.
    pub file_stores: Vec<Arc<dyn FileStore>>,
}

impl fmt::Debug for DiskUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskUsage")
            .field("directories", &self.directories)
            .field("jobs", &self.jobs)
            .field("file_stores", &self.file_stores.len())
            .finish()
    }
}

/// Reports disk usage.
pub trait DiskUsageSource: Send + Sync {
    /// `None` until the host has calculated usage at least once.
    fn disk_usage(&self) -> Option<DiskUsage>;
}

/// Reports the state of the host itself.
pub trait HostStatus: Send + Sync {
    /// Whether the host stopped accepting new builds.
    fn is_quieting_down(&self) -> bool;

    /// Time since the host started.
    fn uptime_millis(&self) -> u64;

    /// Application version, if known.
    fn version(&self) -> Option<String>;

    /// Number of nodes currently online.
    fn nodes_online(&self) -> usize;
}
