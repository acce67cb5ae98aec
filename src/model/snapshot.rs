//! In-memory implementations of the model traits.
//!
//! Hosts that copy their state into plain values before a scrape can use
//! these types directly. They are also what the tests and benches run
//! against.
//!
//! ```
//! # use build_exporter::model::{BuildResult, Job, Run};
//! # use build_exporter::model::snapshot::{JobInfo, JobSnapshot, RunInfo};
//! let job = JobSnapshot::new(
//!     JobInfo::new("team/service/main"),
//!     vec![
//!         RunInfo::completed(1, BuildResult::Success).duration(1_000),
//!         RunInfo::running(2),
//!     ],
//! );
//!
//! let last = job.last_build().unwrap();
//! assert!(last.is_building());
//! assert_eq!(1, last.previous_build().unwrap().number());
//! assert_eq!("team/service/main", last.parent().unwrap().full_name());
//! ```

use std::io;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{
    BuildResult, Coverage, DiskUsage, DiskUsageSource, ExecutorLoad, ExecutorSource, FileStore,
    HostStatus, Job, JobSource, Run, Stage, TestCounts,
};

/// Attributes of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobInfo {
    /// Path-like name.
    pub full_name: String,
    /// Whether new builds can be started.
    pub buildable: bool,
    /// Health score between 0 and 100.
    pub health_score: i64,
    /// Whether a build discarder is configured.
    pub has_build_discarder: bool,
    /// Last log update, milliseconds since the epoch.
    pub log_updated_millis: Option<i64>,
}

impl JobInfo {
    /// A buildable, healthy job without discarder.
    pub fn new(full_name: impl Into<String>) -> Self {
        JobInfo {
            full_name: full_name.into(),
            buildable: true,
            health_score: 100,
            has_build_discarder: false,
            log_updated_millis: None,
        }
    }

    /// Set whether the job is buildable.
    pub fn buildable(mut self, buildable: bool) -> Self {
        self.buildable = buildable;
        self
    }

    /// Set the health score.
    pub fn health_score(mut self, score: i64) -> Self {
        self.health_score = score;
        self
    }

    /// Set whether a build discarder is configured.
    pub fn build_discarder(mut self, active: bool) -> Self {
        self.has_build_discarder = active;
        self
    }

    /// Set the last log update time.
    pub fn log_updated(mut self, millis: i64) -> Self {
        self.log_updated_millis = Some(millis);
        self
    }
}

/// Attributes of a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct RunInfo {
    pub number: u64,
    pub building: bool,
    pub result: Option<BuildResult>,
    pub start_time_millis: i64,
    pub duration_millis: u64,
    pub parameters: Vec<(String, String)>,
    pub queued_duration_millis: Option<u64>,
    pub log_size_bytes: Option<u64>,
    pub test_counts: Option<TestCounts>,
    pub likely_stuck: Option<bool>,
    pub stages: Option<Vec<Stage>>,
    pub coverage: Option<Coverage>,
}

impl RunInfo {
    /// A finished build with the given result.
    pub fn completed(number: u64, result: BuildResult) -> Self {
        RunInfo {
            number,
            result: Some(result),
            ..Default::default()
        }
    }

    /// A build that is still running.
    pub fn running(number: u64) -> Self {
        RunInfo {
            number,
            building: true,
            ..Default::default()
        }
    }

    /// Set the start time.
    pub fn started_at(mut self, millis: i64) -> Self {
        self.start_time_millis = millis;
        self
    }

    /// Set the duration.
    pub fn duration(mut self, millis: u64) -> Self {
        self.duration_millis = millis;
        self
    }

    /// Add a build parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Set the time spent queued.
    pub fn queued(mut self, millis: u64) -> Self {
        self.queued_duration_millis = Some(millis);
        self
    }

    /// Set the log length.
    pub fn log_size(mut self, bytes: u64) -> Self {
        self.log_size_bytes = Some(bytes);
        self
    }

    /// Attach a test report.
    pub fn tests(mut self, counts: TestCounts) -> Self {
        self.test_counts = Some(counts);
        self
    }

    /// Attach an executor with the given stuck flag.
    pub fn executor(mut self, likely_stuck: bool) -> Self {
        self.likely_stuck = Some(likely_stuck);
        self
    }

    /// Attach a stage graph.
    pub fn stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Attach a coverage report.
    pub fn coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = Some(coverage);
        self
    }
}

/// A job together with its retained builds.
#[derive(Debug)]
pub struct JobSnapshot {
    info: JobInfo,
    builds: Vec<Arc<RunSnapshot>>,
}

impl JobSnapshot {
    /// Create a job owning the given builds. Builds are ordered by number,
    /// each linked to the one before it.
    pub fn new(info: JobInfo, mut runs: Vec<RunInfo>) -> Arc<Self> {
        runs.sort_by_key(|run| run.number);

        Arc::new_cyclic(|parent| {
            let mut builds: Vec<Arc<RunSnapshot>> = Vec::with_capacity(runs.len());
            for run in runs {
                let previous = builds.last().cloned();
                builds.push(Arc::new(RunSnapshot {
                    info: run,
                    parent: parent.clone(),
                    previous,
                }));
            }
            JobSnapshot { info, builds }
        })
    }

    /// The job's attributes.
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    /// Retained builds, oldest first.
    pub fn builds(&self) -> &[Arc<RunSnapshot>] {
        &self.builds
    }

    /// The build with the given number.
    pub fn build(&self, number: u64) -> Option<Arc<RunSnapshot>> {
        self.builds.iter().find(|b| b.info.number == number).cloned()
    }
}

impl Job for JobSnapshot {
    fn full_name(&self) -> &str {
        &self.info.full_name
    }

    fn is_buildable(&self) -> bool {
        self.info.buildable
    }

    fn health_score(&self) -> i64 {
        self.info.health_score
    }

    fn build_count(&self) -> usize {
        self.builds.len()
    }

    fn has_build_discarder(&self) -> bool {
        self.info.has_build_discarder
    }

    fn last_build(&self) -> Option<Arc<dyn Run>> {
        self.builds.last().map(|b| b.clone() as Arc<dyn Run>)
    }

    fn log_updated_millis(&self) -> Option<i64> {
        self.info.log_updated_millis
    }
}

/// A build owned by a [`JobSnapshot`].
#[derive(Debug)]
pub struct RunSnapshot {
    info: RunInfo,
    parent: Weak<JobSnapshot>,
    previous: Option<Arc<RunSnapshot>>,
}

impl RunSnapshot {
    /// The build's attributes.
    pub fn info(&self) -> &RunInfo {
        &self.info
    }
}

impl Run for RunSnapshot {
    fn number(&self) -> u64 {
        self.info.number
    }

    fn is_building(&self) -> bool {
        self.info.building
    }

    fn result(&self) -> Option<BuildResult> {
        self.info.result
    }

    fn start_time_millis(&self) -> i64 {
        self.info.start_time_millis
    }

    fn duration_millis(&self) -> u64 {
        self.info.duration_millis
    }

    fn parent(&self) -> Option<Arc<dyn Job>> {
        self.parent.upgrade().map(|job| job as Arc<dyn Job>)
    }

    fn previous_build(&self) -> Option<Arc<dyn Run>> {
        self.previous.clone().map(|b| b as Arc<dyn Run>)
    }

    fn parameters(&self) -> Vec<(String, String)> {
        self.info.parameters.clone()
    }

    fn queued_duration_millis(&self) -> Option<u64> {
        self.info.queued_duration_millis
    }

    fn log_size_bytes(&self) -> Option<u64> {
        self.info.log_size_bytes
    }

    fn test_counts(&self) -> Option<TestCounts> {
        self.info.test_counts
    }

    fn likely_stuck(&self) -> Option<bool> {
        self.info.likely_stuck
    }

    fn stages(&self) -> Option<Vec<Stage>> {
        self.info.stages.clone()
    }

    fn coverage(&self) -> Option<Coverage> {
        self.info.coverage
    }
}

/// A file store with fixed sizes. A missing size reads as an I/O error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStoreSnapshot {
    /// Display name.
    pub name: String,
    /// Usable bytes.
    pub usable_bytes: Option<u64>,
    /// Capacity in bytes.
    pub total_bytes: Option<u64>,
}

impl FileStore for FileStoreSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn usable_space(&self) -> io::Result<u64> {
        self.usable_bytes
            .ok_or_else(|| io::Error::other(format!("usable space of {} unavailable", self.name)))
    }

    fn total_space(&self) -> io::Result<u64> {
        self.total_bytes
            .ok_or_else(|| io::Error::other(format!("capacity of {} unavailable", self.name)))
    }
}

/// Mutable state behind a [`HostSnapshot`].
#[derive(Clone, Default)]
#[allow(missing_docs)]
pub struct HostState {
    pub jobs: Vec<Arc<dyn Job>>,
    pub quieting_down: bool,
    pub uptime_millis: u64,
    pub version: Option<String>,
    pub nodes_online: usize,
    pub executor_loads: Vec<ExecutorLoad>,
    pub disk_usage: Option<DiskUsage>,
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("jobs", &self.jobs.len())
            .field("quieting_down", &self.quieting_down)
            .field("uptime_millis", &self.uptime_millis)
            .field("version", &self.version)
            .field("nodes_online", &self.nodes_online)
            .field("executor_loads", &self.executor_loads)
            .finish_non_exhaustive()
    }
}

/// A whole host: jobs, executors, storage and status.
///
/// The state can be replaced between scrapes with [`HostSnapshot::update`].
#[derive(Default)]
pub struct HostSnapshot {
    state: RwLock<HostState>,
}

impl std::fmt::Debug for HostSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("HostSnapshot")
            .field("jobs", &state.jobs.len())
            .field("quieting_down", &state.quieting_down)
            .field("uptime_millis", &state.uptime_millis)
            .field("version", &state.version)
            .finish_non_exhaustive()
    }
}

impl HostSnapshot {
    /// Create a host with the given state.
    pub fn new(state: HostState) -> Self {
        HostSnapshot {
            state: RwLock::new(state),
        }
    }

    /// A host with only jobs.
    pub fn with_jobs(jobs: Vec<Arc<dyn Job>>) -> Self {
        Self::new(HostState {
            jobs,
            ..Default::default()
        })
    }

    /// Modify the state in place.
    pub fn update(&self, f: impl FnOnce(&mut HostState)) {
        f(&mut self.state.write());
    }
}

impl JobSource for HostSnapshot {
    fn jobs(&self) -> Vec<Arc<dyn Job>> {
        self.state.read().jobs.clone()
    }
}

impl ExecutorSource for HostSnapshot {
    fn executor_loads(&self) -> Vec<ExecutorLoad> {
        self.state.read().executor_loads.clone()
    }
}

impl DiskUsageSource for HostSnapshot {
    fn disk_usage(&self) -> Option<DiskUsage> {
        self.state.read().disk_usage.clone()
    }
}

impl HostStatus for HostSnapshot {
    fn is_quieting_down(&self) -> bool {
        self.state.read().quieting_down
    }

    fn uptime_millis(&self) -> u64 {
        self.state.read().uptime_millis
    }

    fn version(&self) -> Option<String> {
        self.state.read().version.clone()
    }

    fn nodes_online(&self) -> usize {
        self.state.read().nodes_online
    }
}
