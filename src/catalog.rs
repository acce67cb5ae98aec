//! The closed set of metrics this crate knows how to produce.
//!
//! See [`MetricKind`] for details.

use crate::metrics::MetricType;
use crate::registry::Unit;

/// Subsystem every metric name is placed under.
pub const SUBSYSTEM: &str = "jenkins";

/// Namespace used when the configuration does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name group inserted between subsystem and metric name for job and build
/// metrics.
pub const BUILDS_GROUP: &str = "builds";

/// A metric kind: stable short name, instrument type and help text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum MetricKind {
    // Run scoped.
    BuildResultOrdinal,
    BuildResult,
    BuildDuration,
    BuildStartTime,
    BuildWaiting,
    BuildLogfileSize,
    BuildTestsTotal,
    BuildTestsFailing,
    BuildTestsSkipped,
    BuildLikelyStuck,
    StageDurationSummary,
    StageResultOrdinal,
    BuildDurationSummary,
    BuildSuccessfulCounter,
    BuildFailedCounter,
    BuildUnstableCounter,
    BuildAbortedCounter,
    BuildTotalCounter,

    // Job scoped.
    HealthScore,
    AvailableBuildsCount,
    DiscardActive,
    RunningBuildDuration,
    JobLogUpdated,

    // Executors, one label set per node label.
    ExecutorsAvailable,
    ExecutorsBusy,
    ExecutorsConnecting,
    ExecutorsDefined,
    ExecutorsIdle,
    ExecutorsOnline,
    ExecutorsQueueLength,

    // Disk usage.
    DiskUsageBytes,
    DiskUsageFileCount,
    JobUsageBytes,
    FileStoreAvailableBytes,
    FileStoreCapacityBytes,

    // Host status.
    Up,
    Uptime,
    QuietDown,
    NodesOnline,
    Version,

    // Code coverage of a job's last build.
    CoverageClassCovered,
    CoverageClassMissed,
    CoverageClassTotal,
    CoverageClassPercent,
    CoverageBranchCovered,
    CoverageBranchMissed,
    CoverageBranchTotal,
    CoverageBranchPercent,
    CoverageInstructionCovered,
    CoverageInstructionMissed,
    CoverageInstructionTotal,
    CoverageInstructionPercent,
    CoverageFileCovered,
    CoverageFileMissed,
    CoverageFileTotal,
    CoverageFilePercent,
    CoverageLineCovered,
    CoverageLineMissed,
    CoverageLineTotal,
    CoverageLinePercent,
}

/// The kind of entity a [`MetricKind`] is computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// A single build.
    Run,
    /// A job.
    Job,
    /// The executor load of one node label.
    Executor,
    /// A top level directory of the host's home.
    Directory,
    /// The workspace and build storage of one job.
    JobDisk,
    /// A file store backing the host's storage.
    FileStore,
    /// The host itself.
    Host,
    /// The coverage report of a single build.
    Coverage,
}

impl MetricKind {
    /// Every kind, in declaration order.
    pub const ALL: [MetricKind; 60] = [
        MetricKind::BuildResultOrdinal,
        MetricKind::BuildResult,
        MetricKind::BuildDuration,
        MetricKind::BuildStartTime,
        MetricKind::BuildWaiting,
        MetricKind::BuildLogfileSize,
        MetricKind::BuildTestsTotal,
        MetricKind::BuildTestsFailing,
        MetricKind::BuildTestsSkipped,
        MetricKind::BuildLikelyStuck,
        MetricKind::StageDurationSummary,
        MetricKind::StageResultOrdinal,
        MetricKind::BuildDurationSummary,
        MetricKind::BuildSuccessfulCounter,
        MetricKind::BuildFailedCounter,
        MetricKind::BuildUnstableCounter,
        MetricKind::BuildAbortedCounter,
        MetricKind::BuildTotalCounter,
        MetricKind::HealthScore,
        MetricKind::AvailableBuildsCount,
        MetricKind::DiscardActive,
        MetricKind::RunningBuildDuration,
        MetricKind::JobLogUpdated,
        MetricKind::ExecutorsAvailable,
        MetricKind::ExecutorsBusy,
        MetricKind::ExecutorsConnecting,
        MetricKind::ExecutorsDefined,
        MetricKind::ExecutorsIdle,
        MetricKind::ExecutorsOnline,
        MetricKind::ExecutorsQueueLength,
        MetricKind::DiskUsageBytes,
        MetricKind::DiskUsageFileCount,
        MetricKind::JobUsageBytes,
        MetricKind::FileStoreAvailableBytes,
        MetricKind::FileStoreCapacityBytes,
        MetricKind::Up,
        MetricKind::Uptime,
        MetricKind::QuietDown,
        MetricKind::NodesOnline,
        MetricKind::Version,
        MetricKind::CoverageClassCovered,
        MetricKind::CoverageClassMissed,
        MetricKind::CoverageClassTotal,
        MetricKind::CoverageClassPercent,
        MetricKind::CoverageBranchCovered,
        MetricKind::CoverageBranchMissed,
        MetricKind::CoverageBranchTotal,
        MetricKind::CoverageBranchPercent,
        MetricKind::CoverageInstructionCovered,
        MetricKind::CoverageInstructionMissed,
        MetricKind::CoverageInstructionTotal,
        MetricKind::CoverageInstructionPercent,
        MetricKind::CoverageFileCovered,
        MetricKind::CoverageFileMissed,
        MetricKind::CoverageFileTotal,
        MetricKind::CoverageFilePercent,
        MetricKind::CoverageLineCovered,
        MetricKind::CoverageLineMissed,
        MetricKind::CoverageLineTotal,
        MetricKind::CoverageLinePercent,
    ];

    /// The per-build metrics applied to the last build of every job and,
    /// when enabled, to every earlier build. Order is exposition order.
    pub const BUILD_METRICS: [MetricKind; 12] = [
        MetricKind::BuildResultOrdinal,
        MetricKind::BuildResult,
        MetricKind::BuildDuration,
        MetricKind::BuildStartTime,
        MetricKind::BuildWaiting,
        MetricKind::BuildLogfileSize,
        MetricKind::BuildTestsTotal,
        MetricKind::BuildTestsFailing,
        MetricKind::BuildTestsSkipped,
        MetricKind::BuildLikelyStuck,
        MetricKind::StageDurationSummary,
        MetricKind::StageResultOrdinal,
    ];

    /// Build counters in exposition order.
    pub const COUNTERS: [MetricKind; 5] = [
        MetricKind::BuildSuccessfulCounter,
        MetricKind::BuildFailedCounter,
        MetricKind::BuildAbortedCounter,
        MetricKind::BuildUnstableCounter,
        MetricKind::BuildTotalCounter,
    ];

    /// Job gauges in exposition order.
    pub const JOB_METRICS: [MetricKind; 5] = [
        MetricKind::HealthScore,
        MetricKind::AvailableBuildsCount,
        MetricKind::DiscardActive,
        MetricKind::RunningBuildDuration,
        MetricKind::JobLogUpdated,
    ];

    /// Coverage gauges in exposition order.
    pub const COVERAGE_METRICS: [MetricKind; 20] = [
        MetricKind::CoverageClassCovered,
        MetricKind::CoverageClassMissed,
        MetricKind::CoverageClassTotal,
        MetricKind::CoverageClassPercent,
        MetricKind::CoverageBranchCovered,
        MetricKind::CoverageBranchMissed,
        MetricKind::CoverageBranchTotal,
        MetricKind::CoverageBranchPercent,
        MetricKind::CoverageInstructionCovered,
        MetricKind::CoverageInstructionMissed,
        MetricKind::CoverageInstructionTotal,
        MetricKind::CoverageInstructionPercent,
        MetricKind::CoverageFileCovered,
        MetricKind::CoverageFileMissed,
        MetricKind::CoverageFileTotal,
        MetricKind::CoverageFilePercent,
        MetricKind::CoverageLineCovered,
        MetricKind::CoverageLineMissed,
        MetricKind::CoverageLineTotal,
        MetricKind::CoverageLinePercent,
    ];

    /// Stable short name of the metric.
    pub fn name(&self) -> &'static str {
        self.descriptor().0
    }

    /// Instrument type backing the metric.
    pub fn metric_type(&self) -> MetricType {
        self.descriptor().1
    }

    /// Help text, without trailing full stop.
    pub fn help(&self) -> &'static str {
        self.descriptor().2
    }

    /// Unit of the exposed value, if it has one.
    pub fn unit(&self) -> Option<Unit> {
        match self {
            MetricKind::BuildDuration
            | MetricKind::BuildStartTime
            | MetricKind::BuildWaiting
            | MetricKind::StageDurationSummary
            | MetricKind::BuildDurationSummary
            | MetricKind::RunningBuildDuration
            | MetricKind::JobLogUpdated
            | MetricKind::Uptime => Some(Unit::Milliseconds),
            MetricKind::BuildLogfileSize
            | MetricKind::DiskUsageBytes
            | MetricKind::JobUsageBytes
            | MetricKind::FileStoreAvailableBytes
            | MetricKind::FileStoreCapacityBytes => Some(Unit::Bytes),
            _ => None,
        }
    }

    /// Entity the metric is computed from.
    pub fn target(&self) -> Target {
        use MetricKind::*;
        match self {
            BuildResultOrdinal | BuildResult | BuildDuration | BuildStartTime | BuildWaiting
            | BuildLogfileSize | BuildTestsTotal | BuildTestsFailing | BuildTestsSkipped
            | BuildLikelyStuck | StageDurationSummary | StageResultOrdinal
            | BuildDurationSummary | BuildSuccessfulCounter | BuildFailedCounter
            | BuildUnstableCounter | BuildAbortedCounter | BuildTotalCounter => Target::Run,
            HealthScore | AvailableBuildsCount | DiscardActive | RunningBuildDuration
            | JobLogUpdated => Target::Job,
            ExecutorsAvailable | ExecutorsBusy | ExecutorsConnecting | ExecutorsDefined
            | ExecutorsIdle | ExecutorsOnline | ExecutorsQueueLength => Target::Executor,
            DiskUsageBytes | DiskUsageFileCount => Target::Directory,
            JobUsageBytes => Target::JobDisk,
            FileStoreAvailableBytes | FileStoreCapacityBytes => Target::FileStore,
            Up | Uptime | QuietDown | NodesOnline | Version => Target::Host,
            CoverageClassCovered | CoverageClassMissed | CoverageClassTotal
            | CoverageClassPercent | CoverageBranchCovered | CoverageBranchMissed
            | CoverageBranchTotal | CoverageBranchPercent | CoverageInstructionCovered
            | CoverageInstructionMissed | CoverageInstructionTotal | CoverageInstructionPercent
            | CoverageFileCovered | CoverageFileMissed | CoverageFileTotal | CoverageFilePercent
            | CoverageLineCovered | CoverageLineMissed | CoverageLineTotal
            | CoverageLinePercent => Target::Coverage,
        }
    }

    /// Name group placed between subsystem and prefix in the exposed name.
    pub fn group(&self) -> Option<&'static str> {
        match self.target() {
            Target::Run | Target::Job => Some(BUILDS_GROUP),
            _ => None,
        }
    }

    /// Name checked against the disabled-metric policy:
    /// `namespace_subsystem_name`.
    pub fn qualified_name(&self, namespace: &str) -> String {
        format!("{namespace}_{SUBSYSTEM}_{}", self.name())
    }

    /// Name the metric is exposed under:
    /// `namespace_subsystem[_group][_prefix]_name`.
    pub fn exposed_name(&self, namespace: &str, prefix: Option<&str>) -> String {
        let mut name = format!("{namespace}_{SUBSYSTEM}");
        for part in [self.group(), prefix.filter(|p| !p.is_empty())]
            .into_iter()
            .flatten()
        {
            name.push('_');
            name.push_str(part);
        }
        name.push('_');
        name.push_str(self.name());
        name
    }

    fn descriptor(&self) -> (&'static str, MetricType, &'static str) {
        use MetricType::{Counter, Gauge, Summary};
        match self {
            MetricKind::BuildResultOrdinal => ("build_result_ordinal", Gauge, "Build status of a job"),
            MetricKind::BuildResult => (
                "build_result",
                Gauge,
                "Build status of a job as a boolean (0 or 1)",
            ),
            MetricKind::BuildDuration => (
                "build_duration_milliseconds",
                Gauge,
                "Build times in milliseconds of last build",
            ),
            MetricKind::BuildStartTime => (
                "build_start_time_milliseconds",
                Gauge,
                "Last build start timestamp in milliseconds",
            ),
            MetricKind::BuildWaiting => (
                "build_waiting_milliseconds",
                Gauge,
                "Duration this build spent queued waiting to be executed",
            ),
            MetricKind::BuildLogfileSize => (
                "build_logfile_size_bytes",
                Gauge,
                "Build logfile size in bytes",
            ),
            MetricKind::BuildTestsTotal => (
                "build_tests_total",
                Gauge,
                "Number of total tests during the build",
            ),
            MetricKind::BuildTestsFailing => (
                "build_tests_failing",
                Gauge,
                "Number of failing tests during the build",
            ),
            MetricKind::BuildTestsSkipped => (
                "build_tests_skipped",
                Gauge,
                "Number of skipped tests during the build",
            ),
            MetricKind::BuildLikelyStuck => (
                "likely_stuck",
                Gauge,
                "Provides a hint if a build is likely stuck",
            ),
            MetricKind::StageDurationSummary => (
                "stage_duration_milliseconds_summary",
                Summary,
                "Summary of build times by job and stage",
            ),
            MetricKind::StageResultOrdinal => (
                "stage_result_ordinal",
                Gauge,
                "Build status of a stage",
            ),
            MetricKind::BuildDurationSummary => (
                "duration_milliseconds_summary",
                Summary,
                "Summary of build times in milliseconds by job",
            ),
            MetricKind::BuildSuccessfulCounter => {
                ("success_build_count", Counter, "Successful build count")
            }
            MetricKind::BuildFailedCounter => ("failed_build_count", Counter, "Failed build count"),
            MetricKind::BuildUnstableCounter => {
                ("unstable_build_count", Counter, "Unstable build count")
            }
            MetricKind::BuildAbortedCounter => {
                ("aborted_build_count", Counter, "Aborted build count")
            }
            MetricKind::BuildTotalCounter => (
                "total_build_count",
                Counter,
                "Total build count excluding not built builds",
            ),
            MetricKind::HealthScore => ("health_score", Gauge, "Health score of a job"),
            MetricKind::AvailableBuildsCount => (
                "available_builds_count",
                Gauge,
                "Number of builds available for this job",
            ),
            MetricKind::DiscardActive => (
                "discard_active",
                Gauge,
                "Indicates if the build discarder is active for the given job",
            ),
            MetricKind::RunningBuildDuration => (
                "running_build_duration_milliseconds",
                Gauge,
                "Runtime of the build currently running, if any",
            ),
            MetricKind::JobLogUpdated => (
                "job_log_updated",
                Gauge,
                "Timestamp in milliseconds of the last log update of a job",
            ),
            MetricKind::ExecutorsAvailable => {
                ("executors_available", Gauge, "Executors available")
            }
            MetricKind::ExecutorsBusy => ("executors_busy", Gauge, "Executors busy"),
            MetricKind::ExecutorsConnecting => {
                ("executors_connecting", Gauge, "Executors connecting")
            }
            MetricKind::ExecutorsDefined => ("executors_defined", Gauge, "Executors defined"),
            MetricKind::ExecutorsIdle => ("executors_idle", Gauge, "Executors idle"),
            MetricKind::ExecutorsOnline => ("executors_online", Gauge, "Executors online"),
            MetricKind::ExecutorsQueueLength => {
                ("executors_queue_length", Gauge, "Executors queue length")
            }
            MetricKind::DiskUsageBytes => (
                "disk_usage_bytes",
                Gauge,
                "Disk usage of first level folder in the home directory in bytes",
            ),
            MetricKind::DiskUsageFileCount => (
                "disk_usage_file_count",
                Gauge,
                "Number of files in first level folder in the home directory",
            ),
            MetricKind::JobUsageBytes => (
                "job_usage_bytes",
                Gauge,
                "Amount of disk usage for each job in bytes",
            ),
            MetricKind::FileStoreAvailableBytes => (
                "file_store_available_bytes",
                Gauge,
                "Estimated available space on the file stores used by the host",
            ),
            MetricKind::FileStoreCapacityBytes => (
                "file_store_capacity_bytes",
                Gauge,
                "Total size in bytes of the file stores used by the host",
            ),
            MetricKind::Up => ("up", Gauge, "Is the host ready to receive requests"),
            MetricKind::Uptime => (
                "uptime",
                Gauge,
                "Time since the host was initialized in milliseconds",
            ),
            MetricKind::QuietDown => (
                "quietdown",
                Gauge,
                "Is the host in quiet mode",
            ),
            MetricKind::NodesOnline => ("nodes_online", Gauge, "Number of nodes online"),
            MetricKind::Version => ("version", Gauge, "Application version of the host"),
            MetricKind::CoverageClassCovered => (
                "coverage_class_covered",
                Gauge,
                "Number of classes covered",
            ),
            MetricKind::CoverageClassMissed => (
                "coverage_class_missed",
                Gauge,
                "Number of classes missed",
            ),
            MetricKind::CoverageClassTotal => (
                "coverage_class_total",
                Gauge,
                "Number of classes total",
            ),
            MetricKind::CoverageClassPercent => (
                "coverage_class_percent",
                Gauge,
                "Percentage of classes covered, -1 when there is nothing to cover",
            ),
            MetricKind::CoverageBranchCovered => (
                "coverage_branch_covered",
                Gauge,
                "Number of branches covered",
            ),
            MetricKind::CoverageBranchMissed => (
                "coverage_branch_missed",
                Gauge,
                "Number of branches missed",
            ),
            MetricKind::CoverageBranchTotal => (
                "coverage_branch_total",
                Gauge,
                "Number of branches total",
            ),
            MetricKind::CoverageBranchPercent => (
                "coverage_branch_percent",
                Gauge,
                "Percentage of branches covered, -1 when there is nothing to cover",
            ),
            MetricKind::CoverageInstructionCovered => (
                "coverage_instruction_covered",
                Gauge,
                "Number of instructions covered",
            ),
            MetricKind::CoverageInstructionMissed => (
                "coverage_instruction_missed",
                Gauge,
                "Number of instructions missed",
            ),
            MetricKind::CoverageInstructionTotal => (
                "coverage_instruction_total",
                Gauge,
                "Number of instructions total",
            ),
            MetricKind::CoverageInstructionPercent => (
                "coverage_instruction_percent",
                Gauge,
                "Percentage of instructions covered, -1 when there is nothing to cover",
            ),
            MetricKind::CoverageFileCovered => (
                "coverage_file_covered",
                Gauge,
                "Number of files covered",
            ),
            MetricKind::CoverageFileMissed => (
                "coverage_file_missed",
                Gauge,
                "Number of files missed",
            ),
            MetricKind::CoverageFileTotal => (
                "coverage_file_total",
                Gauge,
                "Number of files total",
            ),
            MetricKind::CoverageFilePercent => (
                "coverage_file_percent",
                Gauge,
                "Percentage of files covered, -1 when there is nothing to cover",
            ),
            MetricKind::CoverageLineCovered => (
                "coverage_line_covered",
                Gauge,
                "Number of lines covered",
            ),
            MetricKind::CoverageLineMissed => (
                "coverage_line_missed",
                Gauge,
                "Number of lines missed",
            ),
            MetricKind::CoverageLineTotal => (
                "coverage_line_total",
                Gauge,
                "Number of lines total",
            ),
            MetricKind::CoverageLinePercent => (
                "coverage_line_percent",
                Gauge,
                "Percentage of lines covered, -1 when there is nothing to cover",
            ),
        }
    }
}
