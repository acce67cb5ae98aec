//! Code coverage of every job's last build.
//!
//! See [`CoverageCollector`] for details.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::collectors::{
    CollectorFactory, CollectorSpec, Constructor, GaugeCollector, MetricCollector, RunCollector,
};
use crate::config::SharedConfig;
use crate::error::Error;
use crate::model::{CoverageCounts, Job, JobSource, Run};

pub(crate) fn constructor(kind: MetricKind) -> Option<Constructor<dyn Run>> {
    let constructor: Constructor<dyn Run> = match kind {
        MetricKind::CoverageClassCovered => {
            |spec| gauge(spec, |run| covered(run.coverage()?.class))
        }
        MetricKind::CoverageClassMissed => |spec| gauge(spec, |run| missed(run.coverage()?.class)),
        MetricKind::CoverageClassTotal => |spec| gauge(spec, |run| total(run.coverage()?.class)),
        MetricKind::CoverageClassPercent => {
            |spec| gauge(spec, |run| percent(run.coverage()?.class))
        }
        MetricKind::CoverageBranchCovered => {
            |spec| gauge(spec, |run| covered(run.coverage()?.branch))
        }
        MetricKind::CoverageBranchMissed => {
            |spec| gauge(spec, |run| missed(run.coverage()?.branch))
        }
        MetricKind::CoverageBranchTotal => |spec| gauge(spec, |run| total(run.coverage()?.branch)),
        MetricKind::CoverageBranchPercent => {
            |spec| gauge(spec, |run| percent(run.coverage()?.branch))
        }
        MetricKind::CoverageInstructionCovered => {
            |spec| gauge(spec, |run| covered(run.coverage()?.instruction))
        }
        MetricKind::CoverageInstructionMissed => {
            |spec| gauge(spec, |run| missed(run.coverage()?.instruction))
        }
        MetricKind::CoverageInstructionTotal => {
            |spec| gauge(spec, |run| total(run.coverage()?.instruction))
        }
        MetricKind::CoverageInstructionPercent => {
            |spec| gauge(spec, |run| percent(run.coverage()?.instruction))
        }
        MetricKind::CoverageFileCovered => |spec| gauge(spec, |run| covered(run.coverage()?.file)),
        MetricKind::CoverageFileMissed => |spec| gauge(spec, |run| missed(run.coverage()?.file)),
        MetricKind::CoverageFileTotal => |spec| gauge(spec, |run| total(run.coverage()?.file)),
        MetricKind::CoverageFilePercent => |spec| gauge(spec, |run| percent(run.coverage()?.file)),
        MetricKind::CoverageLineCovered => |spec| gauge(spec, |run| covered(run.coverage()?.line)),
        MetricKind::CoverageLineMissed => |spec| gauge(spec, |run| missed(run.coverage()?.line)),
        MetricKind::CoverageLineTotal => |spec| gauge(spec, |run| total(run.coverage()?.line)),
        MetricKind::CoverageLinePercent => |spec| gauge(spec, |run| percent(run.coverage()?.line)),
        _ => return None,
    };

    Some(constructor)
}

fn gauge(
    spec: CollectorSpec,
    value: fn(&dyn Run) -> Option<f64>,
) -> Arc<dyn MetricCollector<dyn Run>> {
    Arc::new(GaugeCollector::<dyn Run>::new(spec, value))
}

fn covered(counts: Option<CoverageCounts>) -> Option<f64> {
    counts.map(|c| c.covered as f64)
}

fn missed(counts: Option<CoverageCounts>) -> Option<f64> {
    counts.map(|c| c.missed as f64)
}

fn total(counts: Option<CoverageCounts>) -> Option<f64> {
    counts.map(|c| c.total() as f64)
}

fn percent(counts: Option<CoverageCounts>) -> Option<f64> {
    counts.map(|c| c.percent())
}

/// Reports the coverage published by the last build of every job.
///
/// Nothing is reported unless coverage collection is enabled. A job whose
/// last build is still running, or published no coverage report, is
/// skipped; earlier builds are not consulted. Samples carry a single label,
/// the configured job attribute name, holding the job's full name.
///
/// ```
/// # use std::sync::Arc;
/// # use build_exporter::collector::Collector;
/// # use build_exporter::config::{Config, Settings, SharedConfig};
/// # use build_exporter::coverage_collector::CoverageCollector;
/// # use build_exporter::model::{BuildResult, Coverage, CoverageCounts, Job};
/// # use build_exporter::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
/// let job = JobSnapshot::new(
///     JobInfo::new("a"),
///     vec![RunInfo::completed(1, BuildResult::Success).coverage(Coverage {
///         line: Some(CoverageCounts::new(3, 1)),
///         ..Coverage::default()
///     })],
/// );
/// let config = Settings::new(Config {
///     collect_coverage: true,
///     ..Config::default()
/// })?;
///
/// let collector = CoverageCollector::new(
///     Arc::new(SharedConfig::new(config)),
///     Arc::new(HostSnapshot::with_jobs(vec![job as Arc<dyn Job>])),
/// );
///
/// let families = collector.collect();
/// let percent = families
///     .iter()
///     .find(|f| f.name() == "default_jenkins_coverage_line_percent")
///     .unwrap();
/// assert_eq!(75.0, percent.samples()[0].value());
/// # Ok::<(), build_exporter::config::ConfigError>(())
/// ```
pub struct CoverageCollector {
    config: Arc<SharedConfig>,
    jobs: Arc<dyn JobSource>,
}

impl CoverageCollector {
    /// Create a collector over the jobs of `jobs`.
    pub fn new(config: Arc<SharedConfig>, jobs: Arc<dyn JobSource>) -> Self {
        CoverageCollector { config, jobs }
    }
}

impl fmt::Debug for CoverageCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverageCollector").finish_non_exhaustive()
    }
}

impl Collector for CoverageCollector {
    fn collect(&self) -> Vec<MetricFamilySamples> {
        let settings = self.config.load();
        if !settings.config().collect_coverage {
            return Vec::new();
        }

        let factory = CollectorFactory::new(&settings);
        let label_names = vec![settings.config().job_attribute_name.clone()];
        let gauges: Vec<RunCollector> = MetricKind::COVERAGE_METRICS
            .iter()
            .map(|kind| factory.create_coverage_collector(*kind, label_names.clone()))
            .collect();

        for job in self.jobs.jobs() {
            if !settings.metric_status().is_job_enabled(job.full_name()) {
                trace!(job = job.full_name(), "job disabled, skipping coverage");
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| record(&gauges, job.as_ref())))
                .unwrap_or_else(|_| {
                    Err(Error::EntityPanicked {
                        entity: job.full_name().to_string(),
                    })
                });
            if let Err(err) = result {
                warn!(job = job.full_name(), %err, "failed to collect coverage");
            }
        }

        gauges.iter().flat_map(|gauge| gauge.collect()).collect()
    }
}

fn record(gauges: &[RunCollector], job: &dyn Job) -> Result<(), Error> {
    let Some(run) = job.last_build() else {
        return Ok(());
    };
    if run.is_building() {
        debug!(job = job.full_name(), "last build still running, skipping coverage");
        return Ok(());
    }
    if run.coverage().is_none() {
        trace!(job = job.full_name(), "last build has no coverage report");
        return Ok(());
    }

    let values = [job.full_name().to_string()];
    for gauge in gauges {
        gauge.calculate_metric(run.as_ref(), &values)?;
    }
    Ok(())
}
