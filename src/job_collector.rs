//! Job and build metrics, computed on every scrape.
//!
//! See [`JobCollector`] for details.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::collectors::{
    CollectorFactory, CounterCache, JobMetricCollector, RunCollector,
};
use crate::config::{Config, MetricStatusChecker, SharedConfig};
use crate::error::Error;
use crate::labels::{JobLabels, NUMBER_LABEL, STAGE_LABEL};
use crate::listener::CompletionEventBuffer;
use crate::model::{BuildResult, Job, JobSource, Run};

/// Prefix of the metrics describing a job's last completed build.
pub const LAST_BUILD_PREFIX: &str = "last";

/// Orchestrates one scrape of every job known to the host.
///
/// Each call to [`Collector::collect`] works on one snapshot of the active
/// configuration:
///
/// 1. When no build result is counted at all the completion buffer is
///    unregistered and nothing is reported.
/// 2. Counters are fetched from the [`CounterCache`] and fed every build
///    completed since the last scrape. Every other collector is created
///    afresh.
/// 3. Every enabled job contributes its job gauges and the metrics of its
///    last completed build. Builds that pass the result filter are
///    observed by the duration summary and, with per-build metrics on,
///    reported individually with a `number` label.
///
/// A job that fails, or whose host code panics, is logged and skipped, as is
/// a completed build whose host code panics. The scrape always completes.
///
/// ```
/// # use std::sync::Arc;
/// # use build_exporter::collector::Collector;
/// # use build_exporter::collectors::CounterCache;
/// # use build_exporter::config::SharedConfig;
/// # use build_exporter::job_collector::JobCollector;
/// # use build_exporter::listener::CompletionEventBuffer;
/// # use build_exporter::model::{BuildResult, Job};
/// # use build_exporter::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
/// let job = JobSnapshot::new(JobInfo::new("a"), vec![RunInfo::completed(1, BuildResult::Success)]);
/// let events = Arc::new(CompletionEventBuffer::new());
/// events.on_build_completed(job.last_build().unwrap());
///
/// let collector = JobCollector::new(
///     Arc::new(SharedConfig::default()),
///     Arc::new(HostSnapshot::with_jobs(vec![job as Arc<dyn Job>])),
///     events,
///     Arc::new(CounterCache::default()),
/// );
///
/// let families = collector.collect();
/// let total = families
///     .iter()
///     .find(|f| f.name() == "default_jenkins_builds_total_build_count")
///     .unwrap();
/// assert_eq!(1.0, total.samples()[0].value());
/// ```
pub struct JobCollector {
    config: Arc<SharedConfig>,
    jobs: Arc<dyn JobSource>,
    events: Arc<CompletionEventBuffer>,
    counters: Arc<CounterCache>,
}

impl JobCollector {
    /// Create a collector over the jobs of `jobs`, counting builds reported to
    /// `events`.
    pub fn new(
        config: Arc<SharedConfig>,
        jobs: Arc<dyn JobSource>,
        events: Arc<CompletionEventBuffer>,
        counters: Arc<CounterCache>,
    ) -> Self {
        JobCollector {
            config,
            jobs,
            events,
            counters,
        }
    }
}

impl fmt::Debug for JobCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCollector")
            .field("events", &self.events)
            .field("counters", &self.counters.len())
            .finish_non_exhaustive()
    }
}

impl Collector for JobCollector {
    fn collect(&self) -> Vec<MetricFamilySamples> {
        let settings = self.config.load();
        let config = settings.config();

        if !config.counts_any_builds() {
            debug!("no build result is counted, unregistering completion listener");
            self.events.unregister();
            return Vec::new();
        }
        self.events.register();

        let factory = CollectorFactory::new(&settings);
        let scrape = Scrape::new(config, settings.metric_status(), &factory, &self.counters);

        scrape.count_completed_builds(&self.events);
        for job in self.jobs.jobs() {
            scrape.process_guarded(job.as_ref());
        }
        scrape.collect()
    }
}

/// Collectors and settings of one scrape.
struct Scrape<'a> {
    config: &'a Config,
    metric_status: &'a MetricStatusChecker,
    labels: JobLabels,
    summary: RunCollector,
    counters: Vec<RunCollector>,
    job_gauges: Vec<JobMetricCollector>,
    last_build: Vec<RunCollector>,
    per_build: Vec<RunCollector>,
}

impl<'a> Scrape<'a> {
    fn new(
        config: &'a Config,
        metric_status: &'a MetricStatusChecker,
        factory: &CollectorFactory,
        counter_cache: &CounterCache,
    ) -> Self {
        let labels = JobLabels::new(config);
        let base_names = labels.base_label_names();
        let job_names = labels.job_label_names();

        let summary =
            factory.create_run_collector(MetricKind::BuildDurationSummary, job_names.clone(), None);

        let counters = MetricKind::COUNTERS
            .iter()
            .map(|kind| counter_cache.get(factory, *kind, base_names.clone(), None))
            .collect();

        let job_gauges = MetricKind::JOB_METRICS
            .iter()
            .map(|kind| factory.create_job_collector(*kind, base_names.clone(), None))
            .collect();

        let last_build = build_group(factory, &base_names, Some(LAST_BUILD_PREFIX));

        let per_build = if config.per_build_metrics {
            let mut names = job_names;
            names.push(NUMBER_LABEL.to_string());
            build_group(factory, &names, None)
        } else {
            Vec::new()
        };

        Scrape {
            config,
            metric_status,
            labels,
            summary,
            counters,
            job_gauges,
            last_build,
            per_build,
        }
    }

    /// Feed every build completed since the last scrape to the counters.
    fn count_completed_builds(&self, events: &CompletionEventBuffer) {
        for run in events.drain() {
            if catch_unwind(AssertUnwindSafe(|| self.count_build(run.as_ref()))).is_err() {
                let err = Error::EntityPanicked {
                    entity: "completed build".to_string(),
                };
                warn!(%err, "failed to count completed build");
            }
        }
    }

    fn count_build(&self, run: &(dyn Run + 'static)) {
        let Some(job) = run.parent() else {
            debug!(build = run.number(), "completed build has no job, skipping");
            return;
        };
        if !self.metric_status.is_job_enabled(job.full_name()) {
            trace!(job = job.full_name(), "job disabled, not counting build");
            return;
        }

        let values = self.labels.base_label_values(job.as_ref());
        for counter in &self.counters {
            if let Err(err) = counter.calculate_metric(run, &values) {
                debug!(job = job.full_name(), build = run.number(), %err, "skipping build");
            }
        }
    }

    fn process_guarded(&self, job: &(dyn Job + 'static)) {
        let result = catch_unwind(AssertUnwindSafe(|| self.process_job(job))).unwrap_or_else(|_| {
            Err(Error::EntityPanicked {
                entity: job.full_name().to_string(),
            })
        });

        match result {
            Ok(()) => {}
            Err(err @ Error::LabelArity { .. }) => {
                debug!(job = job.full_name(), %err, "skipping job");
            }
            Err(err) => {
                warn!(job = job.full_name(), %err, "failed to collect job metrics");
            }
        }
    }

    fn process_job(&self, job: &(dyn Job + 'static)) -> Result<(), Error> {
        if !self.metric_status.is_job_enabled(job.full_name()) {
            debug!(job = job.full_name(), "job disabled by configuration");
            return Ok(());
        }
        if !job.is_buildable() && !self.config.process_disabled_jobs {
            debug!(job = job.full_name(), "job not buildable, skipping");
            return Ok(());
        }

        let Some(last) = job.last_build() else {
            trace!(job = job.full_name(), "job has no builds");
            return Ok(());
        };
        let last_completed = if last.is_building() {
            match last.previous_build() {
                Some(previous) => previous,
                None => {
                    trace!(job = job.full_name(), "job has no completed build");
                    return Ok(());
                }
            }
        } else {
            last.clone()
        };

        let base_values = self.labels.base_label_values(job);
        for gauge in &self.job_gauges {
            gauge.calculate_metric(job, &base_values)?;
        }
        for collector in &self.last_build {
            collector.calculate_metric(last_completed.as_ref(), &base_values)?;
        }

        let mut current = Some(last);
        while let Some(run) = current {
            if self.is_included(run.as_ref()) {
                let values = self.labels.job_label_values(job, run.as_ref());
                self.summary.calculate_metric(run.as_ref(), &values)?;

                if !self.per_build.is_empty() {
                    let mut values = values;
                    values.push(run.number().to_string());
                    for collector in &self.per_build {
                        collector.calculate_metric(run.as_ref(), &values)?;
                    }
                }
            }
            current = run.previous_build();
        }

        Ok(())
    }

    /// Whether `run` is finished and its result is one the configuration
    /// counts.
    fn is_included(&self, run: &dyn Run) -> bool {
        if run.is_building() {
            return false;
        }
        match run.result() {
            Some(BuildResult::Success) => self.config.count_successful_builds,
            Some(BuildResult::Unstable) => self.config.count_unstable_builds,
            Some(BuildResult::Failure) => self.config.count_failed_builds,
            Some(BuildResult::NotBuilt) => self.config.count_not_built_builds,
            Some(BuildResult::Aborted) => self.config.count_aborted_builds,
            None => true,
        }
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        let runs = std::iter::once(&self.summary)
            .chain(&self.counters)
            .flat_map(|collector| collector.collect());
        let jobs = self.job_gauges.iter().flat_map(|gauge| gauge.collect());
        let groups = self
            .last_build
            .iter()
            .chain(&self.per_build)
            .flat_map(|collector| collector.collect());

        runs.chain(jobs)
            .chain(groups)
            .filter(|family| !family.is_empty())
            .collect()
    }
}

fn build_group(
    factory: &CollectorFactory,
    label_names: &[String],
    prefix: Option<&str>,
) -> Vec<RunCollector> {
    MetricKind::BUILD_METRICS
        .iter()
        .map(|kind| {
            let mut names = label_names.to_vec();
            if matches!(
                kind,
                MetricKind::StageDurationSummary | MetricKind::StageResultOrdinal
            ) {
                names.push(STAGE_LABEL.to_string());
            }
            factory.create_run_collector(*kind, names, prefix)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisabledMetric, Settings};
    use crate::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
    use crate::model::{Stage, TestCounts};

    struct Fixture {
        host: Arc<HostSnapshot>,
        events: Arc<CompletionEventBuffer>,
        collector: JobCollector,
    }

    fn fixture(config: Config) -> Fixture {
        let host = Arc::new(HostSnapshot::default());
        let events = Arc::new(CompletionEventBuffer::new());
        let collector = JobCollector::new(
            Arc::new(SharedConfig::new(Settings::new(config).unwrap())),
            host.clone(),
            events.clone(),
            Arc::new(CounterCache::default()),
        );
        Fixture {
            host,
            events,
            collector,
        }
    }

    fn family<'a>(
        families: &'a [MetricFamilySamples],
        name: &str,
    ) -> Option<&'a MetricFamilySamples> {
        families.iter().find(|f| f.name() == name)
    }

    #[test]
    fn non_buildable_jobs_are_skipped_unless_configured() {
        let job = JobSnapshot::new(
            JobInfo::new("disabled").buildable(false),
            vec![RunInfo::completed(1, BuildResult::Success)],
        );

        let skipping = fixture(Config::default());
        skipping.host.update(|state| state.jobs = vec![job.clone()]);
        let families = skipping.collector.collect();
        assert!(family(&families, "default_jenkins_builds_health_score").is_none());

        let processing = fixture(Config {
            process_disabled_jobs: true,
            ..Config::default()
        });
        processing.host.update(|state| state.jobs = vec![job]);
        let families = processing.collector.collect();
        let health = family(&families, "default_jenkins_builds_health_score").unwrap();
        assert_eq!(Some("false"), health.samples()[0].label("buildable"));
    }

    #[test]
    fn excluded_results_are_not_summarized() {
        let job = JobSnapshot::new(
            JobInfo::new("a"),
            vec![
                RunInfo::completed(1, BuildResult::Success).duration(10),
                RunInfo::completed(2, BuildResult::Aborted).duration(20),
            ],
        );
        let fixture = fixture(Config {
            count_aborted_builds: false,
            ..Config::default()
        });
        fixture.host.update(|state| state.jobs = vec![job]);

        let families = fixture.collector.collect();
        let summary =
            family(&families, "default_jenkins_builds_duration_milliseconds_summary").unwrap();
        let count = summary
            .samples()
            .iter()
            .find(|s| s.name().ends_with("_count"))
            .unwrap();
        assert_eq!(1.0, count.value());
    }

    #[test]
    fn per_build_metrics_carry_build_number() {
        let job = JobSnapshot::new(
            JobInfo::new("a"),
            vec![
                RunInfo::completed(1, BuildResult::Success),
                RunInfo::completed(2, BuildResult::Failure),
                RunInfo::running(3),
            ],
        );
        let fixture = fixture(Config {
            per_build_metrics: true,
            ..Config::default()
        });
        fixture.host.update(|state| state.jobs = vec![job]);

        let families = fixture.collector.collect();
        let ordinal = family(&families, "default_jenkins_builds_build_result_ordinal").unwrap();
        let numbers: Vec<_> = ordinal
            .samples()
            .iter()
            .map(|s| (s.label("number").unwrap().to_string(), s.value()))
            .collect();
        assert_eq!(
            vec![("1".to_string(), 0.0), ("2".to_string(), 2.0)],
            numbers
        );

        let last = family(&families, "default_jenkins_builds_last_build_result_ordinal").unwrap();
        assert_eq!(2.0, last.samples()[0].value());
    }

    #[test]
    fn output_order_is_fixed() {
        let job = JobSnapshot::new(
            JobInfo::new("a"),
            vec![RunInfo::completed(1, BuildResult::Success).duration(5)],
        );
        let fixture = fixture(Config::default());
        fixture.host.update(|state| state.jobs = vec![job.clone()]);
        fixture.events.on_build_completed(job.build(1).unwrap());

        let names: Vec<_> = fixture
            .collector
            .collect()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(
            vec![
                "default_jenkins_builds_duration_milliseconds_summary",
                "default_jenkins_builds_success_build_count",
                "default_jenkins_builds_failed_build_count",
                "default_jenkins_builds_aborted_build_count",
                "default_jenkins_builds_unstable_build_count",
                "default_jenkins_builds_total_build_count",
                "default_jenkins_builds_health_score",
                "default_jenkins_builds_available_builds_count",
                "default_jenkins_builds_discard_active",
                "default_jenkins_builds_last_build_result_ordinal",
                "default_jenkins_builds_last_build_result",
                "default_jenkins_builds_last_build_duration_milliseconds",
                "default_jenkins_builds_last_build_start_time_milliseconds",
            ],
            names
        );
    }

    #[derive(Debug)]
    struct PanickingJob;

    impl Job for PanickingJob {
        fn full_name(&self) -> &str {
            "broken"
        }
        fn is_buildable(&self) -> bool {
            true
        }
        fn health_score(&self) -> i64 {
            0
        }
        fn build_count(&self) -> usize {
            1
        }
        fn has_build_discarder(&self) -> bool {
            false
        }
        fn last_build(&self) -> Option<Arc<dyn Run>> {
            panic!("build records unavailable")
        }
        fn log_updated_millis(&self) -> Option<i64> {
            None
        }
    }

    #[test]
    fn panicking_job_is_skipped() {
        let healthy = JobSnapshot::new(
            JobInfo::new("healthy"),
            vec![RunInfo::completed(1, BuildResult::Success)],
        );
        let fixture = fixture(Config::default());
        fixture
            .host
            .update(|state| state.jobs = vec![Arc::new(PanickingJob) as Arc<dyn Job>, healthy]);

        let families = fixture.collector.collect();
        let ordinal =
            family(&families, "default_jenkins_builds_last_build_result_ordinal").unwrap();
        assert_eq!(1, ordinal.samples().len());
        assert_eq!(Some("healthy"), ordinal.samples()[0].label("jenkins_job"));
    }

    struct PanickingRun(Arc<dyn Job>);

    impl Run for PanickingRun {
        fn number(&self) -> u64 {
            7
        }
        fn is_building(&self) -> bool {
            false
        }
        fn result(&self) -> Option<BuildResult> {
            panic!("build record corrupted")
        }
        fn start_time_millis(&self) -> i64 {
            0
        }
        fn duration_millis(&self) -> u64 {
            0
        }
        fn parent(&self) -> Option<Arc<dyn Job>> {
            Some(self.0.clone())
        }
        fn previous_build(&self) -> Option<Arc<dyn Run>> {
            None
        }
        fn parameters(&self) -> Vec<(String, String)> {
            Vec::new()
        }
        fn queued_duration_millis(&self) -> Option<u64> {
            None
        }
        fn log_size_bytes(&self) -> Option<u64> {
            None
        }
        fn test_counts(&self) -> Option<TestCounts> {
            None
        }
        fn likely_stuck(&self) -> Option<bool> {
            None
        }
        fn stages(&self) -> Option<Vec<Stage>> {
            None
        }
    }

    #[test]
    fn panicking_completion_event_is_skipped() {
        let healthy = JobSnapshot::new(
            JobInfo::new("healthy"),
            vec![RunInfo::completed(1, BuildResult::Success)],
        );
        let fixture = fixture(Config::default());
        fixture.host.update(|state| state.jobs = vec![healthy.clone()]);
        fixture
            .events
            .on_build_completed(Arc::new(PanickingRun(healthy.clone())));
        fixture.events.on_build_completed(healthy.build(1).unwrap());

        let families = fixture.collector.collect();
        let total = family(&families, "default_jenkins_builds_total_build_count").unwrap();
        assert_eq!(1.0, total.samples()[0].value());
        assert!(family(&families, "default_jenkins_builds_last_build_result_ordinal").is_some());
        assert!(fixture.events.is_empty());
    }

    #[test]
    fn disabled_job_contributes_nothing() {
        let job = JobSnapshot::new(
            JobInfo::new("team/secret/main"),
            vec![RunInfo::completed(1, BuildResult::Success)],
        );
        let fixture = fixture(Config {
            disabled_metrics: vec![DisabledMetric::JobRegex {
                pattern: "team/secret/.*".to_string(),
            }],
            ..Config::default()
        });
        fixture.host.update(|state| state.jobs = vec![job.clone()]);
        fixture.events.on_build_completed(job.build(1).unwrap());

        let families = fixture.collector.collect();
        assert!(families.iter().all(|f| f
            .samples()
            .iter()
            .all(|s| s.label("jenkins_job") != Some("team/secret/main"))));
        assert!(fixture.events.is_empty());
    }
}
