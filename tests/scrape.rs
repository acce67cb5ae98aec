use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use build_exporter::catalog::MetricKind;
use build_exporter::collector::{Collector, MetricFamilySamples};
use build_exporter::collectors::{CollectorFactory, CounterCache};
use build_exporter::config::{Config, DisabledMetric, Settings, SharedConfig};
use build_exporter::job_collector::JobCollector;
use build_exporter::listener::CompletionEventBuffer;
use build_exporter::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
use build_exporter::model::{BuildResult, Job, Stage, StageStatus};
use build_exporter::registry::Registry;
use quickcheck::{quickcheck, Arbitrary, Gen};

struct Exporter {
    config: Arc<SharedConfig>,
    host: Arc<HostSnapshot>,
    events: Arc<CompletionEventBuffer>,
    registry: Registry,
}

impl Exporter {
    fn new(config: Config) -> Self {
        let config = Arc::new(SharedConfig::new(Settings::new(config).unwrap()));
        let host = Arc::new(HostSnapshot::default());
        let events = Arc::new(CompletionEventBuffer::new());

        let mut registry = Registry::with_config(config.clone());
        registry.register_collector(Box::new(JobCollector::new(
            config.clone(),
            host.clone(),
            events.clone(),
            Arc::new(CounterCache::default()),
        )));

        Exporter {
            config,
            host,
            events,
            registry,
        }
    }

    fn add_job(&self, job: Arc<JobSnapshot>) {
        self.host.update(|state| state.jobs.push(job));
    }

    fn complete(&self, job: &JobSnapshot, number: u64) {
        self.events.on_build_completed(job.build(number).unwrap());
    }

    fn scrape(&self) -> Vec<MetricFamilySamples> {
        self.registry.collect()
    }
}

fn family<'a>(families: &'a [MetricFamilySamples], name: &str) -> Option<&'a MetricFamilySamples> {
    families.iter().find(|f| f.name() == name)
}

/// Value of the first sample called `sample` with the given job label.
fn value(families: &[MetricFamilySamples], sample: &str, job: &str) -> Option<f64> {
    families
        .iter()
        .flat_map(|f| f.samples())
        .find(|s| s.name() == sample && s.label("jenkins_job") == Some(job))
        .map(|s| s.value())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[test]
fn single_successful_build() {
    let exporter = Exporter::new(Config::default());
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![RunInfo::completed(1, BuildResult::Success).duration(100)],
    );
    exporter.add_job(job.clone());
    exporter.complete(&job, 1);

    let families = exporter.scrape();
    let counter = |name: &str| value(&families, &format!("default_jenkins_builds_{name}_build_count_total"), "a");
    assert_eq!(Some(1.0), counter("total"));
    assert_eq!(Some(1.0), counter("success"));
    assert_eq!(Some(0.0), counter("failed"));
    assert_eq!(Some(0.0), counter("unstable"));
    assert_eq!(Some(0.0), counter("aborted"));

    let ordinal = family(&families, "default_jenkins_builds_last_build_result_ordinal").unwrap();
    assert_eq!(1, ordinal.samples().len());
    assert_eq!(
        BuildResult::Success.ordinal() as f64,
        ordinal.samples()[0].value()
    );
}

#[test]
fn last_build_skips_running_build() {
    let exporter = Exporter::new(Config::default());
    let started = now_millis() - 5_000;
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![
            RunInfo::completed(1, BuildResult::Failure)
                .started_at(1_000)
                .duration(700),
            RunInfo::running(2).started_at(started),
        ],
    );
    exporter.add_job(job);

    let families = exporter.scrape();
    assert_eq!(
        Some(700.0),
        value(&families, "default_jenkins_builds_last_build_duration_milliseconds", "a")
    );
    assert_eq!(
        Some(1_000.0),
        value(&families, "default_jenkins_builds_last_build_start_time_milliseconds", "a")
    );
    assert_eq!(
        Some(2.0),
        value(&families, "default_jenkins_builds_last_build_result_ordinal", "a")
    );

    let running = value(
        &families,
        "default_jenkins_builds_running_build_duration_milliseconds",
        "a",
    )
    .unwrap();
    assert!(running >= 5_000.0, "running for {running}ms");
    assert!(running < 65_000.0, "running for {running}ms");
}

#[test]
fn nothing_counted_unregisters_listener() {
    let exporter = Exporter::new(Config {
        count_successful_builds: false,
        count_unstable_builds: false,
        count_failed_builds: false,
        count_not_built_builds: false,
        count_aborted_builds: false,
        ..Config::default()
    });
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![RunInfo::completed(1, BuildResult::Success)],
    );
    exporter.add_job(job.clone());
    exporter.complete(&job, 1);

    assert!(exporter.scrape().is_empty());
    assert!(!exporter.events.is_registered());
    assert!(exporter.events.is_empty());

    exporter.complete(&job, 1);
    assert!(exporter.events.is_empty());
}

#[test]
fn failed_stage_is_not_summarized() {
    let exporter = Exporter::new(Config::default());
    let job = JobSnapshot::new(
        JobInfo::new("pipeline"),
        vec![RunInfo::completed(1, BuildResult::Failure).stages(vec![
            Stage::new("checkout", StageStatus::Success, 10),
            Stage::new("test", StageStatus::Failed, 20),
            Stage::new("deploy", StageStatus::Success, 30),
        ])],
    );
    exporter.add_job(job);

    let families = exporter.scrape();
    let summary = family(
        &families,
        "default_jenkins_builds_last_stage_duration_milliseconds_summary",
    )
    .unwrap();
    let observations: f64 = summary
        .samples()
        .iter()
        .filter(|s| s.name().ends_with("_count"))
        .map(|s| s.value())
        .sum();
    assert_eq!(2.0, observations);
    assert!(summary
        .samples()
        .iter()
        .all(|s| s.label("stage") != Some("test")));

    let ordinal = family(&families, "default_jenkins_builds_last_stage_result_ordinal").unwrap();
    assert_eq!(3, ordinal.samples().len());
}

#[test]
fn counters_persist_across_scrapes() {
    let exporter = Exporter::new(Config::default());
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![
            RunInfo::completed(1, BuildResult::Success),
            RunInfo::completed(2, BuildResult::Failure),
        ],
    );
    exporter.add_job(job.clone());
    let total = "default_jenkins_builds_total_build_count_total";

    exporter.complete(&job, 1);
    assert_eq!(Some(1.0), value(&exporter.scrape(), total, "a"));

    exporter.complete(&job, 2);
    let families = exporter.scrape();
    assert_eq!(Some(2.0), value(&families, total, "a"));
    assert_eq!(
        Some(1.0),
        value(&families, "default_jenkins_builds_failed_build_count_total", "a")
    );

    assert_eq!(Some(2.0), value(&exporter.scrape(), total, "a"));
}

#[test]
fn namespace_change_starts_new_counters() {
    let exporter = Exporter::new(Config::default());
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![
            RunInfo::completed(1, BuildResult::Success),
            RunInfo::completed(2, BuildResult::Success),
        ],
    );
    exporter.add_job(job.clone());

    exporter.complete(&job, 1);
    exporter.scrape();

    exporter.config.store(
        Settings::new(Config {
            namespace: Some("other".to_string()),
            ..Config::default()
        })
        .unwrap(),
    );
    exporter.complete(&job, 2);

    let families = exporter.scrape();
    assert_eq!(
        Some(1.0),
        value(&families, "other_jenkins_builds_total_build_count_total", "a")
    );
    assert!(families
        .iter()
        .all(|f| !f.name().starts_with("default_jenkins")));
}

#[test]
fn disabled_metrics_are_not_exposed() {
    let exporter = Exporter::new(Config {
        disabled_metrics: vec![
            DisabledMetric::Regex {
                pattern: "default_jenkins_builds_last_build_.*".to_string(),
            },
            DisabledMetric::Name {
                name: "default_jenkins_health_score".to_string(),
            },
        ],
        ..Config::default()
    });
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![RunInfo::completed(1, BuildResult::Success).duration(5)],
    );
    exporter.add_job(job);

    let families = exporter.scrape();
    assert!(family(&families, "default_jenkins_builds_last_build_duration_milliseconds").is_none());
    assert!(family(&families, "default_jenkins_builds_last_build_result_ordinal").is_none());
    assert!(family(&families, "default_jenkins_builds_health_score").is_none());
    assert!(family(&families, "default_jenkins_builds_available_builds_count").is_some());
}

#[test]
fn disabling_a_counter_after_it_was_exposed_hides_it() {
    let exporter = Exporter::new(Config::default());
    let job = JobSnapshot::new(
        JobInfo::new("a"),
        vec![
            RunInfo::completed(1, BuildResult::Failure),
            RunInfo::completed(2, BuildResult::Failure),
        ],
    );
    exporter.add_job(job.clone());
    let failed = "default_jenkins_builds_failed_build_count";

    exporter.complete(&job, 1);
    assert!(family(&exporter.scrape(), failed).is_some());

    exporter.config.store(
        Settings::new(Config {
            disabled_metrics: vec![DisabledMetric::Name {
                name: "default_jenkins_failed_build_count".to_string(),
            }],
            ..Config::default()
        })
        .unwrap(),
    );
    let families = exporter.scrape();
    assert!(family(&families, failed).is_none());
    assert!(family(&families, "default_jenkins_builds_total_build_count").is_some());

    exporter.config.store(Settings::default());
    exporter.complete(&job, 2);
    assert_eq!(
        Some(2.0),
        value(&exporter.scrape(), "default_jenkins_builds_failed_build_count_total", "a")
    );
}

#[test]
fn disabled_job_is_neither_processed_nor_counted() {
    let exporter = Exporter::new(Config {
        disabled_metrics: vec![DisabledMetric::JobRegex {
            pattern: "sandbox/.*".to_string(),
        }],
        ..Config::default()
    });
    let hidden = JobSnapshot::new(
        JobInfo::new("sandbox/experiment"),
        vec![RunInfo::completed(1, BuildResult::Success)],
    );
    let visible = JobSnapshot::new(
        JobInfo::new("team/app"),
        vec![RunInfo::completed(1, BuildResult::Success)],
    );
    exporter.add_job(hidden.clone());
    exporter.add_job(visible.clone());
    exporter.complete(&hidden, 1);
    exporter.complete(&visible, 1);

    let families = exporter.scrape();
    let jobs: Vec<_> = families
        .iter()
        .flat_map(|f| f.samples())
        .filter_map(|s| s.label("jenkins_job"))
        .collect();
    assert!(jobs.contains(&"team/app"));
    assert!(!jobs.contains(&"sandbox/experiment"));
}

#[test]
fn job_without_completed_build_has_no_samples() {
    let exporter = Exporter::new(Config::default());
    exporter.add_job(JobSnapshot::new(
        JobInfo::new("fresh"),
        vec![RunInfo::running(1)],
    ));

    let families = exporter.scrape();
    assert!(families
        .iter()
        .flat_map(|f| f.samples())
        .all(|s| s.label("jenkins_job") != Some("fresh")));
}

#[derive(Clone, Copy, Debug)]
struct ArbitraryResult(BuildResult);

impl Arbitrary for ArbitraryResult {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbitraryResult(*g.choose(&BuildResult::ALL).unwrap())
    }
}

fn job_with_results(results: &[ArbitraryResult]) -> Arc<JobSnapshot> {
    let runs = results
        .iter()
        .enumerate()
        .map(|(i, result)| RunInfo::completed(i as u64 + 1, result.0))
        .collect();
    JobSnapshot::new(JobInfo::new("a"), runs)
}

#[test]
fn counters_partition_completed_builds() {
    fn prop(results: Vec<ArbitraryResult>) -> bool {
        if results.is_empty() {
            return true;
        }
        let exporter = Exporter::new(Config::default());
        let job = job_with_results(&results);
        exporter.add_job(job.clone());
        for number in 1..=results.len() as u64 {
            exporter.complete(&job, number);
        }

        let families = exporter.scrape();
        let counted = |name: &str| {
            value(&families, &format!("default_jenkins_builds_{name}_build_count_total"), "a")
                .unwrap_or_default()
        };
        let expected = |result: BuildResult| results.iter().filter(|r| r.0 == result).count() as f64;

        counted("success") == expected(BuildResult::Success)
            && counted("failed") == expected(BuildResult::Failure)
            && counted("unstable") == expected(BuildResult::Unstable)
            && counted("aborted") == expected(BuildResult::Aborted)
            && counted("total") == results.len() as f64 - expected(BuildResult::NotBuilt)
    }

    quickcheck(prop as fn(Vec<ArbitraryResult>) -> bool);
}

#[test]
fn completed_builds_are_counted_once() {
    fn prop(results: Vec<ArbitraryResult>, scrapes: u8) -> bool {
        let exporter = Exporter::new(Config::default());
        let job = job_with_results(&results);
        exporter.add_job(job.clone());
        for number in 1..=results.len() as u64 {
            exporter.complete(&job, number);
        }

        let totals: Vec<_> = (0..=scrapes % 4)
            .map(|_| {
                value(
                    &exporter.scrape(),
                    "default_jenkins_builds_total_build_count_total",
                    "a",
                )
            })
            .collect();

        exporter.events.is_empty() && totals.windows(2).all(|w| w[0] == w[1])
    }

    quickcheck(prop as fn(Vec<ArbitraryResult>, u8) -> bool);
}

#[test]
fn counter_identity_is_stable() {
    fn prop(label_names: Vec<String>, use_prefix: bool) -> bool {
        let cache = CounterCache::default();
        let factory = CollectorFactory::new(&Settings::default());
        let prefix = use_prefix.then_some("last");

        let first = cache.get(&factory, MetricKind::BuildTotalCounter, label_names.clone(), prefix);
        let second = cache.get(&factory, MetricKind::BuildTotalCounter, label_names.clone(), prefix);
        let other = cache.get(&factory, MetricKind::BuildFailedCounter, label_names, prefix);

        Arc::ptr_eq(&first, &second) && !Arc::ptr_eq(&first, &other) && cache.len() == 2
    }

    quickcheck(prop as fn(Vec<String>, bool) -> bool);
}

#[test]
fn job_collector_can_be_used_without_registry() {
    let config = Arc::new(SharedConfig::default());
    let job = JobSnapshot::new(
        JobInfo::new("folder/repo/main"),
        vec![RunInfo::completed(1, BuildResult::Unstable)],
    );
    let collector = JobCollector::new(
        config,
        Arc::new(HostSnapshot::with_jobs(vec![job as Arc<dyn Job>])),
        Arc::new(CompletionEventBuffer::new()),
        Arc::new(CounterCache::default()),
    );

    let families = collector.collect();
    let result = family(&families, "default_jenkins_builds_last_build_result").unwrap();
    assert_eq!(Some("repo"), result.samples()[0].label("repo"));
    assert_eq!(1.0, result.samples()[0].value());
}
