use std::sync::Arc;

use build_exporter::collectors::CounterCache;
use build_exporter::config::{Config, Settings, SharedConfig};
use build_exporter::encoding::text::encode;
use build_exporter::job_collector::JobCollector;
use build_exporter::listener::CompletionEventBuffer;
use build_exporter::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
use build_exporter::model::{BuildResult, Job, Stage, StageStatus, TestCounts};
use build_exporter::registry::Registry;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const JOBS: usize = 500;
const BUILDS_PER_JOB: u64 = 20;

fn host() -> Vec<Arc<JobSnapshot>> {
    (0..JOBS)
        .map(|i| {
            let runs = (1..=BUILDS_PER_JOB)
                .map(|number| {
                    let result = BuildResult::ALL[(number as usize + i) % BuildResult::ALL.len()];
                    RunInfo::completed(number, result)
                        .started_at(number as i64 * 60_000)
                        .duration(1_000 + number * 10)
                        .queued(50)
                        .log_size(4_096)
                        .parameter("branch", "main")
                        .tests(TestCounts {
                            total: 100,
                            failed: number % 3,
                            skipped: 1,
                        })
                        .stages(vec![
                            Stage::new("checkout", StageStatus::Success, 100),
                            Stage::new("build", StageStatus::Success, 600),
                            Stage::new("test", StageStatus::Unstable, 300),
                        ])
                })
                .collect();
            JobSnapshot::new(JobInfo::new(format!("team/repo-{i}/main")), runs)
        })
        .collect()
}

fn registry(config: Config, jobs: &[Arc<JobSnapshot>]) -> (Registry, Arc<CompletionEventBuffer>) {
    let config = Arc::new(SharedConfig::new(
        Settings::new(config).expect("valid bench configuration"),
    ));
    let host = Arc::new(HostSnapshot::with_jobs(
        jobs.iter().map(|job| job.clone() as Arc<dyn Job>).collect(),
    ));
    let events = Arc::new(CompletionEventBuffer::new());

    let mut registry = Registry::with_config(config.clone());
    registry.register_collector(Box::new(JobCollector::new(
        config,
        host,
        events.clone(),
        Arc::new(CounterCache::default()),
    )));
    (registry, events)
}

pub fn scrape(c: &mut Criterion) {
    let jobs = host();

    c.bench_function("scrape last builds", |b| {
        let (registry, _) = registry(Config::default(), &jobs);
        b.iter(|| black_box(registry.collect()));
    });

    c.bench_function("scrape per build metrics", |b| {
        let config = Config {
            per_build_metrics: true,
            append_status_label: true,
            labeled_build_parameter_names: vec!["branch".to_string()],
            ..Config::default()
        };
        let (registry, _) = registry(config, &jobs);
        b.iter(|| black_box(registry.collect()));
    });

    c.bench_function("count completed builds", |b| {
        let (registry, events) = registry(Config::default(), &jobs);
        b.iter(|| {
            for job in &jobs {
                if let Some(run) = job.last_build() {
                    events.on_build_completed(run);
                }
            }
            black_box(registry.collect())
        });
    });

    c.bench_function("scrape and encode", |b| {
        let (registry, _) = registry(Config::default(), &jobs);
        let mut buffer = String::new();
        b.iter(|| {
            buffer.clear();
            encode(&mut buffer, &registry.collect()).unwrap();
            black_box(&buffer);
        });
    });
}

criterion_group!(benches, scrape);
criterion_main!(benches);
