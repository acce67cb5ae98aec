#![deny(dead_code)]
#![deny(missing_docs)]
#![deny(unused)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Exposes the state of a CI build host to monitoring systems like
//! [Prometheus](https://prometheus.io/).
//!
//! The host's jobs, builds, executors and storage are read through the
//! capability traits in [`model`] whenever a scrape runs. Every metric is one
//! [`MetricKind`](catalog::MetricKind), computed by a
//! [`MetricCollector`](collectors::MetricCollector) that the
//! [`CollectorFactory`](collectors::CollectorFactory) builds under the active
//! configuration. Build counters are the exception: they are fed builds as
//! they complete, through the [`CompletionEventBuffer`](listener::CompletionEventBuffer),
//! and keep counting across scrapes.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use build_exporter::collectors::CounterCache;
//! use build_exporter::config::{Config, Settings, SharedConfig};
//! use build_exporter::job_collector::JobCollector;
//! use build_exporter::listener::CompletionEventBuffer;
//! use build_exporter::model::{BuildResult, Job};
//! use build_exporter::model::snapshot::{HostSnapshot, JobInfo, JobSnapshot, RunInfo};
//! use build_exporter::registry::Registry;
//! use build_exporter::service::MetricsService;
//!
//! // Describe the host. Real hosts implement the `model` traits instead.
//! let job = JobSnapshot::new(
//!     JobInfo::new("team/service/main"),
//!     vec![RunInfo::completed(1, BuildResult::Success).duration(1_500)],
//! );
//! let host = Arc::new(HostSnapshot::with_jobs(vec![job.clone() as Arc<dyn Job>]));
//!
//! // Activate a configuration.
//! let config = Config {
//!     namespace: Some("ci".to_string()),
//!     ..Config::default()
//! };
//! let config = Arc::new(SharedConfig::new(Settings::new(config).unwrap()));
//!
//! // The host reports every completed build.
//! let events = Arc::new(CompletionEventBuffer::new());
//! events.on_build_completed(job.last_build().unwrap());
//!
//! let mut registry = Registry::with_config(config.clone());
//! registry.register_collector(Box::new(JobCollector::new(
//!     config.clone(),
//!     host,
//!     events,
//!     Arc::new(CounterCache::default()),
//! )));
//!
//! let service = MetricsService::new(registry, config);
//! service.collect_metrics();
//!
//! let exposition = service.metrics();
//! assert!(exposition.contains(
//!     "ci_jenkins_builds_success_build_count_total{jenkins_job=\"team/service/main\",repo=\"service\",buildable=\"true\"} 1\n"
//! ));
//! assert!(exposition.contains(
//!     "ci_jenkins_builds_last_build_duration_milliseconds{jenkins_job=\"team/service/main\",repo=\"service\",buildable=\"true\"} 1500\n"
//! ));
//! ```

pub mod catalog;
pub mod collector;
pub mod collectors;
pub mod config;
pub mod coverage_collector;
pub mod disk_collector;
pub mod encoding;
pub mod error;
pub mod executor_collector;
pub mod job_collector;
pub mod labels;
pub mod listener;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod service;
pub mod status_collector;
