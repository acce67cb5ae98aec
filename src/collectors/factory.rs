//! Creates collectors for metric kinds.
//!
//! See [`CollectorFactory`] for details.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{builds, jobs, CollectorSpec, Constructor, MetricCollector, NoOpCollector};
use crate::catalog::MetricKind;
use crate::config::{MetricStatusChecker, Settings};
use crate::model::{DiskItem, ExecutorLoad, FileStore, HostStatus, Job, JobDiskItem, Run};
use crate::registry::Descriptor;
use crate::{coverage_collector, disk_collector, executor_collector, status_collector};

/// Builds the collector for a metric kind under the active settings.
///
/// A kind disabled by configuration, or requested for the wrong kind of
/// entity, yields a [`NoOpCollector`]: it accepts every call and reports
/// nothing, so callers never have to check.
///
/// ```
/// # use build_exporter::catalog::MetricKind;
/// # use build_exporter::collectors::CollectorFactory;
/// # use build_exporter::config::Settings;
/// let factory = CollectorFactory::new(&Settings::default());
/// let collector = factory.create_run_collector(
///     MetricKind::BuildDuration,
///     vec!["jenkins_job".to_string()],
///     Some("last"),
/// );
/// assert!(collector.collect().iter().all(|family| family.is_empty()));
/// ```
#[derive(Debug, Clone)]
pub struct CollectorFactory {
    namespace: String,
    metric_status: MetricStatusChecker,
    quantiles: Arc<[f64]>,
}

impl CollectorFactory {
    /// A factory for `settings`.
    pub fn new(settings: &Settings) -> Self {
        CollectorFactory {
            namespace: settings.namespace().to_string(),
            metric_status: settings.metric_status().clone(),
            quantiles: Arc::from(settings.config().summary_quantiles.as_slice()),
        }
    }

    /// Namespace of the names this factory produces.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether `kind` is enabled.
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        self.metric_status
            .is_enabled(&kind.qualified_name(&self.namespace))
    }

    /// A collector of build metrics. `prefix` is inserted into the exposed
    /// name, e.g. `last` for metrics of a job's last build.
    pub fn create_run_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
        prefix: Option<&str>,
    ) -> Arc<dyn MetricCollector<dyn Run>> {
        self.create(kind, label_names, prefix, builds::constructor)
    }

    /// A collector of job metrics.
    pub fn create_job_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
        prefix: Option<&str>,
    ) -> Arc<dyn MetricCollector<dyn Job>> {
        self.create(kind, label_names, prefix, jobs::constructor)
    }

    /// A collector of executor load, labelled by node label.
    pub fn create_executor_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<ExecutorLoad>> {
        self.create(kind, label_names, None, executor_collector::constructor)
    }

    /// A collector of per-directory disk usage.
    pub fn create_directory_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<DiskItem>> {
        self.create(kind, label_names, None, disk_collector::directory_constructor)
    }

    /// A collector of per-job disk usage.
    pub fn create_job_disk_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<JobDiskItem>> {
        self.create(kind, label_names, None, disk_collector::job_constructor)
    }

    /// A collector of file store sizes.
    pub fn create_file_store_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<dyn FileStore>> {
        self.create(kind, label_names, None, disk_collector::file_store_constructor)
    }

    /// A collector of host status.
    pub fn create_host_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<dyn HostStatus>> {
        self.create(kind, label_names, None, status_collector::constructor)
    }

    /// A collector of the coverage published by a build.
    pub fn create_coverage_collector(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
    ) -> Arc<dyn MetricCollector<dyn Run>> {
        self.create(kind, label_names, None, coverage_collector::constructor)
    }

    fn create<E: ?Sized + 'static>(
        &self,
        kind: MetricKind,
        label_names: Vec<String>,
        prefix: Option<&str>,
        lookup: fn(MetricKind) -> Option<Constructor<E>>,
    ) -> Arc<dyn MetricCollector<E>> {
        let name = kind.qualified_name(&self.namespace);
        if !self.metric_status.is_enabled(&name) {
            debug!(metric = %name, "metric disabled, using no-op collector");
            return Arc::new(NoOpCollector);
        }

        let Some(constructor) = lookup(kind) else {
            warn!(metric = %name, entity = ?kind.target(), "no collector for metric kind");
            return Arc::new(NoOpCollector);
        };

        constructor(CollectorSpec {
            descriptor: Descriptor::for_kind(kind, &self.namespace, prefix),
            label_names,
            quantiles: self.quantiles.clone(),
        })
    }
}
