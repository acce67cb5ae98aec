//! Disk usage of the host's home directory, its jobs and file stores.
//!
//! See [`DiskUsageCollector`] for details.

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::collectors::{
    CollectorFactory, CollectorSpec, Constructor, GaugeCollector, MetricCollector,
};
use crate::config::SharedConfig;
use crate::model::{DiskItem, DiskUsageSource, FileStore, JobDiskItem};

/// Label carrying the file store a measurement belongs to.
pub const FILE_STORE_LABEL: &str = "file_store";

const KIB: f64 = 1024.0;

pub(crate) fn directory_constructor(kind: MetricKind) -> Option<Constructor<DiskItem>> {
    let constructor: Constructor<DiskItem> = match kind {
        MetricKind::DiskUsageBytes => {
            |spec| gauge::<DiskItem>(spec, |item| item.usage_kib.map(|kib| kib as f64 * KIB))
        }
        MetricKind::DiskUsageFileCount => {
            |spec| gauge::<DiskItem>(spec, |item| item.file_count.map(|count| count as f64))
        }
        _ => return None,
    };

    Some(constructor)
}

pub(crate) fn job_constructor(kind: MetricKind) -> Option<Constructor<JobDiskItem>> {
    let constructor: Constructor<JobDiskItem> = match kind {
        MetricKind::JobUsageBytes => {
            |spec| gauge::<JobDiskItem>(spec, |item| item.usage_kib.map(|kib| kib as f64 * KIB))
        }
        _ => return None,
    };

    Some(constructor)
}

pub(crate) fn file_store_constructor(kind: MetricKind) -> Option<Constructor<dyn FileStore>> {
    let constructor: Constructor<dyn FileStore> = match kind {
        MetricKind::FileStoreAvailableBytes => |spec| store_gauge(spec, available_bytes),
        MetricKind::FileStoreCapacityBytes => |spec| store_gauge(spec, capacity_bytes),
        _ => return None,
    };

    Some(constructor)
}

fn gauge<E: 'static>(
    spec: CollectorSpec,
    value: fn(&E) -> Option<f64>,
) -> Arc<dyn MetricCollector<E>> {
    Arc::new(GaugeCollector::new(spec, value))
}

fn store_gauge(
    spec: CollectorSpec,
    value: fn(&dyn FileStore) -> Option<f64>,
) -> Arc<dyn MetricCollector<dyn FileStore>> {
    Arc::new(GaugeCollector::<dyn FileStore>::new(spec, value))
}

fn available_bytes(store: &dyn FileStore) -> Option<f64> {
    Some(bytes_or_nan(store, "usable space", store.usable_space()))
}

fn capacity_bytes(store: &dyn FileStore) -> Option<f64> {
    Some(bytes_or_nan(store, "capacity", store.total_space()))
}

fn bytes_or_nan(store: &dyn FileStore, what: &str, size: io::Result<u64>) -> f64 {
    match size {
        Ok(bytes) => bytes as f64,
        Err(err) => {
            warn!(file_store = store.name(), %err, "failed to read {what}");
            f64::NAN
        }
    }
}

/// Reports the host's last disk usage calculation.
///
/// Nothing is reported while disk usage collection is disabled or before the
/// host has calculated usage once. Directory and job usage are measured in
/// KiB by the host and exposed in bytes. A file store whose size can't be
/// read is reported as `NaN`.
pub struct DiskUsageCollector {
    config: Arc<SharedConfig>,
    source: Arc<dyn DiskUsageSource>,
}

impl DiskUsageCollector {
    /// Create a collector reading disk usage from `source`.
    pub fn new(config: Arc<SharedConfig>, source: Arc<dyn DiskUsageSource>) -> Self {
        DiskUsageCollector { config, source }
    }
}

impl fmt::Debug for DiskUsageCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskUsageCollector").finish_non_exhaustive()
    }
}

impl Collector for DiskUsageCollector {
    fn collect(&self) -> Vec<MetricFamilySamples> {
        let settings = self.config.load();
        if !settings.config().collect_disk_usage {
            return Vec::new();
        }
        let Some(usage) = self.source.disk_usage() else {
            debug!("disk usage not calculated yet");
            return Vec::new();
        };

        let factory = CollectorFactory::new(&settings);

        let directories = [MetricKind::DiskUsageBytes, MetricKind::DiskUsageFileCount]
            .map(|kind| {
                factory.create_directory_collector(kind, label_names(&[FILE_STORE_LABEL, "directory"]))
            });
        for item in &usage.directories {
            let values = [item.file_store.clone(), item.directory.clone()];
            for gauge in &directories {
                if let Err(err) = gauge.calculate_metric(item, &values) {
                    debug!(directory = %item.directory, %err, "skipping directory");
                }
            }
        }

        let jobs = factory.create_job_disk_collector(
            MetricKind::JobUsageBytes,
            label_names(&[FILE_STORE_LABEL, "jobName", "url"]),
        );
        for item in &usage.jobs {
            let values = [item.file_store.clone(), item.job_name.clone(), item.url.clone()];
            if let Err(err) = jobs.calculate_metric(item, &values) {
                debug!(job = %item.job_name, %err, "skipping job disk usage");
            }
        }

        let stores = [
            MetricKind::FileStoreAvailableBytes,
            MetricKind::FileStoreCapacityBytes,
        ]
        .map(|kind| factory.create_file_store_collector(kind, label_names(&[FILE_STORE_LABEL])));
        for store in &usage.file_stores {
            let values = [store.name().to_string()];
            for gauge in &stores {
                if let Err(err) = gauge.calculate_metric(store.as_ref(), &values) {
                    debug!(file_store = store.name(), %err, "skipping file store");
                }
            }
        }

        let mut families: Vec<_> = directories.iter().flat_map(|g| g.collect()).collect();
        families.extend(jobs.collect());
        families.extend(stores.iter().flat_map(|g| g.collect()));
        families
    }
}

fn label_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};
    use crate::model::snapshot::{FileStoreSnapshot, HostSnapshot, HostState};
    use crate::model::DiskUsage;

    fn host() -> Arc<HostSnapshot> {
        Arc::new(HostSnapshot::new(HostState {
            disk_usage: Some(DiskUsage {
                directories: vec![DiskItem {
                    file_store: "/dev/sda1".to_string(),
                    directory: "jobs".to_string(),
                    usage_kib: Some(2),
                    file_count: Some(7),
                }],
                jobs: vec![JobDiskItem {
                    file_store: "/dev/sda1".to_string(),
                    job_name: "a".to_string(),
                    url: "job/a/".to_string(),
                    usage_kib: None,
                }],
                file_stores: vec![Arc::new(FileStoreSnapshot {
                    name: "/dev/sda1".to_string(),
                    usable_bytes: Some(100),
                    total_bytes: None,
                }) as Arc<dyn FileStore>],
            }),
            ..Default::default()
        }))
    }

    fn value(families: &[MetricFamilySamples], name: &str) -> Option<f64> {
        families
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.samples()[0].value())
    }

    #[test]
    fn usage_is_exposed_in_bytes() {
        let collector = DiskUsageCollector::new(Arc::new(SharedConfig::default()), host());
        let families = collector.collect();

        assert_eq!(Some(2048.0), value(&families, "default_jenkins_disk_usage_bytes"));
        assert_eq!(Some(7.0), value(&families, "default_jenkins_disk_usage_file_count"));
        assert_eq!(
            Some(100.0),
            value(&families, "default_jenkins_file_store_available_bytes")
        );
        assert!(value(&families, "default_jenkins_file_store_capacity_bytes")
            .unwrap()
            .is_nan());
        assert!(families
            .iter()
            .find(|f| f.name() == "default_jenkins_job_usage_bytes")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn nothing_when_disabled() {
        let config = SharedConfig::new(
            Settings::new(Config {
                collect_disk_usage: false,
                ..Config::default()
            })
            .unwrap(),
        );
        let collector = DiskUsageCollector::new(Arc::new(config), host());
        assert!(collector.collect().is_empty());
    }

    #[test]
    fn nothing_before_first_calculation() {
        let collector = DiskUsageCollector::new(
            Arc::new(SharedConfig::default()),
            Arc::new(HostSnapshot::default()),
        );
        assert!(collector.collect().is_empty());
    }
}
