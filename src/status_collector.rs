//! Liveness, uptime and version of the host.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::collectors::{
    CollectorFactory, CollectorSpec, Constructor, GaugeCollector, MetricCollector,
};
use crate::config::SharedConfig;
use crate::model::HostStatus;

/// Label carrying the application version.
pub const VERSION_LABEL: &str = "version";

pub(crate) fn constructor(kind: MetricKind) -> Option<Constructor<dyn HostStatus>> {
    let constructor: Constructor<dyn HostStatus> = match kind {
        MetricKind::Up => |spec| gauge(spec, up),
        MetricKind::Uptime => |spec| gauge(spec, uptime),
        MetricKind::QuietDown => |spec| gauge(spec, quieting_down),
        MetricKind::NodesOnline => |spec| gauge(spec, nodes_online),
        MetricKind::Version => |spec| gauge(spec, version_known),
        _ => return None,
    };

    Some(constructor)
}

fn gauge(
    spec: CollectorSpec,
    value: fn(&dyn HostStatus) -> Option<f64>,
) -> Arc<dyn MetricCollector<dyn HostStatus>> {
    Arc::new(GaugeCollector::<dyn HostStatus>::new(spec, value))
}

fn up(_: &dyn HostStatus) -> Option<f64> {
    Some(1.0)
}

fn uptime(host: &dyn HostStatus) -> Option<f64> {
    Some(host.uptime_millis() as f64)
}

fn quieting_down(host: &dyn HostStatus) -> Option<f64> {
    Some(if host.is_quieting_down() { 1.0 } else { 0.0 })
}

fn nodes_online(host: &dyn HostStatus) -> Option<f64> {
    Some(host.nodes_online() as f64)
}

fn version_known(host: &dyn HostStatus) -> Option<f64> {
    host.version().map(|_| 1.0)
}

/// Reports whether the host is up, quieting down, how long it has been
/// running, how many nodes are online and which version it runs.
pub struct HostStatusCollector {
    config: Arc<SharedConfig>,
    host: Arc<dyn HostStatus>,
}

impl HostStatusCollector {
    /// Create a collector reading the state of `host`.
    pub fn new(config: Arc<SharedConfig>, host: Arc<dyn HostStatus>) -> Self {
        HostStatusCollector { config, host }
    }
}

impl fmt::Debug for HostStatusCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostStatusCollector").finish_non_exhaustive()
    }
}

impl Collector for HostStatusCollector {
    fn collect(&self) -> Vec<MetricFamilySamples> {
        let factory = CollectorFactory::new(&self.config.load());
        let host = self.host.as_ref();

        let mut gauges = Vec::new();
        for kind in [
            MetricKind::Up,
            MetricKind::Uptime,
            MetricKind::QuietDown,
            MetricKind::NodesOnline,
        ] {
            let gauge = factory.create_host_collector(kind, Vec::new());
            if let Err(err) = gauge.calculate_metric(host, &[]) {
                debug!(metric = kind.name(), %err, "skipping host status");
            }
            gauges.push(gauge);
        }

        let version =
            factory.create_host_collector(MetricKind::Version, vec![VERSION_LABEL.to_string()]);
        if let Some(value) = host.version() {
            if let Err(err) = version.calculate_metric(host, &[value]) {
                debug!(%err, "skipping host version");
            }
        }
        gauges.push(version);

        gauges.iter().flat_map(|gauge| gauge.collect()).collect()
    }
}
