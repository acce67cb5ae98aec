//! Executor load per node label.
//!
//! See [`ExecutorCollector`] for details.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::collectors::{
    CollectorFactory, CollectorSpec, Constructor, GaugeCollector, MetricCollector,
};
use crate::config::SharedConfig;
use crate::model::{ExecutorLoad, ExecutorSource};

/// Label carrying the node label an executor load belongs to.
pub const LABEL_NAME: &str = "label";

const KINDS: [MetricKind; 7] = [
    MetricKind::ExecutorsAvailable,
    MetricKind::ExecutorsBusy,
    MetricKind::ExecutorsConnecting,
    MetricKind::ExecutorsDefined,
    MetricKind::ExecutorsIdle,
    MetricKind::ExecutorsOnline,
    MetricKind::ExecutorsQueueLength,
];

pub(crate) fn constructor(kind: MetricKind) -> Option<Constructor<ExecutorLoad>> {
    let constructor: Constructor<ExecutorLoad> = match kind {
        MetricKind::ExecutorsAvailable => |spec| gauge(spec, |load| Some(load.available as f64)),
        MetricKind::ExecutorsBusy => |spec| gauge(spec, |load| Some(load.busy as f64)),
        MetricKind::ExecutorsConnecting => {
            |spec| gauge(spec, |load| Some(load.connecting as f64))
        }
        MetricKind::ExecutorsDefined => |spec| gauge(spec, |load| Some(load.defined as f64)),
        MetricKind::ExecutorsIdle => |spec| gauge(spec, |load| Some(load.idle as f64)),
        MetricKind::ExecutorsOnline => |spec| gauge(spec, |load| Some(load.online as f64)),
        MetricKind::ExecutorsQueueLength => {
            |spec| gauge(spec, |load| Some(load.queue_length as f64))
        }
        _ => return None,
    };

    Some(constructor)
}

fn gauge(
    spec: CollectorSpec,
    value: fn(&ExecutorLoad) -> Option<f64>,
) -> Arc<dyn MetricCollector<ExecutorLoad>> {
    Arc::new(GaugeCollector::new(spec, value))
}

/// Reports the executors of every node label: how many are defined, online,
/// busy and so on, and how many builds wait for them.
pub struct ExecutorCollector {
    config: Arc<SharedConfig>,
    source: Arc<dyn ExecutorSource>,
}

impl ExecutorCollector {
    /// Create a collector reading executor load from `source`.
    pub fn new(config: Arc<SharedConfig>, source: Arc<dyn ExecutorSource>) -> Self {
        ExecutorCollector { config, source }
    }
}

impl fmt::Debug for ExecutorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorCollector").finish_non_exhaustive()
    }
}

impl Collector for ExecutorCollector {
    fn collect(&self) -> Vec<MetricFamilySamples> {
        let factory = CollectorFactory::new(&self.config.load());
        let gauges: Vec<_> = KINDS
            .iter()
            .map(|kind| factory.create_executor_collector(*kind, vec![LABEL_NAME.to_string()]))
            .collect();

        for load in self.source.executor_loads() {
            let values = [load.label.clone()];
            for gauge in &gauges {
                if let Err(err) = gauge.calculate_metric(&load, &values) {
                    debug!(label = %load.label, %err, "skipping executor load");
                }
            }
        }

        gauges.iter().flat_map(|gauge| gauge.collect()).collect()
    }
}
