//! Metric collectors: one instrument bound to one label schema.
//!
//! A [`MetricCollector`] is fed entities with
//! [`MetricCollector::calculate_metric`] and reports what it saw with
//! [`MetricCollector::collect`]. Collectors are obtained from a
//! [`CollectorFactory`], counters through the [`CounterCache`] so that their
//! values survive from one scrape to the next.

mod base;
mod builds;
pub mod counters;
pub mod factory;
mod jobs;
mod stages;

pub use base::{CounterCollector, GaugeCollector, NoOpCollector, SummaryCollector};
pub use counters::CounterCache;
pub use factory::CollectorFactory;
pub use stages::{StageResultOrdinalCollector, StageSummaryCollector};

use std::sync::Arc;

use crate::collector::MetricFamilySamples;
use crate::error::Error;
use crate::model::{Job, Run};
use crate::registry::Descriptor;

/// Computes one metric from entities of type `E`.
pub trait MetricCollector<E: ?Sized>: Send + Sync {
    /// Update the instrument from `entity`.
    ///
    /// `label_values` must hold exactly one value per label of the
    /// collector's schema, in order. Otherwise [`Error::LabelArity`] is
    /// returned and nothing is recorded. Entities without data for this
    /// metric are not an error: no sample is recorded for them.
    fn calculate_metric(&self, entity: &E, label_values: &[String]) -> Result<(), Error>;

    /// The samples recorded so far.
    fn collect(&self) -> Vec<MetricFamilySamples>;
}

/// A shared collector of build metrics.
pub type RunCollector = Arc<dyn MetricCollector<dyn Run>>;

/// A shared collector of job metrics.
pub type JobMetricCollector = Arc<dyn MetricCollector<dyn Job>>;

/// Everything a collector is built from.
#[derive(Debug, Clone)]
pub struct CollectorSpec {
    /// Exposed name, help and type.
    pub descriptor: Descriptor,
    /// Label schema.
    pub label_names: Vec<String>,
    /// Quantiles tracked by summaries.
    pub quantiles: Arc<[f64]>,
}

/// Builds the collector for one metric kind.
pub type Constructor<E> = fn(CollectorSpec) -> Arc<dyn MetricCollector<E>>;
