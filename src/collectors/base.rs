use std::fmt;
use std::sync::Arc;

use super::{CollectorSpec, MetricCollector};
use crate::collector::MetricFamilySamples;
use crate::error::Error;
use crate::metrics::counter::Counter;
use crate::metrics::family::{Family, MetricConstructor};
use crate::metrics::gauge::Gauge;
use crate::metrics::summary::{Summary, DEFAULT_TARGET_ERROR};
use crate::model::{BuildResult, Run};
use crate::registry::Descriptor;

/// Stands in for a disabled metric. Records nothing and reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCollector;

impl<E: ?Sized> MetricCollector<E> for NoOpCollector {
    fn calculate_metric(&self, _entity: &E, _label_values: &[String]) -> Result<(), Error> {
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        Vec::new()
    }
}

pub(super) fn collect_family<M, C>(descriptor: &Descriptor, family: &Family<M, C>) -> Vec<MetricFamilySamples>
where
    M: crate::metrics::CollectSamples,
{
    let mut samples = Vec::new();
    family.collect_samples(descriptor.name(), &mut samples);
    vec![MetricFamilySamples::from_descriptor(descriptor, samples)]
}

/// A gauge set to a value read from the entity.
///
/// `value` returning `None` means the entity has nothing to report and no
/// sample is recorded.
pub struct GaugeCollector<E: ?Sized> {
    descriptor: Descriptor,
    family: Family<Gauge>,
    value: fn(&E) -> Option<f64>,
}

impl<E: ?Sized> GaugeCollector<E> {
    /// Create a gauge collector reading its value with `value`.
    pub fn new(spec: CollectorSpec, value: fn(&E) -> Option<f64>) -> Self {
        GaugeCollector {
            descriptor: spec.descriptor,
            family: Family::new(spec.label_names),
            value,
        }
    }
}

impl<E: ?Sized> fmt::Debug for GaugeCollector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeCollector")
            .field("descriptor", &self.descriptor)
            .field("label_names", &self.family.label_names())
            .finish()
    }
}

impl<E: ?Sized> MetricCollector<E> for GaugeCollector<E> {
    fn calculate_metric(&self, entity: &E, label_values: &[String]) -> Result<(), Error> {
        self.family.check_arity(label_values)?;
        if let Some(value) = (self.value)(entity) {
            self.family.get_or_create(label_values)?.set(value);
        }
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        collect_family(&self.descriptor, &self.family)
    }
}

/// A build counter incremented once per build whose result satisfies the
/// predicate.
///
/// The label set is created on every call, so label sets that have only seen
/// non-matching builds report zero.
pub struct CounterCollector {
    descriptor: Descriptor,
    family: Family<Counter>,
    predicate: fn(Option<BuildResult>) -> bool,
}

impl CounterCollector {
    /// Create a counter collector.
    pub fn new(spec: CollectorSpec, predicate: fn(Option<BuildResult>) -> bool) -> Self {
        CounterCollector {
            descriptor: spec.descriptor,
            family: Family::new(spec.label_names),
            predicate,
        }
    }
}

impl fmt::Debug for CounterCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterCollector")
            .field("descriptor", &self.descriptor)
            .field("label_names", &self.family.label_names())
            .finish()
    }
}

impl MetricCollector<dyn Run> for CounterCollector {
    fn calculate_metric(&self, run: &dyn Run, label_values: &[String]) -> Result<(), Error> {
        let counter = self.family.get_or_create(label_values)?;
        if (self.predicate)(run.result()) {
            counter.inc();
        }
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        collect_family(&self.descriptor, &self.family)
    }
}

/// Builds summaries tracking the configured quantiles.
#[derive(Debug, Clone)]
pub(crate) struct QuantileConstructor {
    quantiles: Arc<[f64]>,
}

impl QuantileConstructor {
    pub(crate) fn new(quantiles: Arc<[f64]>) -> Self {
        QuantileConstructor { quantiles }
    }
}

impl MetricConstructor<Summary> for QuantileConstructor {
    fn new_metric(&self) -> Summary {
        // Quantiles were validated together with the configuration.
        Summary::with_quantiles(&self.quantiles, DEFAULT_TARGET_ERROR).unwrap_or_default()
    }
}

/// A summary observing a value read from the entity.
pub struct SummaryCollector<E: ?Sized> {
    descriptor: Descriptor,
    family: Family<Summary, QuantileConstructor>,
    value: fn(&E) -> Option<f64>,
}

impl<E: ?Sized> SummaryCollector<E> {
    /// Create a summary collector observing `value`.
    pub fn new(spec: CollectorSpec, value: fn(&E) -> Option<f64>) -> Self {
        SummaryCollector {
            descriptor: spec.descriptor,
            family: Family::new_with_constructor(
                spec.label_names,
                QuantileConstructor::new(spec.quantiles),
            ),
            value,
        }
    }
}

impl<E: ?Sized> fmt::Debug for SummaryCollector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryCollector")
            .field("descriptor", &self.descriptor)
            .field("label_names", &self.family.label_names())
            .finish()
    }
}

impl<E: ?Sized> MetricCollector<E> for SummaryCollector<E> {
    fn calculate_metric(&self, entity: &E, label_values: &[String]) -> Result<(), Error> {
        self.family.check_arity(label_values)?;
        if let Some(value) = (self.value)(entity) {
            self.family.get_or_create(label_values)?.observe(value);
        }
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        collect_family(&self.descriptor, &self.family)
    }
}
