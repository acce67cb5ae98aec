//! Module implementing an Open Metrics metric family.
//!
//! See [`Family`] for details.

use super::{CollectSamples, MetricType, TypedMetric};
use crate::collector::Sample;
use crate::error::Error;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Representation of the OpenMetrics *MetricFamily* data type.
///
/// A [`Family`] is a set of metrics with the same name, help text and
/// type, differentiated by their label values thus spanning a multidimensional
/// space.
///
/// The label schema is fixed at construction. Every lookup has to supply
/// exactly one value per label name, in schema order, otherwise
/// [`Family::get_or_create`] fails with [`Error::LabelArity`].
///
/// ```
/// # use build_exporter::metrics::counter::Counter;
/// # use build_exporter::metrics::family::Family;
/// let family = Family::<Counter>::new(vec!["method".to_string()]);
///
/// // Record a single HTTP GET request.
/// family.get_or_create(&["GET".to_string()]).unwrap().inc();
///
/// // A value array of the wrong length is rejected.
/// assert!(family.get_or_create(&[]).is_err());
/// ```
#[derive(Debug)]
pub struct Family<M, C = fn() -> M> {
    label_names: Arc<[String]>,
    metrics: Arc<RwLock<BTreeMap<Vec<String>, M>>>,
    /// Function that when called constructs a new metric.
    ///
    /// For most metric types this would simply be its [`Default`]
    /// implementation set through [`Family::new`]. For metric types that
    /// need custom construction logic like
    /// [`Summary`](crate::metrics::summary::Summary) in order to set
    /// specific quantiles, a custom constructor is set via
    /// [`Family::new_with_constructor`].
    constructor: C,
}

/// A constructor for creating new metrics in a [`Family`] when calling
/// [`Family::get_or_create`]. Such constructor is provided via
/// [`Family::new_with_constructor`].
///
/// ```
/// # use build_exporter::metrics::family::{Family, MetricConstructor};
/// # use build_exporter::metrics::summary::Summary;
/// struct QuantileBuilder {
///     quantiles: Vec<f64>,
/// }
///
/// impl MetricConstructor<Summary> for QuantileBuilder {
///     fn new_metric(&self) -> Summary {
///         Summary::with_quantiles(&self.quantiles, 0.01).unwrap_or_default()
///     }
/// }
///
/// let builder = QuantileBuilder { quantiles: vec![0.5, 0.9] };
/// let family = Family::<Summary, QuantileBuilder>::new_with_constructor(vec![], builder);
/// ```
pub trait MetricConstructor<M> {
    /// Construct a fresh metric for a label set seen for the first time.
    fn new_metric(&self) -> M;
}

impl<M, F: Fn() -> M> MetricConstructor<M> for F {
    fn new_metric(&self) -> M {
        self()
    }
}

impl<M: Default> Family<M> {
    /// Create a family over the given label names using [`Default`] to
    /// construct new metrics.
    pub fn new(label_names: Vec<String>) -> Self {
        Self::new_with_constructor(label_names, M::default)
    }
}

impl<M, C> Family<M, C> {
    /// Create a metric family using a custom constructor to construct new
    /// metrics.
    pub fn new_with_constructor(label_names: Vec<String>, constructor: C) -> Self {
        Self {
            label_names: Arc::from(label_names),
            metrics: Arc::new(RwLock::new(BTreeMap::new())),
            constructor,
        }
    }

    /// The label schema of this family.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Number of distinct label sets observed so far.
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    /// Whether no label set has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    pub(crate) fn check_arity(&self, label_values: &[String]) -> Result<(), Error> {
        if label_values.len() != self.label_names.len() {
            return Err(Error::LabelArity {
                expected: self.label_names.len(),
                actual: label_values.len(),
            });
        }
        Ok(())
    }
}

impl<M, C: MetricConstructor<M>> Family<M, C> {
    /// Access a metric with the given label values, creating it if one does
    /// not yet exist.
    pub fn get_or_create(
        &self,
        label_values: &[String],
    ) -> Result<MappedRwLockReadGuard<'_, M>, Error> {
        self.check_arity(label_values)?;

        if let Ok(metric) =
            RwLockReadGuard::try_map(self.metrics.read(), |metrics| metrics.get(label_values))
        {
            return Ok(metric);
        }

        let mut write_guard = self.metrics.write();
        write_guard
            .entry(label_values.to_vec())
            .or_insert_with(|| self.constructor.new_metric());

        let read_guard = RwLockWriteGuard::downgrade(write_guard);
        Ok(RwLockReadGuard::map(read_guard, |metrics| {
            metrics
                .get(label_values)
                .expect("Metric to exist after creating it.")
        }))
    }
}

impl<M: CollectSamples, C> Family<M, C> {
    /// Append the samples of every label set, in label value order.
    pub fn collect_samples(&self, name: &str, out: &mut Vec<Sample>) {
        for (label_values, metric) in self.metrics.read().iter() {
            let labels: Vec<(String, String)> = self
                .label_names
                .iter()
                .cloned()
                .zip(label_values.iter().cloned())
                .collect();
            metric.collect_samples(name, &labels, out);
        }
    }
}

impl<M, C: Clone> Clone for Family<M, C> {
    fn clone(&self) -> Self {
        Family {
            label_names: self.label_names.clone(),
            metrics: self.metrics.clone(),
            constructor: self.constructor.clone(),
        }
    }
}

impl<M: TypedMetric, C> TypedMetric for Family<M, C> {
    const TYPE: MetricType = <M as TypedMetric>::TYPE;
}
