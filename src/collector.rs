//! Metric collector implementation.
//!
//! See [`Collector`] for details.

use crate::metrics::MetricType;
use crate::registry::{Descriptor, Unit};

/// The [`Collector`] abstraction provides metrics and their description on
/// each scrape.
///
/// Every collector in this crate reads live state from the build host when
/// [`Collector::collect`] is called, instead of being updated as events happen.
///
/// Register a [`Collector`] with a [`Registry`](crate::registry::Registry) via
/// [`Registry::register_collector`](crate::registry::Registry::register_collector).
///
/// ```
/// # use build_exporter::collector::{Collector, MetricFamilySamples, Sample};
/// # use build_exporter::metrics::MetricType;
/// #
/// #[derive(Debug)]
/// struct MyCollector {}
///
/// impl Collector for MyCollector {
///     fn collect(&self) -> Vec<MetricFamilySamples> {
///         vec![MetricFamilySamples::new(
///             "my_gauge",
///             "some help",
///             MetricType::Gauge,
///             vec![Sample::new("my_gauge".to_string(), vec![], 42.0)],
///         )]
///     }
/// }
/// ```
pub trait Collector: std::fmt::Debug + Send + Sync + 'static {
    /// Once the [`Collector`] is registered, this method is called on each scrape.
    fn collect(&self) -> Vec<MetricFamilySamples>;
}

/// A single exposed time series value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    labels: Vec<(String, String)>,
    value: f64,
}

impl Sample {
    /// Create a new [`Sample`].
    pub fn new(name: String, labels: Vec<(String, String)>, value: f64) -> Self {
        Sample {
            name,
            labels,
            value,
        }
    }

    /// Sample name, including type suffixes such as `_total`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label name and value pairs in schema order.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Label names in schema order.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(name, _)| name.as_str())
    }

    /// Label values in schema order.
    pub fn label_values(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(_, value)| value.as_str())
    }

    /// Value of the label called `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The sampled value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// All samples of one metric family together with its description.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamilySamples {
    name: String,
    help: String,
    metric_type: MetricType,
    unit: Option<Unit>,
    samples: Vec<Sample>,
}

impl MetricFamilySamples {
    /// Create a new [`MetricFamilySamples`].
    pub fn new<N: Into<String>, H: Into<String>>(
        name: N,
        help: H,
        metric_type: MetricType,
        samples: Vec<Sample>,
    ) -> Self {
        MetricFamilySamples {
            name: name.into(),
            help: help.into(),
            metric_type,
            unit: None,
            samples,
        }
    }

    pub(crate) fn from_descriptor(descriptor: &Descriptor, samples: Vec<Sample>) -> Self {
        MetricFamilySamples {
            name: descriptor.name().to_string(),
            help: descriptor.help().to_string(),
            metric_type: descriptor.metric_type(),
            unit: descriptor.unit().clone(),
            samples,
        }
    }

    /// Fully qualified family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Metric type of the family.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Unit of the family, if known.
    pub fn unit(&self) -> &Option<Unit> {
        &self.unit
    }

    /// The samples of this family.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Whether the family has no samples and should not be exposed.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
