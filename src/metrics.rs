//! Metric type implementations.

pub mod counter;
pub mod family;
pub mod gauge;
pub mod summary;

use crate::collector::Sample;

/// A metric that is aware of its Open Metrics metric type.
pub trait TypedMetric {
    /// The OpenMetrics metric type.
    const TYPE: MetricType = MetricType::Unknown;
}

/// A metric that can render its current state as exposition samples.
pub trait CollectSamples: TypedMetric {
    /// Append the samples of this metric, labelled with `labels`, to `out`.
    ///
    /// `name` is the family name. Suffixes such as `_total` or `_count` are
    /// added by the implementation.
    fn collect_samples(&self, name: &str, labels: &[(String, String)], out: &mut Vec<Sample>);
}

/// OpenMetrics metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MetricType {
    Counter,
    Gauge,
    Summary,
    Unknown,
}

impl MetricType {
    /// Returns the given metric type's str representation.
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Unknown => "unknown",
        }
    }
}
