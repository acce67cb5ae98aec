//! Metric registry implementation.
//!
//! See [`Registry`] for details.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::catalog::MetricKind;
use crate::collector::{Collector, MetricFamilySamples};
use crate::config::SharedConfig;
use crate::metrics::MetricType;

/// A registry of [`Collector`]s.
///
/// On every scrape the [`Registry`] asks each collector, in registration
/// order, for its metric families and concatenates them. Families without
/// samples are dropped, as are families whose name the active
/// disabled-metric policy rejects.
///
/// ```
/// # use build_exporter::collector::{Collector, MetricFamilySamples, Sample};
/// # use build_exporter::metrics::MetricType;
/// # use build_exporter::registry::Registry;
/// #
/// #[derive(Debug)]
/// struct Constant;
///
/// impl Collector for Constant {
///     fn collect(&self) -> Vec<MetricFamilySamples> {
///         vec![
///             MetricFamilySamples::new("answer", "The answer", MetricType::Gauge,
///                 vec![Sample::new("answer".to_string(), vec![], 42.0)]),
///             MetricFamilySamples::new("nothing", "Never observed", MetricType::Gauge, vec![]),
///         ]
///     }
/// }
///
/// let mut registry = Registry::default();
/// registry.register_collector(Box::new(Constant));
///
/// let families = registry.collect();
/// assert_eq!(1, families.len());
/// assert_eq!("answer", families[0].name());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    config: Option<Arc<SharedConfig>>,
    collectors: Vec<Box<dyn Collector>>,
}

impl Registry {
    /// Creates a new [`Registry`] filtering its output through the
    /// disabled-metric policy of `config`.
    pub fn with_config(config: Arc<SharedConfig>) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    /// Registers a [`Collector`] that is asked for samples on every scrape.
    pub fn register_collector(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Collect every registered collector once.
    pub fn collect(&self) -> Vec<MetricFamilySamples> {
        let settings = self.config.as_ref().map(|config| config.load());

        let mut families = Vec::new();
        for collector in &self.collectors {
            for family in collector.collect() {
                if family.is_empty() {
                    trace!(metric = family.name(), "dropping family without samples");
                    continue;
                }
                if let Some(settings) = &settings {
                    if !settings.metric_status().is_enabled(family.name()) {
                        debug!(metric = family.name(), "metric disabled by configuration");
                        continue;
                    }
                }
                families.push(family);
            }
        }
        families
    }
}

/// Metric descriptor: exposed name, help text, type and unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    name: String,
    help: String,
    metric_type: MetricType,
    unit: Option<Unit>,
}

impl Descriptor {
    /// Create new [`Descriptor`].
    ///
    /// A full stop is appended to the help text.
    pub fn new<N: Into<String>, H: Into<String>>(
        name: N,
        help: H,
        metric_type: MetricType,
        unit: Option<Unit>,
    ) -> Self {
        Descriptor {
            name: name.into(),
            help: help.into() + ".",
            metric_type,
            unit,
        }
    }

    /// Describe `kind` as exposed under `namespace`, optionally inserting a
    /// name prefix such as `last`.
    pub fn for_kind(kind: MetricKind, namespace: &str, prefix: Option<&str>) -> Self {
        Descriptor::new(
            kind.exposed_name(namespace, prefix),
            kind.help(),
            kind.metric_type(),
            kind.unit(),
        )
    }

    /// Returns the name of the metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text of the metric.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Returns the type of the metric.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Returns the unit of the metric.
    pub fn unit(&self) -> &Option<Unit> {
        &self.unit
    }
}

/// Units of the values this crate exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Unit {
    Bytes,
    Milliseconds,
}

impl Unit {
    /// Returns the given Unit's str representation.
    pub fn as_str(&self) -> &str {
        match self {
            Unit::Bytes => "bytes",
            Unit::Milliseconds => "milliseconds",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Sample;
    use crate::config::{Config, DisabledMetric, Settings};

    #[derive(Debug)]
    struct Fixed(Vec<MetricFamilySamples>);

    impl Collector for Fixed {
        fn collect(&self) -> Vec<MetricFamilySamples> {
            self.0.clone()
        }
    }

    fn gauge(name: &str) -> MetricFamilySamples {
        MetricFamilySamples::new(
            name,
            "help",
            MetricType::Gauge,
            vec![Sample::new(name.to_string(), vec![], 1.0)],
        )
    }

    #[test]
    fn descriptor_for_kind() {
        let descriptor = Descriptor::for_kind(MetricKind::BuildDuration, "ci", Some("last"));
        assert_eq!("ci_jenkins_builds_last_build_duration_milliseconds", descriptor.name());
        assert_eq!("Build times in milliseconds of last build.", descriptor.help());
        assert_eq!(MetricType::Gauge, descriptor.metric_type());
        assert_eq!(&Some(Unit::Milliseconds), descriptor.unit());
    }

    #[test]
    fn collects_in_registration_order() {
        let mut registry = Registry::default();
        registry.register_collector(Box::new(Fixed(vec![gauge("b")])));
        registry.register_collector(Box::new(Fixed(vec![gauge("a"), gauge("c")])));

        let names: Vec<_> = registry
            .collect()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(vec!["b", "a", "c"], names);
    }

    #[test]
    fn drops_disabled_families() {
        let config = Config {
            disabled_metrics: vec![DisabledMetric::Regex {
                pattern: "default_jenkins_builds_.*".to_string(),
            }],
            ..Config::default()
        };
        let shared = Arc::new(SharedConfig::new(Settings::new(config).unwrap()));

        let mut registry = Registry::with_config(shared);
        registry.register_collector(Box::new(Fixed(vec![
            gauge("default_jenkins_builds_health_score"),
            gauge("default_jenkins_up"),
        ])));

        let names: Vec<_> = registry
            .collect()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(vec!["default_jenkins_up"], names);
    }
}
