//! Build counters that outlive a single scrape.
//!
//! See [`CounterCache`] for details.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{CollectorFactory, RunCollector};
use crate::catalog::MetricKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    kind: MetricKind,
    label_names: Vec<String>,
    prefix: Option<String>,
    namespace: String,
}

/// Hands out the same counter collector for the same metric identity.
///
/// Counters accumulate across scrapes, so unlike every other collector they
/// must not be created afresh each time. The identity is the metric kind,
/// the label schema, the name prefix and the namespace. A change to any of
/// them, e.g. a new namespace in the configuration, starts a new counter from
/// zero.
///
/// A disabled kind always yields the factory's no-op collector, even when a
/// counter for it is already cached. The cached counter is kept, so
/// re-enabling the kind resumes from its previous count. Completions seen
/// while it was disabled are not counted.
///
/// ```
/// # use std::sync::Arc;
/// # use build_exporter::catalog::MetricKind;
/// # use build_exporter::collectors::{CollectorFactory, CounterCache};
/// # use build_exporter::config::Settings;
/// let cache = CounterCache::default();
/// let factory = CollectorFactory::new(&Settings::default());
/// let labels = vec!["jenkins_job".to_string()];
///
/// let first = cache.get(&factory, MetricKind::BuildTotalCounter, labels.clone(), None);
/// let second = cache.get(&factory, MetricKind::BuildTotalCounter, labels, None);
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Default)]
pub struct CounterCache {
    counters: Mutex<HashMap<CounterKey, RunCollector>>,
}

impl std::fmt::Debug for CounterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterCache").finish_non_exhaustive()
    }
}

impl CounterCache {
    /// The counter for the given identity, created through `factory` on
    /// first use.
    pub fn get(
        &self,
        factory: &CollectorFactory,
        kind: MetricKind,
        label_names: Vec<String>,
        prefix: Option<&str>,
    ) -> RunCollector {
        if !factory.is_enabled(kind) {
            return factory.create_run_collector(kind, label_names, prefix);
        }

        let key = CounterKey {
            kind,
            label_names,
            prefix: prefix.map(str::to_string),
            namespace: factory.namespace().to_string(),
        };

        let mut counters = self.counters.lock();
        if let Some(counter) = counters.get(&key) {
            debug!(metric = kind.name(), "counter cache hit");
            return counter.clone();
        }

        debug!(metric = kind.name(), "counter cache miss");
        let counter = factory.create_run_collector(kind, key.label_names.clone(), prefix);
        counters.insert(key, counter.clone());
        counter
    }

    /// Number of cached counters.
    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    /// Whether no counter has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DisabledMetric, Settings};
    use std::sync::Arc;

    fn factory(namespace: &str, disabled: Vec<DisabledMetric>) -> CollectorFactory {
        CollectorFactory::new(
            &Settings::new(Config {
                namespace: Some(namespace.to_string()),
                disabled_metrics: disabled,
                ..Config::default()
            })
            .unwrap(),
        )
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn identity_includes_every_component() {
        let cache = CounterCache::default();
        let ci = factory("ci", vec![]);
        let other = factory("other", vec![]);
        let kind = MetricKind::BuildFailedCounter;

        let base = cache.get(&ci, kind, names(&["job"]), None);
        assert!(Arc::ptr_eq(&base, &cache.get(&ci, kind, names(&["job"]), None)));

        assert!(!Arc::ptr_eq(&base, &cache.get(&other, kind, names(&["job"]), None)));
        assert!(!Arc::ptr_eq(&base, &cache.get(&ci, kind, names(&["job", "repo"]), None)));
        assert!(!Arc::ptr_eq(&base, &cache.get(&ci, kind, names(&["job"]), Some("x"))));
        assert!(!Arc::ptr_eq(
            &base,
            &cache.get(&ci, MetricKind::BuildTotalCounter, names(&["job"]), None)
        ));
        assert_eq!(5, cache.len());
    }

    #[test]
    fn disabled_counters_are_not_cached() {
        let cache = CounterCache::default();
        let disabled = factory(
            "ci",
            vec![DisabledMetric::Name {
                name: "ci_jenkins_failed_build_count".to_string(),
            }],
        );

        cache.get(&disabled, MetricKind::BuildFailedCounter, names(&["job"]), None);
        assert!(cache.is_empty());

        cache.get(&factory("ci", vec![]), MetricKind::BuildFailedCounter, names(&["job"]), None);
        assert_eq!(1, cache.len());
    }

    #[test]
    fn disabling_a_cached_counter_hides_it() {
        let cache = CounterCache::default();
        let enabled = factory("ci", vec![]);
        let disabled = factory(
            "ci",
            vec![DisabledMetric::Name {
                name: "CI_JENKINS_FAILED_BUILD_COUNT".to_string(),
            }],
        );
        let kind = MetricKind::BuildFailedCounter;

        let cached = cache.get(&enabled, kind, names(&["job"]), None);
        let hidden = cache.get(&disabled, kind, names(&["job"]), None);
        assert!(!Arc::ptr_eq(&cached, &hidden));
        assert!(hidden.collect().is_empty());
        assert_eq!(1, cache.len());

        let resumed = cache.get(&enabled, kind, names(&["job"]), None);
        assert!(Arc::ptr_eq(&cached, &resumed));
    }
}
