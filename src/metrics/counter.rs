//! Module implementing an Open Metrics counter.
//!
//! See [`Counter`] for details.

use super::{CollectSamples, MetricType, TypedMetric};
use crate::collector::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Open Metrics [`Counter`] to measure discrete events.
///
/// Single monotonically increasing value metric. Clones share the same
/// underlying value, which is what lets a cached collector keep counting
/// across scrapes.
///
/// [`Counter`] is generic over the actual data type tracking the counter state.
/// Out of convenience the generic type parameter is set to use an [`AtomicU64`]
/// by default.
///
/// ```
/// # use build_exporter::metrics::counter::Counter;
/// let counter: Counter = Counter::default();
/// counter.inc();
/// assert_eq!(1, counter.get());
/// ```
#[derive(Debug)]
pub struct Counter<A = AtomicU64> {
    value: Arc<A>,
}

impl<A> Clone for Counter<A> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<A: Default> Default for Counter<A> {
    fn default() -> Self {
        Counter {
            value: Arc::new(A::default()),
        }
    }
}

impl<A: Atomic> Counter<A> {
    /// Increase the [`Counter`] by 1, returning the previous value.
    pub fn inc(&self) -> A::Number {
        self.value.inc()
    }

    /// Increase the [`Counter`] by `v`, returning the previous value.
    pub fn inc_by(&self, v: A::Number) -> A::Number {
        self.value.inc_by(v)
    }

    /// Get the current value of the [`Counter`].
    pub fn get(&self) -> A::Number {
        self.value.get()
    }
}

/// Atomic operations for a [`Counter`] value store.
pub trait Atomic {
    /// The number type exposed on the interface.
    type Number;

    /// Increase the value by `1`.
    fn inc(&self) -> Self::Number;

    /// Increase the value.
    fn inc_by(&self, v: Self::Number) -> Self::Number;

    /// Get the value.
    fn get(&self) -> Self::Number;
}

impl Atomic for AtomicU64 {
    type Number = u64;

    fn inc(&self) -> Self::Number {
        self.inc_by(1)
    }

    fn inc_by(&self, v: Self::Number) -> Self::Number {
        self.fetch_add(v, Ordering::Relaxed)
    }

    fn get(&self) -> Self::Number {
        self.load(Ordering::Relaxed)
    }
}

impl<A> TypedMetric for Counter<A> {
    const TYPE: MetricType = MetricType::Counter;
}

impl CollectSamples for Counter<AtomicU64> {
    fn collect_samples(&self, name: &str, labels: &[(String, String)], out: &mut Vec<Sample>) {
        out.push(Sample::new(
            format!("{name}_total"),
            labels.to_vec(),
            self.get() as f64,
        ));
    }
}
