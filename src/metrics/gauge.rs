//! Module implementing an Open Metrics gauge.
//!
//! See [`Gauge`] for details.

use super::{CollectSamples, MetricType, TypedMetric};
use crate::collector::Sample;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Open Metrics [`Gauge`] to record current measurements.
///
/// Single increasing, decreasing or constant value metric.
///
/// [`Gauge`] is generic over the actual data type tracking the [`Gauge`] state
/// as well as the data type used to interact with the [`Gauge`]. Every value
/// read from a build host is exported as a float, so the default is an
/// [`AtomicU64`] storing the bits of an [`f64`].
///
/// ```
/// # use build_exporter::metrics::gauge::Gauge;
/// let gauge: Gauge = Gauge::default();
/// gauge.set(42.0);
/// assert_eq!(42.0, gauge.get());
/// ```
#[derive(Debug)]
pub struct Gauge<N = f64, A = AtomicU64> {
    value: Arc<A>,
    phantom: PhantomData<N>,
}

impl<N, A> Clone for Gauge<N, A> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N, A: Default> Default for Gauge<N, A> {
    fn default() -> Self {
        Self {
            value: Arc::new(A::default()),
            phantom: PhantomData,
        }
    }
}

impl<N, A: Atomic<N>> Gauge<N, A> {
    /// Sets the [`Gauge`] to `v`, returning the previous value.
    pub fn set(&self, v: N) -> N {
        self.value.set(v)
    }

    /// Get the current value of the [`Gauge`].
    pub fn get(&self) -> N {
        self.value.get()
    }
}

/// Atomic operations for a [`Gauge`] value store.
pub trait Atomic<N> {
    /// Set the value.
    fn set(&self, v: N) -> N;

    /// Get the value.
    fn get(&self) -> N;
}

impl Atomic<f64> for AtomicU64 {
    fn set(&self, v: f64) -> f64 {
        f64::from_bits(self.swap(f64::to_bits(v), Ordering::Relaxed))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.load(Ordering::Relaxed))
    }
}

impl<N, A> TypedMetric for Gauge<N, A> {
    const TYPE: MetricType = MetricType::Gauge;
}

impl CollectSamples for Gauge<f64, AtomicU64> {
    fn collect_samples(&self, name: &str, labels: &[(String, String)], out: &mut Vec<Sample>) {
        out.push(Sample::new(name.to_string(), labels.to_vec(), self.get()));
    }
}
