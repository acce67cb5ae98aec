//! Module implementing an Open Metrics summary.
//!
//! See [`Summary`] for details.

use super::{CollectSamples, MetricType, TypedMetric};
use crate::collector::Sample;
use crate::config::ConfigError;
use parking_lot::RwLock;
use quantiles::ckms::CKMS;
use std::sync::Arc;

/// Error bound used for the quantile stream when none is given.
pub const DEFAULT_TARGET_ERROR: f64 = 0.01;

/// Open Metrics [`Summary`] to measure distributions of discrete events.
///
/// Always tracks sum and count. Quantiles are only tracked when the summary
/// was built with [`Summary::with_quantiles`]. Collectors rebuild their
/// summaries every scrape, so the stream covers every observation made during
/// one scrape and never needs rotating.
#[derive(Debug, Clone)]
pub struct Summary {
    target_quantiles: Arc<[f64]>,
    inner: Arc<RwLock<InnerSummary>>,
}

#[derive(Debug)]
struct InnerSummary {
    sum: f64,
    count: u64,
    stream: Option<CKMS<f64>>,
}

impl Default for Summary {
    fn default() -> Self {
        Summary {
            target_quantiles: Arc::from(Vec::new()),
            inner: Arc::new(RwLock::new(InnerSummary {
                sum: 0.0,
                count: 0,
                stream: None,
            })),
        }
    }
}

impl Summary {
    /// Create a new [`Summary`] tracking the given quantiles.
    ///
    /// Fails if any quantile lies outside `[0, 1]`.
    pub fn with_quantiles(target_quantiles: &[f64], target_error: f64) -> Result<Self, ConfigError> {
        validate_quantiles(target_quantiles)?;

        let stream = (!target_quantiles.is_empty()).then(|| CKMS::new(target_error));

        Ok(Summary {
            target_quantiles: Arc::from(target_quantiles.to_vec()),
            inner: Arc::new(RwLock::new(InnerSummary {
                sum: 0.0,
                count: 0,
                stream,
            })),
        })
    }

    /// Observe the given value.
    pub fn observe(&self, v: f64) {
        let mut inner = self.inner.write();
        inner.sum += v;
        inner.count += 1;

        if let Some(stream) = inner.stream.as_mut() {
            stream.insert(v);
        }
    }

    /// Retrieve the sum, count and quantile values of the summary.
    pub fn get(&self) -> (f64, u64, Vec<(f64, f64)>) {
        let inner = self.inner.read();
        let mut quantile_values: Vec<(f64, f64)> = Vec::new();

        if let Some(stream) = inner.stream.as_ref() {
            for q in self.target_quantiles.iter() {
                if let Some((_, v)) = stream.query(*q) {
                    quantile_values.push((*q, v));
                }
            }
        }

        (inner.sum, inner.count, quantile_values)
    }
}

/// Check that every quantile lies within `[0, 1]`.
pub fn validate_quantiles(quantiles: &[f64]) -> Result<(), ConfigError> {
    match quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        Some(&value) => Err(ConfigError::InvalidQuantile { value }),
        None => Ok(()),
    }
}

impl TypedMetric for Summary {
    const TYPE: MetricType = MetricType::Summary;
}

impl CollectSamples for Summary {
    fn collect_samples(&self, name: &str, labels: &[(String, String)], out: &mut Vec<Sample>) {
        let (sum, count, quantiles) = self.get();

        out.push(Sample::new(format!("{name}_count"), labels.to_vec(), count as f64));
        out.push(Sample::new(format!("{name}_sum"), labels.to_vec(), sum));

        for (quantile, value) in quantiles {
            let mut labels = labels.to_vec();
            labels.push(("quantile".to_string(), dtoa::Buffer::new().format(quantile).to_string()));
            out.push(Sample::new(name.to_string(), labels, value));
        }
    }
}
