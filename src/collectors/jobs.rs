//! Job metrics, keyed by metric kind.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::base::GaugeCollector;
use super::{CollectorSpec, Constructor, MetricCollector};
use crate::catalog::MetricKind;
use crate::model::Job;

/// Constructor for a job metric, `None` if `kind` is not computed from jobs.
pub(crate) fn constructor(kind: MetricKind) -> Option<Constructor<dyn Job>> {
    let constructor: Constructor<dyn Job> = match kind {
        MetricKind::HealthScore => |spec| gauge(spec, health_score),
        MetricKind::AvailableBuildsCount => |spec| gauge(spec, available_builds),
        MetricKind::DiscardActive => |spec| gauge(spec, discard_active),
        MetricKind::RunningBuildDuration => |spec| gauge(spec, running_build_duration),
        MetricKind::JobLogUpdated => |spec| gauge(spec, log_updated),
        _ => return None,
    };

    Some(constructor)
}

/// Milliseconds since the epoch, zero if the clock is before it.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn gauge(
    spec: CollectorSpec,
    value: fn(&dyn Job) -> Option<f64>,
) -> Arc<dyn MetricCollector<dyn Job>> {
    Arc::new(GaugeCollector::<dyn Job>::new(spec, value))
}

fn health_score(job: &dyn Job) -> Option<f64> {
    Some(job.health_score() as f64)
}

fn available_builds(job: &dyn Job) -> Option<f64> {
    Some(job.build_count() as f64)
}

fn discard_active(job: &dyn Job) -> Option<f64> {
    Some(if job.has_build_discarder() { 1.0 } else { 0.0 })
}

fn running_build_duration(job: &dyn Job) -> Option<f64> {
    let last = job.last_build()?;
    if !last.is_building() {
        return None;
    }
    Some(now_millis().saturating_sub(last.start_time_millis()) as f64)
}

fn log_updated(job: &dyn Job) -> Option<f64> {
    job.log_updated_millis().map(|millis| millis as f64)
}
