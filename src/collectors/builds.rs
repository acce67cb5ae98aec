//! Build metrics, keyed by metric kind.

use std::sync::Arc;

use super::base::{CounterCollector, GaugeCollector, SummaryCollector};
use super::stages::{StageResultOrdinalCollector, StageSummaryCollector};
use super::{CollectorSpec, Constructor, MetricCollector};
use crate::catalog::MetricKind;
use crate::model::{BuildResult, Run, TestCounts};

/// Constructor for a build metric, `None` if `kind` is not computed from
/// builds.
pub(crate) fn constructor(kind: MetricKind) -> Option<Constructor<dyn Run>> {
    let constructor: Constructor<dyn Run> = match kind {
        MetricKind::BuildResultOrdinal => |spec| gauge(spec, result_ordinal),
        MetricKind::BuildResult => |spec| gauge(spec, result_passed),
        MetricKind::BuildDuration => |spec| gauge(spec, finished_duration),
        MetricKind::BuildStartTime => |spec| gauge(spec, start_time),
        MetricKind::BuildWaiting => |spec| gauge(spec, waiting),
        MetricKind::BuildLogfileSize => |spec| gauge(spec, log_size),
        MetricKind::BuildTestsTotal => |spec| gauge(spec, |run| tests(run, |t| t.total)),
        MetricKind::BuildTestsFailing => |spec| gauge(spec, |run| tests(run, |t| t.failed)),
        MetricKind::BuildTestsSkipped => |spec| gauge(spec, |run| tests(run, |t| t.skipped)),
        MetricKind::BuildLikelyStuck => |spec| gauge(spec, likely_stuck),
        MetricKind::StageDurationSummary => |spec| Arc::new(StageSummaryCollector::new(spec)),
        MetricKind::StageResultOrdinal => {
            |spec| Arc::new(StageResultOrdinalCollector::new(spec))
        }
        MetricKind::BuildDurationSummary => {
            |spec| Arc::new(SummaryCollector::<dyn Run>::new(spec, finished_duration))
        }
        MetricKind::BuildSuccessfulCounter => {
            |spec| counter(spec, |result| result == Some(BuildResult::Success))
        }
        MetricKind::BuildFailedCounter => {
            |spec| counter(spec, |result| result == Some(BuildResult::Failure))
        }
        MetricKind::BuildUnstableCounter => {
            |spec| counter(spec, |result| result == Some(BuildResult::Unstable))
        }
        MetricKind::BuildAbortedCounter => {
            |spec| counter(spec, |result| result == Some(BuildResult::Aborted))
        }
        MetricKind::BuildTotalCounter => {
            |spec| counter(spec, |result| result != Some(BuildResult::NotBuilt))
        }
        _ => return None,
    };

    Some(constructor)
}

fn gauge(
    spec: CollectorSpec,
    value: fn(&dyn Run) -> Option<f64>,
) -> Arc<dyn MetricCollector<dyn Run>> {
    Arc::new(GaugeCollector::<dyn Run>::new(spec, value))
}

fn counter(
    spec: CollectorSpec,
    predicate: fn(Option<BuildResult>) -> bool,
) -> Arc<dyn MetricCollector<dyn Run>> {
    Arc::new(CounterCollector::new(spec, predicate))
}

fn result_ordinal(run: &dyn Run) -> Option<f64> {
    run.result().map(|result| f64::from(result.ordinal()))
}

fn result_passed(run: &dyn Run) -> Option<f64> {
    run.result().map(|result| match result {
        BuildResult::Success | BuildResult::Unstable => 1.0,
        _ => 0.0,
    })
}

fn finished_duration(run: &dyn Run) -> Option<f64> {
    (!run.is_building()).then(|| run.duration_millis() as f64)
}

fn start_time(run: &dyn Run) -> Option<f64> {
    Some(run.start_time_millis() as f64)
}

fn waiting(run: &dyn Run) -> Option<f64> {
    if run.is_building() {
        return None;
    }
    run.queued_duration_millis().map(|millis| millis as f64)
}

fn log_size(run: &dyn Run) -> Option<f64> {
    if run.is_building() {
        return None;
    }
    run.log_size_bytes().map(|bytes| bytes as f64)
}

fn tests(run: &dyn Run, count: fn(&TestCounts) -> u64) -> Option<f64> {
    run.test_counts().map(|counts| count(&counts) as f64)
}

fn likely_stuck(run: &dyn Run) -> Option<f64> {
    if !run.is_building() {
        return None;
    }
    run.likely_stuck().map(|stuck| if stuck { 1.0 } else { 0.0 })
}
