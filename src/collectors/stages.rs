//! Pipeline stage metrics.
//!
//! The label schema of a stage collector is the schema of the build it is fed
//! with, followed by the stage name. Callers pass the build's label values
//! only; the stage label is appended per stage.

use std::fmt;

use super::base::{collect_family, QuantileConstructor};
use super::{CollectorSpec, MetricCollector};
use crate::collector::MetricFamilySamples;
use crate::error::Error;
use crate::metrics::family::Family;
use crate::metrics::gauge::Gauge;
use crate::metrics::summary::Summary;
use crate::model::{Run, Stage};
use crate::registry::Descriptor;

/// Stages of a finished build, `None` while the build is running or when it
/// has no stage graph.
fn finished_stages(
    run: &dyn Run,
    label_values: &[String],
    label_names: &[String],
) -> Result<Option<Vec<Stage>>, Error> {
    if label_values.len() + 1 != label_names.len() {
        return Err(Error::LabelArity {
            expected: label_names.len().saturating_sub(1),
            actual: label_values.len(),
        });
    }
    if run.is_building() {
        return Ok(None);
    }
    Ok(run.stages())
}

fn with_stage(label_values: &[String], stage: &Stage) -> Vec<String> {
    let mut values = Vec::with_capacity(label_values.len() + 1);
    values.extend_from_slice(label_values);
    values.push(stage.name.clone());
    values
}

/// Summary of stage durations. Only stages that passed, possibly unstable,
/// are observed.
pub struct StageSummaryCollector {
    descriptor: Descriptor,
    family: Family<Summary, QuantileConstructor>,
}

impl StageSummaryCollector {
    /// Create a stage summary. `spec.label_names` must end with the stage
    /// label.
    pub fn new(spec: CollectorSpec) -> Self {
        StageSummaryCollector {
            descriptor: spec.descriptor,
            family: Family::new_with_constructor(
                spec.label_names,
                QuantileConstructor::new(spec.quantiles),
            ),
        }
    }
}

impl fmt::Debug for StageSummaryCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSummaryCollector")
            .field("descriptor", &self.descriptor)
            .field("label_names", &self.family.label_names())
            .finish()
    }
}

impl MetricCollector<dyn Run> for StageSummaryCollector {
    fn calculate_metric(&self, run: &dyn Run, label_values: &[String]) -> Result<(), Error> {
        let Some(stages) = finished_stages(run, label_values, self.family.label_names())? else {
            return Ok(());
        };

        for stage in stages
            .iter()
            .filter(|stage| stage.status.counts_towards_duration())
        {
            self.family
                .get_or_create(&with_stage(label_values, stage))?
                .observe(stage.duration_millis as f64);
        }
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        collect_family(&self.descriptor, &self.family)
    }
}

/// Status ordinal of every stage of a finished build.
pub struct StageResultOrdinalCollector {
    descriptor: Descriptor,
    family: Family<Gauge>,
}

impl StageResultOrdinalCollector {
    /// Create a stage status gauge. `spec.label_names` must end with the
    /// stage label.
    pub fn new(spec: CollectorSpec) -> Self {
        StageResultOrdinalCollector {
            descriptor: spec.descriptor,
            family: Family::new(spec.label_names),
        }
    }
}

impl fmt::Debug for StageResultOrdinalCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageResultOrdinalCollector")
            .field("descriptor", &self.descriptor)
            .field("label_names", &self.family.label_names())
            .finish()
    }
}

impl MetricCollector<dyn Run> for StageResultOrdinalCollector {
    fn calculate_metric(&self, run: &dyn Run, label_values: &[String]) -> Result<(), Error> {
        let Some(stages) = finished_stages(run, label_values, self.family.label_names())? else {
            return Ok(());
        };

        for stage in &stages {
            self.family
                .get_or_create(&with_stage(label_values, stage))?
                .set(f64::from(stage.status.ordinal()));
        }
        Ok(())
    }

    fn collect(&self) -> Vec<MetricFamilySamples> {
        collect_family(&self.descriptor, &self.family)
    }
}
