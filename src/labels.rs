//! Label sets attached to job and build metrics.
//!
//! Label names and label values are derived from one ordered list of label
//! slots, so the two can never disagree on arity or order. The names are
//! needed before any job is looked at, to build collectors, and the values
//! once per job or build.

use crate::config::Config;
use crate::model::{Job, Run};

/// Value of the repository label when the job is not nested in a folder.
pub const REPOSITORY_NOT_AVAILABLE: &str = "NA";
/// Value of the status label while a build is running.
pub const STATUS_RUNNING: &str = "RUNNING";
/// Value used when a build has no result or lacks a surfaced parameter.
pub const UNDEFINED: &str = "UNDEFINED";

/// Label carrying the build number of per-build metrics.
pub const NUMBER_LABEL: &str = "number";
/// Label carrying the stage name of stage metrics.
pub const STAGE_LABEL: &str = "stage";

/// An ordered set of label names with their values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
    values: Vec<String>,
}

impl LabelSet {
    /// Start an empty builder.
    pub fn builder() -> LabelSetBuilder {
        LabelSetBuilder::default()
    }

    /// Label names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Label values in order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Split into names and values.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.names, self.values)
    }
}

/// Accumulates `(name, value)` pairs and materializes a [`LabelSet`].
#[derive(Debug, Default)]
pub struct LabelSetBuilder {
    pairs: Vec<(String, String)>,
}

impl LabelSetBuilder {
    /// Append a label in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Materialize names and values together.
    pub fn build(self) -> LabelSet {
        let (names, values) = self.pairs.into_iter().unzip();
        LabelSet { names, values }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    JobName,
    Repository,
    Buildable,
    Parameters,
    Status,
    Parameter(String),
}

/// Derives the label schemas of job and build metrics from configuration.
///
/// The base schema is `[job attribute, repo, buildable]`. The job schema
/// extends it with `parameters` and `status` when enabled, then one label
/// per configured build parameter.
#[derive(Debug, Clone)]
pub struct JobLabels {
    job_attribute_name: String,
    base: Vec<Slot>,
    extended: Vec<Slot>,
}

impl JobLabels {
    /// Derive the schemas from `config`.
    pub fn new(config: &Config) -> Self {
        let base = vec![Slot::JobName, Slot::Repository, Slot::Buildable];

        let mut extended = base.clone();
        if config.append_param_label {
            extended.push(Slot::Parameters);
        }
        if config.append_status_label {
            extended.push(Slot::Status);
        }
        extended.extend(config.parameter_label_names().into_iter().map(Slot::Parameter));

        JobLabels {
            job_attribute_name: config.job_attribute_name.clone(),
            base,
            extended,
        }
    }

    /// Names of the base schema.
    pub fn base_label_names(&self) -> Vec<String> {
        self.names(&self.base)
    }

    /// Values of the base schema for `job`.
    pub fn base_label_values(&self, job: &dyn Job) -> Vec<String> {
        self.base_labels(job).into_parts().1
    }

    /// Base labels of `job`.
    pub fn base_labels(&self, job: &dyn Job) -> LabelSet {
        self.labels(&self.base, job, None)
    }

    /// Names of the job schema.
    pub fn job_label_names(&self) -> Vec<String> {
        self.names(&self.extended)
    }

    /// Values of the job schema for `run` of `job`.
    pub fn job_label_values(&self, job: &dyn Job, run: &dyn Run) -> Vec<String> {
        self.job_labels(job, run).into_parts().1
    }

    /// Job labels of `run` of `job`.
    pub fn job_labels(&self, job: &dyn Job, run: &dyn Run) -> LabelSet {
        self.labels(&self.extended, job, Some(run))
    }

    fn names(&self, slots: &[Slot]) -> Vec<String> {
        slots.iter().map(|slot| self.name(slot).to_string()).collect()
    }

    fn name<'a>(&'a self, slot: &'a Slot) -> &'a str {
        match slot {
            Slot::JobName => &self.job_attribute_name,
            Slot::Repository => "repo",
            Slot::Buildable => "buildable",
            Slot::Parameters => "parameters",
            Slot::Status => "status",
            Slot::Parameter(name) => name,
        }
    }

    fn labels(&self, slots: &[Slot], job: &dyn Job, run: Option<&dyn Run>) -> LabelSet {
        let parameters = run.map(|run| run.parameters()).unwrap_or_default();

        let mut builder = LabelSet::builder();
        for slot in slots {
            let value = match slot {
                Slot::JobName => job.full_name().to_string(),
                Slot::Repository => repository(job.full_name()).to_string(),
                Slot::Buildable => job.is_buildable().to_string(),
                Slot::Parameters => parameters
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(";"),
                Slot::Status => status(run),
                Slot::Parameter(name) => parameters
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_else(|| UNDEFINED.to_string()),
            };
            builder.push(self.name(slot), value);
        }
        builder.build()
    }
}

/// The path segment between the first and second `/` of a job name.
pub fn repository(full_name: &str) -> &str {
    let mut parts = full_name.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(repository), Some(_)) => repository,
        _ => REPOSITORY_NOT_AVAILABLE,
    }
}

fn status(run: Option<&dyn Run>) -> String {
    match run {
        Some(run) if run.is_building() => STATUS_RUNNING.to_string(),
        Some(run) => run
            .result()
            .map(|result| result.as_str().to_string())
            .unwrap_or_else(|| UNDEFINED.to_string()),
        None => UNDEFINED.to_string(),
    }
}
