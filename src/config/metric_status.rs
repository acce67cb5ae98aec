//! Disabled-metric and disabled-job policy.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One configured suppression rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisabledMetric {
    /// Disable the metric with exactly this name, ignoring case.
    Name {
        /// Fully qualified metric name.
        name: String,
    },
    /// Disable every metric whose full name matches the pattern.
    Regex {
        /// Pattern matched against the whole metric name.
        pattern: String,
    },
    /// Exclude every job whose full name matches the pattern.
    JobRegex {
        /// Pattern matched against the whole job name.
        pattern: String,
    },
}

#[derive(Debug, Clone)]
enum Rule {
    Name(String),
    Regex(Regex),
    JobRegex(Regex),
}

/// Compiled form of the configured [`DisabledMetric`] rules.
///
/// Every rule is consulted. A name is denied if any applicable rule matches
/// and allowed otherwise, so an empty checker allows everything.
#[derive(Debug, Clone, Default)]
pub struct MetricStatusChecker {
    rules: Vec<Rule>,
}

impl MetricStatusChecker {
    /// Compile the given rules. Patterns are anchored at both ends.
    pub fn new(entries: &[DisabledMetric]) -> Result<Self, ConfigError> {
        let rules = entries
            .iter()
            .map(|entry| match entry {
                DisabledMetric::Name { name } => Ok(Rule::Name(name.clone())),
                DisabledMetric::Regex { pattern } => compile(pattern).map(Rule::Regex),
                DisabledMetric::JobRegex { pattern } => compile(pattern).map(Rule::JobRegex),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetricStatusChecker { rules })
    }

    /// Whether the metric called `metric_name` may be exposed.
    pub fn is_enabled(&self, metric_name: &str) -> bool {
        !self.rules.iter().any(|rule| match rule {
            Rule::Name(name) => name.eq_ignore_ascii_case(metric_name),
            Rule::Regex(regex) => regex.is_match(metric_name),
            Rule::JobRegex(_) => false,
        })
    }

    /// Whether the job called `job_full_name` contributes samples.
    pub fn is_job_enabled(&self, job_full_name: &str) -> bool {
        !self.rules.iter().any(|rule| match rule {
            Rule::JobRegex(regex) => regex.is_match(job_full_name),
            Rule::Name(_) | Rule::Regex(_) => false,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}
