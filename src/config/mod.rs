//! Exporter configuration.
//!
//! [`Config`] is the serde schema loaded from TOML. [`Settings`] is a
//! validated [`Config`] with its patterns compiled, and [`SharedConfig`] holds
//! the active [`Settings`] so a scrape can take one consistent snapshot while
//! the host swaps in a new configuration.

mod error;
mod metric_status;

pub use error::ConfigError;
pub use metric_status::{DisabledMetric, MetricStatusChecker};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_NAMESPACE;
use crate::metrics::summary::validate_quantiles;

/// Environment variable consulted when the configuration leaves the
/// namespace unset.
pub const NAMESPACE_ENV: &str = "PROMETHEUS_NAMESPACE";

/// Exporter configuration as written by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// First component of every metric name. Falls back to
    /// [`NAMESPACE_ENV`], then to `default`.
    pub namespace: Option<String>,
    /// Label name carrying the job's full name.
    pub job_attribute_name: String,
    /// Count and include SUCCESS builds.
    pub count_successful_builds: bool,
    /// Count and include UNSTABLE builds.
    pub count_unstable_builds: bool,
    /// Count and include FAILURE builds.
    pub count_failed_builds: bool,
    /// Count and include NOT_BUILT builds.
    pub count_not_built_builds: bool,
    /// Count and include ABORTED builds.
    pub count_aborted_builds: bool,
    /// Expose metrics for every retained build, not only the last one.
    pub per_build_metrics: bool,
    /// Add a `parameters` label with the build's parameters.
    pub append_param_label: bool,
    /// Add a `status` label with the build's result.
    pub append_status_label: bool,
    /// Build parameters surfaced as labels of their own.
    pub labeled_build_parameter_names: Vec<String>,
    /// Also collect jobs that cannot currently be built.
    pub process_disabled_jobs: bool,
    /// Collect disk usage metrics.
    pub collect_disk_usage: bool,
    /// Collect code coverage of every job's last build.
    pub collect_coverage: bool,
    /// Period of the background collection task.
    pub collecting_metrics_period_in_seconds: u64,
    /// Quantiles tracked by duration summaries. Empty tracks sum and count
    /// only.
    pub summary_quantiles: Vec<f64>,
    /// Suppression rules for metrics and jobs.
    pub disabled_metrics: Vec<DisabledMetric>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: None,
            job_attribute_name: "jenkins_job".to_string(),
            count_successful_builds: true,
            count_unstable_builds: true,
            count_failed_builds: true,
            count_not_built_builds: true,
            count_aborted_builds: true,
            per_build_metrics: false,
            append_param_label: false,
            append_status_label: false,
            labeled_build_parameter_names: Vec::new(),
            process_disabled_jobs: false,
            collect_disk_usage: true,
            collect_coverage: false,
            collecting_metrics_period_in_seconds: 120,
            summary_quantiles: Vec::new(),
            disabled_metrics: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Whether any build result is counted at all.
    pub fn counts_any_builds(&self) -> bool {
        self.count_successful_builds
            || self.count_unstable_builds
            || self.count_failed_builds
            || self.count_not_built_builds
            || self.count_aborted_builds
    }

    /// Configured build parameter label names, trimmed, blanks removed.
    pub fn parameter_label_names(&self) -> Vec<String> {
        self.labeled_build_parameter_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A validated [`Config`] with everything derived from it precomputed.
#[derive(Debug, Clone)]
pub struct Settings {
    config: Config,
    namespace: String,
    metric_status: MetricStatusChecker,
}

impl Settings {
    /// Validate `config`, resolve its namespace and compile its patterns.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        if config.collecting_metrics_period_in_seconds == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        validate_quantiles(&config.summary_quantiles)?;

        let metric_status = MetricStatusChecker::new(&config.disabled_metrics)?;
        let namespace = resolve_namespace(
            config.namespace.as_deref(),
            std::env::var(NAMESPACE_ENV).ok().as_deref(),
        );

        Ok(Settings {
            config,
            namespace,
            metric_status,
        })
    }

    /// The underlying configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Namespace every metric name starts with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The disabled-metric policy.
    pub fn metric_status(&self) -> &MetricStatusChecker {
        &self.metric_status
    }

    /// Period of the background collection task.
    pub fn collecting_period(&self) -> Duration {
        Duration::from_secs(self.config.collecting_metrics_period_in_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            config: Config::default(),
            namespace: resolve_namespace(None, std::env::var(NAMESPACE_ENV).ok().as_deref()),
            metric_status: MetricStatusChecker::default(),
        }
    }
}

fn resolve_namespace(configured: Option<&str>, env: Option<&str>) -> String {
    configured
        .or(env)
        .map(str::trim)
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string()
}

/// The active [`Settings`], swappable while scrapes are running.
///
/// Until settings are stored every reader sees [`Settings::default`], which
/// allows every metric and job.
#[derive(Debug, Default)]
pub struct SharedConfig {
    current: ArcSwapOption<Settings>,
}

impl SharedConfig {
    /// Start with the given settings active.
    pub fn new(settings: Settings) -> Self {
        SharedConfig {
            current: ArcSwapOption::from_pointee(settings),
        }
    }

    /// Snapshot of the active settings.
    pub fn load(&self) -> Arc<Settings> {
        self.current.load_full().unwrap_or_default()
    }

    /// Make `settings` the active settings for subsequent scrapes.
    pub fn store(&self, settings: Settings) {
        self.current.store(Some(Arc::new(settings)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!("jenkins_job", config.job_attribute_name);
        assert!(config.counts_any_builds());
        assert!(!config.per_build_metrics);
        assert!(!config.collect_coverage);
        assert_eq!(120, config.collecting_metrics_period_in_seconds);
    }

    #[test]
    fn parse_toml() {
        let config = Config::from_toml_str(
            r#"
            namespace = "ci"
            per_build_metrics = true
            collect_coverage = true
            labeled_build_parameter_names = [" BRANCH ", "", "TARGET"]

            [[disabled_metrics]]
            type = "regex"
            pattern = "ci_jenkins_disk.*"

            [[disabled_metrics]]
            type = "job_regex"
            pattern = "sandbox/.*"
            "#,
        )
        .unwrap();

        assert_eq!(Some("ci".to_string()), config.namespace);
        assert!(config.per_build_metrics);
        assert!(config.collect_coverage);
        assert_eq!(vec!["BRANCH", "TARGET"], config.parameter_label_names());
        assert_eq!(2, config.disabled_metrics.len());

        let settings = Settings::new(config).unwrap();
        assert_eq!("ci", settings.namespace());
        assert!(!settings.metric_status().is_enabled("ci_jenkins_disk_usage_bytes"));
        assert!(!settings.metric_status().is_job_enabled("sandbox/a"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("no_such_option = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_period_is_rejected() {
        let config = Config {
            collecting_metrics_period_in_seconds: 0,
            ..Config::default()
        };
        assert!(matches!(Settings::new(config), Err(ConfigError::InvalidPeriod)));
    }

    #[test]
    fn bad_quantile_is_rejected() {
        let config = Config {
            summary_quantiles: vec![0.5, 1.5],
            ..Config::default()
        };
        assert!(matches!(
            Settings::new(config),
            Err(ConfigError::InvalidQuantile { .. })
        ));
    }

    #[test]
    fn namespace_resolution_order() {
        assert_eq!("cfg", resolve_namespace(Some("cfg"), Some("env")));
        assert_eq!("env", resolve_namespace(None, Some("env")));
        assert_eq!("default", resolve_namespace(None, Some("  ")));
        assert_eq!("default", resolve_namespace(None, None));
    }

    #[test]
    fn shared_config_defaults_until_stored() {
        let shared = SharedConfig::default();
        assert!(shared.load().config().count_successful_builds);

        shared.store(
            Settings::new(Config {
                count_successful_builds: false,
                ..Config::default()
            })
            .unwrap(),
        );
        assert!(!shared.load().config().count_successful_builds);
    }
}
