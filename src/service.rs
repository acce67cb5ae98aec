//! Cached exposition, refreshed in the background.
//!
//! Scrapes walk every job of the host and can take a while, so they are not
//! run per request. A periodic task started with [`spawn_collection_task`]
//! refreshes the exposition held by [`MetricsService`], and requests are
//! answered from [`MetricsService::metrics`].

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, Settings, SharedConfig};
use crate::encoding::text::encode;
use crate::error::Error;
use crate::registry::Registry;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A [`Registry`] together with its last exposition.
///
/// ```
/// # use std::sync::Arc;
/// # use build_exporter::config::SharedConfig;
/// # use build_exporter::registry::Registry;
/// # use build_exporter::service::MetricsService;
/// let config = Arc::new(SharedConfig::default());
/// let service = MetricsService::new(Registry::with_config(config.clone()), config);
///
/// assert!(service.metrics().is_empty());
/// service.collect_metrics();
/// ```
#[derive(Debug)]
pub struct MetricsService {
    registry: Registry,
    config: Arc<SharedConfig>,
    cached: ArcSwap<String>,
}

impl MetricsService {
    /// Create a service over `registry`. Nothing is exposed until the first
    /// [`MetricsService::collect_metrics`].
    pub fn new(registry: Registry, config: Arc<SharedConfig>) -> Self {
        MetricsService {
            registry,
            config,
            cached: ArcSwap::from_pointee(String::new()),
        }
    }

    /// Scrape every collector and replace the cached exposition.
    ///
    /// If the exposition can't be written the previous one is kept.
    pub fn collect_metrics(&self) {
        let families = self.registry.collect();

        let mut buffer = String::new();
        match encode(&mut buffer, &families) {
            Ok(()) => self.cached.store(Arc::new(buffer)),
            Err(err) => {
                debug!(error = %Error::from(err), "keeping previous exposition");
            }
        }
    }

    /// The last exposition. Does not scrape.
    pub fn metrics(&self) -> Arc<String> {
        self.cached.load_full()
    }

    /// Validate `config` and make it active for subsequent scrapes.
    pub fn apply_config(&self, config: Config) -> Result<(), Error> {
        self.config.store(Settings::new(config)?);
        Ok(())
    }

    /// Period the active configuration asks collections to run at.
    pub fn collecting_period(&self) -> Duration {
        self.config.load().collecting_period()
    }
}

/// Run [`MetricsService::collect_metrics`] every collecting period until
/// `shutdown` turns true or its sender is dropped.
///
/// The first collection runs right away. The period is read from the active
/// configuration after every collection; a new period is counted from the
/// end of the collection that noticed it. Collections never overlap: a
/// collection that overruns the period delays the next one.
pub fn spawn_collection_task(
    service: Arc<MetricsService>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut period = service.collecting_period();
        info!(period_secs = period.as_secs(), "starting metrics collection");

        let mut interval = collection_interval(Instant::now(), period);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            let collecting = service.clone();
            let collected = tokio::task::spawn_blocking(move || collecting.collect_metrics()).await;
            if let Err(err) = collected {
                warn!(%err, "metrics collection failed");
            }

            let configured = service.collecting_period();
            if configured != period {
                info!(
                    old_period_secs = period.as_secs(),
                    period_secs = configured.as_secs(),
                    "collecting period changed"
                );
                period = configured;
                interval = collection_interval(Instant::now() + period, period);
            }
        }

        info!("stopped metrics collection");
    })
}

fn collection_interval(start: Instant, period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
