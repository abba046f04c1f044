use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(InfraError::from)
}

/// Register metric descriptions once per process.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "quire_rate_limit_denied_total",
            Unit::Count,
            "Requests rejected by the rate limiter, labelled by class."
        );
        describe_counter!(
            "quire_publish_total",
            Unit::Count,
            "Successful publish calls."
        );
        describe_counter!(
            "quire_cache_purge_total",
            Unit::Count,
            "CDN purge attempts, labelled by outcome."
        );
        describe_counter!(
            "quire_response_cache_hit_total",
            Unit::Count,
            "Public responses served from the in-process cache."
        );
        describe_counter!(
            "quire_response_cache_miss_total",
            Unit::Count,
            "Public responses that had to be produced by a handler."
        );
        describe_counter!(
            "quire_response_cache_evict_total",
            Unit::Count,
            "Cached responses evicted by capacity, expiry or invalidation."
        );
        describe_counter!(
            "quire_remote_save_total",
            Unit::Count,
            "Editor remote save attempts, labelled by outcome."
        );
    });
}
