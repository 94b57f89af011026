use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer,
    filter::{Directive, EnvFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Dependencies that are chatty at INFO; applied only when `RUST_LOG` is unset
const QUIET_DEPENDENCIES: &[&str] = &["libsql=warn", "actix_server=warn", "hyper=warn"];

/// Install the global subscriber at INFO unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    init_tracing_with_level(LevelFilter::INFO);
}

/// Install the global subscriber with `level` as the default directive.
///
/// `RUST_LOG_FORMAT=json` switches to one JSON object per line, anything else
/// gives compact human-readable output. A second call leaves the first
/// subscriber in place.
pub fn init_tracing_with_level(level: LevelFilter) {
    let env_filter = match var("RUST_LOG") {
        Ok(_) => EnvFilter::builder().with_default_directive(level.into()).from_env_lossy(),
        Err(_) => default_filter(level),
    };

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_err() {
        warn!("A global tracing subscriber is already installed");
    }
}

/// `level` for the exporter's own crates, WARN for the noisy dependencies
fn default_filter(level: LevelFilter) -> EnvFilter {
    QUIET_DEPENDENCIES
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(
            EnvFilter::builder().with_default_directive(level.into()).parse_lossy(""),
            |filter, directive| filter.add_directive(directive),
        )
}
