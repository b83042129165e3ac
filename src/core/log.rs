use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. The daemon keeps `info` for its own target
/// so refreshes stay visible without `--verbose`.
pub fn init_logging(verbose: bool, daemon: bool) {
    let (level_filter, level) = match (verbose, daemon) {
        (true, _) => (LevelFilter::DEBUG, "debug"),
        (false, true) => (LevelFilter::INFO, "info"),
        (false, false) => (LevelFilter::OFF, "off"),
    };
    let app_filter = Targets::new().with_target("quotelock", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry()
        .with(app_filter)
        .with(env_filter);
    if daemon {
        registry.with(fmt::layer().compact()).init();
    } else {
        registry.with(fmt::layer().pretty().without_time()).init();
    }
}
