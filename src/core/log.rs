use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Initializes stderr logging. Without `verbose` only warnings from this
/// crate are shown. `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::WARN, "warn")
    };
    let app_filter = Targets::new().with_target("expense_sync", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let layer = fmt::layer().with_writer(std::io::stderr).with_target(verbose);
    let registry = tracing_subscriber::registry().with(app_filter).with(env_filter);
    if verbose {
        registry.with(layer.pretty().without_time()).init();
    } else {
        registry.with(layer.compact()).init();
    }
}
