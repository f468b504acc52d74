//! Provider logging.
//!
//! Terraform captures the plugin's stderr and filters it by `TF_LOG`. The
//! subscriber honours `TF_LOG_PROVIDER` first so provider logs can be turned
//! up without drowning in core logs.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Level from Terraform's env vars. Unknown or empty values fall back to INFO,
/// `JSON` is Terraform's alias for TRACE.
pub fn level_from_env() -> LevelFilter {
    ["TF_LOG_PROVIDER", "TF_LOG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| parse_level(&value))
        .unwrap_or(DEFAULT_LEVEL)
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" => Some(LevelFilter::WARN),
        "ERROR" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Install the stderr subscriber. Safe to call more than once: later calls
/// leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_env().into())
        .parse_lossy("");

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
