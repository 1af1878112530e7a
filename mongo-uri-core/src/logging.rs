//! Opt-in structured logging.
//!
//! The library only emits `tracing` events. A subscriber is installed by
//! [`init`] when the environment asks for one:
//!
//! - `MONGO_URI_DEBUG=true|1|yes` turns on debug output
//! - `MONGO_URI_LOG_LEVEL=trace|debug|info|warn|error` picks the level
//! - `MONGO_URI_LOG_FORMAT=json|pretty|compact` picks the format (default: json)
//!
//! Installing the subscriber needs the `tracing-subscriber` feature. Without
//! it, [`init`] does nothing and events go to whatever subscriber the
//! application set up.
//!
//! ```rust,no_run
//! use mongo_uri_core::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

/// Enables debug output when truthy.
pub const DEBUG_VAR: &str = "MONGO_URI_DEBUG";
/// Overrides the log level.
pub const LEVEL_VAR: &str = "MONGO_URI_LOG_LEVEL";
/// Selects the output format.
pub const FORMAT_VAR: &str = "MONGO_URI_LOG_FORMAT";

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

static INIT: Once = Once::new();

/// Check if `MONGO_URI_DEBUG` is set to a truthy value.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn normalize_level(level: &str) -> Option<&'static str> {
    let level = level.to_ascii_lowercase();
    LEVELS.iter().copied().find(|l| *l == level)
}

/// The configured log level.
///
/// An unrecognised `MONGO_URI_LOG_LEVEL` falls back to the default: `debug`
/// when debug output is on, `warn` otherwise.
pub fn log_level() -> &'static str {
    env::var(LEVEL_VAR)
        .ok()
        .and_then(|l| normalize_level(&l))
        .unwrap_or(if is_debug_enabled() { "debug" } else { "warn" })
}

/// The configured output format.
pub fn log_format() -> &'static str {
    match env::var(FORMAT_VAR).map(|f| f.to_ascii_lowercase()).as_deref() {
        Ok("pretty") => "pretty",
        Ok("compact") => "compact",
        _ => "json",
    }
}

/// Install a subscriber if the environment requests logging.
///
/// Only the first call has any effect.
pub fn init() {
    if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
        return;
    }
    install(log_level());
}

/// Install a subscriber at `level`, ignoring `MONGO_URI_DEBUG` and
/// `MONGO_URI_LOG_LEVEL`.
///
/// Unknown levels fall back to `warn`. Only the first installation has
/// any effect.
pub fn init_with_level(level: &str) {
    install(normalize_level(level).unwrap_or("warn"));
}

fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!("mongo_uri={level},mongo_uri_core={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let format = log_format();
            let registry = tracing_subscriber::registry().with(filter);
            let installed = match format {
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                "pretty" => registry.with(fmt::layer().pretty()).try_init(),
                _ => registry.with(fmt::layer().json()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = format, "mongo-uri logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = level;
    });
}
