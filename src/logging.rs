use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with a stderr formatter.
///
/// `RUST_LOG` wins over `filter` when set. Calling this twice is harmless: the
/// second global subscriber is rejected and the first keeps running.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact();

    let initialised = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if initialised {
        tracing::debug!(target: "system", "Tracing initialized with filter '{}'", filter);
    }
}

/// Convenience macros for common operations
#[macro_export]
macro_rules! trace_request {
    ($method:expr, $path:expr) => {
        tracing::debug!(target: "api", "{} {}", $method, $path);
    };
}

#[macro_export]
macro_rules! trace_cache {
    ($event:expr, $key:expr) => {
        tracing::trace!(target: "query", "{} {}", $event, $key);
    };
}
