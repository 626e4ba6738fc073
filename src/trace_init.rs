use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INIT_GUARD: OnceLock<bool> = OnceLock::new();

/// Installs the global tracing subscriber once per process.
///
/// Logs go to stderr so stdout carries only benchmark records. The filter
/// comes from `RUST_LOG`, defaulting to `default_level`. Returns false if
/// another subscriber was already installed.
pub fn init_tracing(default_level: &str) -> bool {
    *INIT_GUARD.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let fmt_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
        Registry::default().with(filter).with(fmt_layer).try_init().is_ok()
    })
}
