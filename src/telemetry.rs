// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Tracing setup: compact fmt output filtered by RUST_LOG, defaulting to skygraph and tower_http at info.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "skygraph=info,tower_http=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter())
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
