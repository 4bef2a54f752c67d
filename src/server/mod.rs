// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// This module hosts the HTTP server that exposes the revision store and activity log.

mod http;

use anyhow::Result;

use crate::config::AppConfig;
use crate::state::AppContext;

pub use http::router;

pub async fn run(cfg: AppConfig, ctx: AppContext) -> Result<()> {
    http::serve(cfg, ctx).await
}
