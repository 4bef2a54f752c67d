// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// This binary sets up configuration, telemetry and the revision store, then launches the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use skygraph::cloud::{GraphBuilder, ServiceRegistry};
use skygraph::config::AppConfig;
use skygraph::repository::{FileRevisionRepository, RevisionRepositoryHandle};
use skygraph::state::{ActivityLog, AppContext};
use skygraph::{server, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let cfg = AppConfig::from_env()?;

    tracing::info!(service = %cfg.service_name, version = %cfg.version, "starting skygraph");

    let registry = ServiceRegistry::builtin();
    let repo = FileRevisionRepository::open(&cfg.repo_dir, registry.names())
        .await
        .with_context(|| format!("failed to open revision store at {}", cfg.repo_dir.display()))?;
    let repo: RevisionRepositoryHandle = Arc::new(repo);

    let builder = GraphBuilder::new(cfg.fetch_concurrency);
    let ctx = AppContext::new(repo, registry, ActivityLog::new(), builder);
    server::run(cfg, ctx).await
}
