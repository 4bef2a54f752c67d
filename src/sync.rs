// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Multi-service sync: fetch every service graph concurrently, then commit the successful ones together.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::cloud::{FetchError, GraphBuilder, ServiceClient};
use crate::domain::Graph;
use crate::repository::{RevisionError, RevisionMeta, RevisionRepositoryHandle};
use crate::state::ActivityLog;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("commit {services}: {source}")]
    Commit {
        services: String,
        #[source]
        source: RevisionError,
    },
}

/// Outcome of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub graphs: BTreeMap<String, Graph>,
    pub revision: Option<RevisionMeta>,
    pub denied: Vec<String>,
    pub failures: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.denied.is_empty() && self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct Syncer {
    repo: RevisionRepositoryHandle,
    activity: ActivityLog,
    builder: GraphBuilder,
}

impl Syncer {
    pub fn new(repo: RevisionRepositoryHandle, activity: ActivityLog, builder: GraphBuilder) -> Self {
        Self {
            repo,
            activity,
            builder,
        }
    }

    /// Fetches every client's service and commits the graphs that were fetched.
    ///
    /// Services refused by the provider are skipped with a warning. Other failures are listed in
    /// the report and do not prevent the remaining services from being committed.
    pub async fn sync(&self, clients: &[Arc<dyn ServiceClient>]) -> Result<SyncReport, SyncError> {
        let builder = self.builder;
        let outcomes: Vec<(String, Result<Graph, FetchError>)> = stream::iter(clients.iter().cloned())
            .map(|client| async move {
                let name = client.service().name.to_string();
                let started = Instant::now();
                let result = builder.fetch_resources(client.as_ref()).await;
                tracing::debug!(service = %name, elapsed_ms = started.elapsed().as_millis() as u64, "service fetch finished");
                (name, result)
            })
            .buffer_unordered(clients.len().max(1))
            .collect()
            .await;

        let mut report = SyncReport::default();
        for (name, result) in outcomes {
            match result {
                Ok(graph) => {
                    self.activity.record_sync(&name, graph.len());
                    report.graphs.insert(name, graph);
                }
                Err(err) if err.is_access_denied() => {
                    tracing::warn!(service = %name, %err, "skipping service");
                    self.activity.record_denied(&name, &err.to_string());
                    report.denied.push(name);
                }
                Err(err) => {
                    tracing::error!(service = %name, %err, "service sync failed");
                    self.activity.record_failure(&name, &err.to_string());
                    report.failures.push(format!("syncing {name}: {err}"));
                }
            }
        }
        report.denied.sort();
        report.failures.sort();

        if report.graphs.is_empty() {
            return Ok(report);
        }

        let revision = self
            .repo
            .commit(&report.graphs)
            .await
            .map_err(|source| SyncError::Commit {
                services: report.graphs.keys().cloned().collect::<Vec<_>>().join(", "),
                source,
            })?;
        self.activity.record_commit(revision.as_ref());
        report.revision = revision;
        Ok(report)
    }
}

/// Merges the current snapshot of every listed service into one graph.
pub async fn load_all_graphs(
    repo: &RevisionRepositoryHandle,
    services: &[String],
) -> Result<Graph, RevisionError> {
    let mut merged = Graph::new();
    for service in services {
        merged.add_graph(&repo.load_current(service).await?);
    }
    Ok(merged)
}
