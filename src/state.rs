// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Activity log of sync runs and the shared application context handed to servers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::cloud::{GraphBuilder, ServiceRegistry};
use crate::repository::{RevisionMeta, RevisionRepositoryHandle};
use crate::sync::Syncer;

const MAX_HISTORY: usize = 200;

#[derive(Clone, Default)]
pub struct ActivityLog {
    inner: Arc<RwLock<ActivityData>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sync(&self, service: &str, triples: usize) {
        let mut guard = self.inner.write();
        guard.counters.services_synced += 1;
        guard.counters.last_sync = Some(Utc::now());
        guard.push_history(ActivityEvent::new(
            "SYNC",
            Some(service),
            json!({ "triples": triples }),
        ));
    }

    pub fn record_denied(&self, service: &str, message: &str) {
        let mut guard = self.inner.write();
        guard.counters.services_denied += 1;
        guard.push_history(ActivityEvent::new(
            "DENIED",
            Some(service),
            json!({ "message": message }),
        ));
    }

    pub fn record_failure(&self, service: &str, message: &str) {
        let mut guard = self.inner.write();
        guard.counters.services_failed += 1;
        guard.push_history(ActivityEvent::new(
            "FAILURE",
            Some(service),
            json!({ "message": message }),
        ));
    }

    pub fn record_commit(&self, revision: Option<&RevisionMeta>) {
        let mut guard = self.inner.write();
        let detail = match revision {
            Some(meta) => {
                guard.counters.revisions += 1;
                guard.counters.last_revision = Some(meta.id.to_string());
                json!({ "revision": meta.id, "message": meta.message })
            }
            None => json!({ "revision": Value::Null, "message": "no changes" }),
        };
        guard.push_history(ActivityEvent::new("COMMIT", None, detail));
    }

    pub fn overview(&self) -> ActivityOverview {
        self.inner.read().counters.overview()
    }

    pub fn history(&self) -> Vec<ActivityEvent> {
        self.inner.read().history.iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.inner.write().history.clear();
    }
}

#[derive(Default)]
struct ActivityData {
    counters: Counters,
    history: VecDeque<ActivityEvent>,
}

impl ActivityData {
    fn push_history(&mut self, event: ActivityEvent) {
        if self.history.len() == MAX_HISTORY {
            self.history.pop_back();
        }
        self.history.push_front(event);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub service: Option<String>,
    pub detail: Value,
}

impl ActivityEvent {
    pub fn new(event_type: &str, service: Option<&str>, detail: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            service: service.map(str::to_string),
            detail,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityOverview {
    pub services_synced: u64,
    pub services_denied: u64,
    pub services_failed: u64,
    pub revisions: u64,
    pub success_rate: f64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_revision: Option<String>,
}

#[derive(Default)]
struct Counters {
    services_synced: u64,
    services_denied: u64,
    services_failed: u64,
    revisions: u64,
    last_sync: Option<DateTime<Utc>>,
    last_revision: Option<String>,
}

impl Counters {
    fn overview(&self) -> ActivityOverview {
        let attempts = self.services_synced + self.services_denied + self.services_failed;
        let success_rate = if attempts == 0 {
            0.0
        } else {
            (self.services_synced as f64 / attempts as f64) * 100.0
        };

        ActivityOverview {
            services_synced: self.services_synced,
            services_denied: self.services_denied,
            services_failed: self.services_failed,
            revisions: self.revisions,
            success_rate,
            last_sync: self.last_sync,
            last_revision: self.last_revision.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub repo: RevisionRepositoryHandle,
    pub registry: ServiceRegistry,
    pub activity: ActivityLog,
    pub builder: GraphBuilder,
}

impl AppContext {
    pub fn new(
        repo: RevisionRepositoryHandle,
        registry: ServiceRegistry,
        activity: ActivityLog,
        builder: GraphBuilder,
    ) -> Self {
        Self {
            repo,
            registry,
            activity,
            builder,
        }
    }

    /// Syncer writing to this context's store and activity log.
    pub fn syncer(&self) -> Syncer {
        Syncer::new(self.repo.clone(), self.activity.clone(), self.builder)
    }
}
