// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Commit chain over an object store: snapshots as blobs, commits as JSON records naming their parent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::Graph;

use super::{
    snapshot_file, ObjectId, ObjectStore, Rev, RevisionError, RevisionId, RevisionMeta,
    RevisionRepository,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CommitRecord {
    parent: Option<ObjectId>,
    date: DateTime<Utc>,
    message: String,
    tree: BTreeMap<String, ObjectId>,
}

impl CommitRecord {
    fn decode(id: &ObjectId, bytes: &[u8]) -> Result<Self, RevisionError> {
        if ObjectId::of(bytes) != *id {
            return Err(RevisionError::CorruptObject {
                id: id.to_string(),
                reason: "content does not match its hash".into(),
            });
        }
        // An intact object that is not a commit record, such as a snapshot blob, names no revision.
        serde_json::from_slice(bytes).map_err(|_| RevisionError::UnknownRevision(id.to_string()))
    }

    fn meta(&self, id: ObjectId) -> RevisionMeta {
        RevisionMeta {
            id,
            parent: self.parent,
            date: self.date,
            message: self.message.clone(),
            services: self.tree.keys().cloned().collect(),
        }
    }
}

/// Revision store over any [`ObjectStore`]. Commits and listings are serialised.
pub struct VersionedRepository<S> {
    store: S,
    services: Vec<String>,
    lock: Mutex<()>,
}

impl<S: ObjectStore> VersionedRepository<S> {
    /// `services` are the snapshot names every loaded revision reports, even when absent.
    pub fn new(store: S, services: Vec<String>) -> Self {
        Self {
            store,
            services,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_commit(&self, id: &ObjectId) -> Result<CommitRecord, RevisionError> {
        let bytes = self
            .store
            .get_object(id)
            .await?
            .ok_or_else(|| RevisionError::UnknownRevision(id.to_string()))?;
        CommitRecord::decode(id, &bytes)
    }

    async fn load_snapshot(&self, service: &str, blob: &ObjectId) -> Result<Graph, RevisionError> {
        let Some(bytes) = self.store.get_object(blob).await? else {
            tracing::warn!(service, %blob, "snapshot object missing, using empty graph");
            return Ok(Graph::new());
        };
        parse_snapshot(service, &bytes)
    }
}

fn parse_snapshot(service: &str, bytes: &[u8]) -> Result<Graph, RevisionError> {
    Graph::unmarshal(bytes).map_err(|source| RevisionError::CorruptSnapshot {
        service: service.to_string(),
        source,
    })
}

#[async_trait]
impl<S: ObjectStore> RevisionRepository for VersionedRepository<S> {
    async fn commit(
        &self,
        snapshots: &BTreeMap<String, Graph>,
    ) -> Result<Option<RevisionMeta>, RevisionError> {
        if snapshots.is_empty() {
            return Ok(None);
        }
        let _guard = self.lock.lock().await;

        let head = self.store.head().await?;
        let parent = match &head {
            Some(id) => Some(self.load_commit(id).await?),
            None => None,
        };

        let mut tree = parent
            .as_ref()
            .map(|commit| commit.tree.clone())
            .unwrap_or_default();
        let mut encoded = Vec::with_capacity(snapshots.len());
        for (service, graph) in snapshots {
            let bytes = graph.marshal();
            let blob = self.store.put_object(&bytes).await?;
            tree.insert(service.clone(), blob);
            encoded.push((service, bytes));
        }

        let revision = if parent.as_ref().is_some_and(|commit| commit.tree == tree) {
            tracing::debug!("snapshots unchanged, no revision recorded");
            None
        } else {
            let names: Vec<&str> = snapshots.keys().map(String::as_str).collect();
            let record = CommitRecord {
                parent: head,
                date: Utc::now(),
                message: format!("syncing {}", names.join(", ")),
                tree,
            };
            let bytes = serde_json::to_vec(&record)?;
            let id = self.store.put_object(&bytes).await?;
            self.store.set_head(&id).await?;

            tracing::info!(revision = %id, message = %record.message, "recorded revision");
            Some(record.meta(id))
        };

        // Current files follow HEAD, never lead it.
        for (service, bytes) in encoded {
            self.store
                .write_current(&snapshot_file(service), &bytes)
                .await?;
        }

        Ok(revision)
    }

    async fn list(&self) -> Result<Vec<RevisionMeta>, RevisionError> {
        let _guard = self.lock.lock().await;

        let mut revisions = Vec::new();
        let mut cursor = self.store.head().await?;
        while let Some(id) = cursor {
            let record = self.load_commit(&id).await?;
            cursor = record.parent;
            revisions.push(record.meta(id));
        }
        revisions.reverse();
        Ok(revisions)
    }

    async fn load_rev(&self, id: &RevisionId) -> Result<Rev, RevisionError> {
        let record = self.load_commit(id).await?;

        let mut graphs = BTreeMap::new();
        for service in &self.services {
            graphs.insert(service.clone(), Graph::new());
        }
        for (service, blob) in &record.tree {
            graphs.insert(service.clone(), self.load_snapshot(service, blob).await?);
        }

        Ok(Rev {
            meta: record.meta(*id),
            graphs,
        })
    }

    async fn load_current(&self, service: &str) -> Result<Graph, RevisionError> {
        match self.store.read_current(&snapshot_file(service)).await? {
            Some(bytes) => parse_snapshot(service, &bytes),
            None => Ok(Graph::new()),
        }
    }

    async fn health_check(&self) -> Result<(), RevisionError> {
        self.store.head().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, ResourceType, Triple};
    use crate::repository::MemoryObjectStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn vpc_graph(id: &str) -> Graph {
        let region = Node::new(ResourceType::Region, "eu-west-1");
        let vpc = Node::new(ResourceType::Vpc, id);
        let mut graph = Graph::new();
        graph.add(Triple::has_type(&region));
        graph.add(Triple::has_type(&vpc));
        graph.add(Triple::parent_of(&region, &vpc));
        graph
    }

    /// Memory store whose HEAD update can be made to fail.
    #[derive(Default)]
    struct FlakyHead {
        inner: MemoryObjectStore,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ObjectStore for FlakyHead {
        async fn put_object(&self, bytes: &[u8]) -> Result<ObjectId, RevisionError> {
            self.inner.put_object(bytes).await
        }

        async fn get_object(&self, id: &ObjectId) -> Result<Option<Vec<u8>>, RevisionError> {
            self.inner.get_object(id).await
        }

        async fn head(&self) -> Result<Option<ObjectId>, RevisionError> {
            self.inner.head().await
        }

        async fn set_head(&self, id: &ObjectId) -> Result<(), RevisionError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("HEAD is read-only").into());
            }
            self.inner.set_head(id).await
        }

        async fn write_current(&self, file: &str, bytes: &[u8]) -> Result<(), RevisionError> {
            self.inner.write_current(file, bytes).await
        }

        async fn read_current(&self, file: &str) -> Result<Option<Vec<u8>>, RevisionError> {
            self.inner.read_current(file).await
        }
    }

    #[tokio::test]
    async fn unparsable_snapshot_in_history_is_named() {
        let repo = VersionedRepository::new(MemoryObjectStore::new(), vec!["infra".into()]);
        let blob = repo
            .store()
            .put_object(b"/vpc<vpc_1>\tnot a triple")
            .await
            .unwrap();
        let record = CommitRecord {
            parent: None,
            date: Utc::now(),
            message: "syncing infra".into(),
            tree: BTreeMap::from([("infra".to_string(), blob)]),
        };
        let id = repo
            .store()
            .put_object(&serde_json::to_vec(&record).unwrap())
            .await
            .unwrap();
        repo.store().set_head(&id).await.unwrap();

        let err = repo.load_rev(&id).await.unwrap_err();
        assert!(matches!(err, RevisionError::CorruptSnapshot { ref service, .. } if service == "infra"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_blob_id_is_not_a_revision() {
        let repo = VersionedRepository::new(MemoryObjectStore::new(), vec!["infra".into()]);
        let graph = vpc_graph("vpc_1");
        repo.commit_service("infra", &graph).await.unwrap();

        let blob = ObjectId::of(&graph.marshal());
        let err = repo.load_rev(&blob).await.unwrap_err();
        assert!(matches!(err, RevisionError::UnknownRevision(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_commits_form_one_chain() {
        let services: Vec<String> = (0..8).map(|i| format!("svc{i}")).collect();
        let repo = Arc::new(VersionedRepository::new(
            MemoryObjectStore::new(),
            services.clone(),
        ));

        let mut tasks = Vec::new();
        for (i, service) in services.iter().cloned().enumerate() {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                repo.commit_service(&service, &vpc_graph(&format!("vpc_{i}")))
                    .await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().unwrap().is_some());
        }

        let revisions = repo.list().await.unwrap();
        assert_eq!(revisions.len(), 8);
        assert_eq!(revisions[0].parent, None);
        assert!(revisions
            .windows(2)
            .all(|pair| pair[1].parent == Some(pair[0].id)));

        let latest = repo.load_rev(&revisions[7].id).await.unwrap();
        assert!(latest.graphs.values().all(|graph| !graph.is_empty()));
    }

    #[tokio::test]
    async fn failed_head_update_leaves_current_files_untouched() {
        let repo = VersionedRepository::new(FlakyHead::default(), vec!["infra".into()]);
        let first = vpc_graph("vpc_1");
        repo.commit_service("infra", &first).await.unwrap();

        repo.store().fail.store(true, Ordering::SeqCst);
        let err = repo.commit_service("infra", &vpc_graph("vpc_2")).await;
        assert!(matches!(err, Err(RevisionError::Io(_))));

        let current = repo.load_current("infra").await.unwrap();
        assert_eq!(current, first);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
