// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Revision store abstractions: committed graph generations over a content-addressed object store.

pub mod filesystem;
pub mod in_memory;
pub mod versioned;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::domain::{Graph, GraphError};

pub use filesystem::{FileObjectStore, FileRevisionRepository};
pub use in_memory::{InMemoryRevisionRepository, MemoryObjectStore};
pub use versioned::VersionedRepository;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("unknown revision {0}")]
    UnknownRevision(String),
    #[error("invalid revision id '{0}'")]
    InvalidId(String),
    #[error("corrupted snapshot for service {service}: {source}")]
    CorruptSnapshot {
        service: String,
        #[source]
        source: GraphError,
    },
    #[error("corrupted revision object {id}: {reason}")]
    CorruptObject { id: String, reason: String },
    #[error("cannot encode revision: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("revision store io: {0}")]
    Io(#[from] std::io::Error),
}

/// BLAKE3 hash of an object's bytes, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 32]);

pub type RevisionId = ObjectId;

impl ObjectId {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RevisionError::InvalidId(s.to_string());
        if s.len() != 64 || !s.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMeta {
    pub id: RevisionId,
    pub parent: Option<RevisionId>,
    pub date: DateTime<Utc>,
    pub message: String,
    pub services: Vec<String>,
}

/// One committed generation with a graph for every known service.
#[derive(Clone, Debug)]
pub struct Rev {
    pub meta: RevisionMeta,
    pub graphs: BTreeMap<String, Graph>,
}

impl Rev {
    pub fn id(&self) -> &RevisionId {
        &self.meta.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.meta.date
    }

    pub fn graph(&self, service: &str) -> Option<&Graph> {
        self.graphs.get(service)
    }
}

pub fn snapshot_file(service: &str) -> String {
    format!("{service}.triples")
}

/// Keeps the newest revision of each UTC calendar day. Input must be oldest first.
pub fn last_of_each_day(revisions: &[RevisionMeta]) -> Vec<RevisionMeta> {
    let mut kept: Vec<RevisionMeta> = Vec::new();
    for rev in revisions {
        match kept.last_mut() {
            Some(last) if last.date.date_naive() == rev.date.date_naive() => *last = rev.clone(),
            _ => kept.push(rev.clone()),
        }
    }
    kept
}

/// Storage primitive underneath the revision store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bytes: &[u8]) -> Result<ObjectId, RevisionError>;

    async fn get_object(&self, id: &ObjectId) -> Result<Option<Vec<u8>>, RevisionError>;

    async fn head(&self) -> Result<Option<ObjectId>, RevisionError>;

    async fn set_head(&self, id: &ObjectId) -> Result<(), RevisionError>;

    async fn write_current(&self, file: &str, bytes: &[u8]) -> Result<(), RevisionError>;

    async fn read_current(&self, file: &str) -> Result<Option<Vec<u8>>, RevisionError>;
}

#[async_trait]
pub trait RevisionRepository: Send + Sync {
    /// Writes the snapshots and records a revision. Returns `None` when nothing changed.
    async fn commit(
        &self,
        snapshots: &BTreeMap<String, Graph>,
    ) -> Result<Option<RevisionMeta>, RevisionError>;

    async fn commit_service(
        &self,
        service: &str,
        graph: &Graph,
    ) -> Result<Option<RevisionMeta>, RevisionError> {
        let snapshots = BTreeMap::from([(service.to_string(), graph.clone())]);
        self.commit(&snapshots).await
    }

    /// Revisions, oldest first.
    async fn list(&self) -> Result<Vec<RevisionMeta>, RevisionError>;

    async fn load_rev(&self, id: &RevisionId) -> Result<Rev, RevisionError>;

    async fn load_current(&self, service: &str) -> Result<Graph, RevisionError>;

    async fn health_check(&self) -> Result<(), RevisionError>;
}

pub type RevisionRepositoryHandle = Arc<dyn RevisionRepository>;
