// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// In-memory object store used by tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ObjectId, ObjectStore, RevisionError, VersionedRepository};

#[derive(Default)]
struct Inner {
    objects: HashMap<ObjectId, Vec<u8>>,
    head: Option<ObjectId>,
    current: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    inner: Mutex<Inner>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Replaces a stored object without rehashing. Test hook for corruption scenarios.
    pub fn overwrite_object(&self, id: &ObjectId, bytes: Vec<u8>) {
        self.inner.lock().objects.insert(*id, bytes);
    }

    pub fn remove_object(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.inner.lock().objects.remove(id)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bytes: &[u8]) -> Result<ObjectId, RevisionError> {
        let id = ObjectId::of(bytes);
        self.inner
            .lock()
            .objects
            .entry(id)
            .or_insert_with(|| bytes.to_vec());
        Ok(id)
    }

    async fn get_object(&self, id: &ObjectId) -> Result<Option<Vec<u8>>, RevisionError> {
        Ok(self.inner.lock().objects.get(id).cloned())
    }

    async fn head(&self) -> Result<Option<ObjectId>, RevisionError> {
        Ok(self.inner.lock().head)
    }

    async fn set_head(&self, id: &ObjectId) -> Result<(), RevisionError> {
        self.inner.lock().head = Some(*id);
        Ok(())
    }

    async fn write_current(&self, file: &str, bytes: &[u8]) -> Result<(), RevisionError> {
        self.inner
            .lock()
            .current
            .insert(file.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_current(&self, file: &str) -> Result<Option<Vec<u8>>, RevisionError> {
        Ok(self.inner.lock().current.get(file).cloned())
    }
}

pub type InMemoryRevisionRepository = VersionedRepository<MemoryObjectStore>;

impl VersionedRepository<MemoryObjectStore> {
    pub fn in_memory(services: Vec<String>) -> Self {
        Self::new(MemoryObjectStore::new(), services)
    }
}
