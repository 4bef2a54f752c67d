// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// On-disk object store: snapshot files at the root, history objects and HEAD under `.history/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectId, ObjectStore, RevisionError, VersionedRepository};

const HISTORY_DIR: &str = ".history";
const OBJECTS_DIR: &str = "objects";
const HEAD_FILE: &str = "HEAD";

#[derive(Clone, Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// Opens the store, creating the directory layout when needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RevisionError> {
        let store = Self { root: root.into() };
        fs::create_dir_all(store.objects_dir()).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    fn objects_dir(&self) -> PathBuf {
        self.history_dir().join(OBJECTS_DIR)
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir().join(id.to_string())
    }

    fn head_path(&self) -> PathBuf {
        self.history_dir().join(HEAD_FILE)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RevisionError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, RevisionError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn put_object(&self, bytes: &[u8]) -> Result<ObjectId, RevisionError> {
        let id = ObjectId::of(bytes);
        let path = self.object_path(&id);
        if fs::try_exists(&path).await? {
            return Ok(id);
        }
        write_atomic(&path, bytes).await?;
        Ok(id)
    }

    async fn get_object(&self, id: &ObjectId) -> Result<Option<Vec<u8>>, RevisionError> {
        read_optional(&self.object_path(id)).await
    }

    async fn head(&self) -> Result<Option<ObjectId>, RevisionError> {
        let Some(bytes) = read_optional(&self.head_path()).await? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some)
    }

    async fn set_head(&self, id: &ObjectId) -> Result<(), RevisionError> {
        write_atomic(&self.head_path(), id.to_string().as_bytes()).await
    }

    async fn write_current(&self, file: &str, bytes: &[u8]) -> Result<(), RevisionError> {
        write_atomic(&self.root.join(file), bytes).await
    }

    async fn read_current(&self, file: &str) -> Result<Option<Vec<u8>>, RevisionError> {
        read_optional(&self.root.join(file)).await
    }
}

pub type FileRevisionRepository = VersionedRepository<FileObjectStore>;

impl VersionedRepository<FileObjectStore> {
    pub async fn open(dir: impl Into<PathBuf>, services: Vec<String>) -> Result<Self, RevisionError> {
        let store = FileObjectStore::open(dir).await?;
        tracing::debug!(root = %store.root().display(), "opened revision store");
        Ok(Self::new(store, services))
    }
}
