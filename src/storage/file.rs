use std::{
    fs::{self, File, OpenOptions, rename, write},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::debug;
use uuid::Uuid;

use crate::storage::{DocumentLocator, DocumentStore, StoreError, VersionToken, VersionedDocument};

/// Token reported for a blob that was placed by hand, without a sidecar
const UNVERSIONED: &str = "unversioned";

/// Directory-backed document store.
///
/// A document lives at `{root}/{owner}/{repo}/{path}`. Its version token sits
/// next to it in `<file>.version` and is replaced by a fresh UUID on every
/// write. A `<file>.lock` file serializes readers and writers across processes.
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Only plain names are joined, so a locator never escapes `root`
    fn document_path(&self, locator: &DocumentLocator) -> Result<PathBuf, StoreError> {
        let invalid = || StoreError::InvalidLocator(locator.clone());

        let mut path = self.root.clone();
        for name in [locator.owner.as_str(), locator.repo.as_str()] {
            path.push(plain_name(name).ok_or_else(invalid)?);
        }

        let mut segments = locator.path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek().is_none() {
            return Err(invalid());
        }
        for segment in segments {
            path.push(plain_name(segment).ok_or_else(invalid)?);
        }
        Ok(path)
    }
}

/// `name` when it is a single normal path component
fn plain_name(name: &str) -> Option<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(name),
        _ => None,
    }
}

fn sidecar(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

fn open_lock(path: &Path) -> Result<File, StoreError> {
    let lock_path = sidecar(path, "lock");
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(io_error(&lock_path))
}

/// Current version, or `None` when the document does not exist
fn current_version(path: &Path) -> Result<Option<VersionToken>, StoreError> {
    if !fs::exists(path).map_err(io_error(path))? {
        return Ok(None);
    }

    let version_path = sidecar(path, "version");
    match fs::read_to_string(&version_path) {
        Ok(token) => Ok(Some(VersionToken::new(token.trim()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Some(VersionToken::new(UNVERSIONED))),
        Err(e) => Err(io_error(&version_path)(e)),
    }
}

fn read_blocking(path: &Path, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
    let lock_file = open_lock(path)?;
    lock_file.lock_shared().map_err(io_error(path))?;

    let result = match fs::read(path) {
        Ok(content) => current_version(path).map(|version| VersionedDocument {
            content,
            version: version.unwrap_or_else(|| VersionToken::new(UNVERSIONED)),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(locator.clone())),
        Err(e) => Err(io_error(path)(e)),
    };

    lock_file.unlock().map_err(io_error(path))?;
    result
}

fn write_blocking(
    path: &Path,
    locator: &DocumentLocator,
    content: Vec<u8>,
    expected: Option<VersionToken>,
) -> Result<VersionToken, StoreError> {
    let lock_file = open_lock(path)?;
    lock_file.lock_exclusive().map_err(io_error(path))?;

    let result = replace_if_current(path, locator, content, expected);

    lock_file.unlock().map_err(io_error(path))?;
    result
}

fn replace_if_current(
    path: &Path,
    locator: &DocumentLocator,
    content: Vec<u8>,
    expected: Option<VersionToken>,
) -> Result<VersionToken, StoreError> {
    if current_version(path)? != expected {
        return Err(StoreError::VersionConflict {
            locator: locator.clone(),
            expected,
        });
    }

    let version = VersionToken::new(Uuid::new_v4().to_string());
    let version_path = sidecar(path, "version");
    let staged_content = sidecar(path, &format!("tmp.{}", Uuid::new_v4()));
    let staged_version = sidecar(&version_path, &format!("tmp.{}", Uuid::new_v4()));

    let result = write(&staged_content, content)
        .map_err(io_error(&staged_content))
        .and_then(|()| write(&staged_version, version.as_str()).map_err(io_error(&staged_version)))
        // The token moves first, so a failed content swap can only bump it
        .and_then(|()| rename(&staged_version, &version_path).map_err(io_error(&version_path)))
        .and_then(|()| rename(&staged_content, path).map_err(io_error(path)));

    if result.is_err() {
        let _ = fs::remove_file(&staged_content);
        let _ = fs::remove_file(&staged_version);
    }

    result.map(|()| version)
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
        let path = self.document_path(locator)?;
        let locator = locator.clone();
        debug!(path = %path.display(), "reading document");

        tokio::task::spawn_blocking(move || read_blocking(&path, &locator))
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
    }

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        _message: &str,
    ) -> Result<VersionToken, StoreError> {
        let path = self.document_path(locator)?;
        let locator = locator.clone();
        let expected = expected.cloned();
        debug!(path = %path.display(), "writing document");

        tokio::task::spawn_blocking(move || write_blocking(&path, &locator, content, expected))
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> DocumentLocator {
        DocumentLocator::new("acme", "plans", "data/projects.json")
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf());

        let version = store
            .write(&locator(), b"[]".to_vec(), None, "create")
            .await
            .unwrap();

        let loaded = store.read(&locator()).await.unwrap();
        assert_eq!(loaded.content, b"[]".to_vec());
        assert_eq!(loaded.version, version);
        assert!(dir.path().join("acme/plans/data/projects.json").exists());
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf());

        match store.read(&locator()).await {
            Err(StoreError::NotFound(_)) => {}
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf());

        let first = store
            .write(&locator(), b"[]".to_vec(), None, "create")
            .await
            .unwrap();
        let second = store
            .write(&locator(), b"[1]".to_vec(), Some(&first), "update")
            .await
            .unwrap();
        assert_ne!(first, second);

        let stale = store
            .write(&locator(), b"[2]".to_vec(), Some(&first), "update")
            .await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));
        assert_eq!(store.read(&locator()).await.unwrap().content, b"[1]".to_vec());
    }

    #[tokio::test]
    async fn test_hand_placed_document_is_unversioned() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let path = dir.path().join("acme/plans/data");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("projects.json"), "[]").unwrap();

        let loaded = store.read(&locator()).await.unwrap();
        assert_eq!(loaded.version.as_str(), UNVERSIONED);

        let created = store.write(&locator(), b"[]".to_vec(), None, "create").await;
        assert!(matches!(created, Err(StoreError::VersionConflict { .. })));

        store
            .write(&locator(), b"[]".to_vec(), Some(&loaded.version), "adopt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_swap_still_rejects_the_old_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let document = dir.path().join("acme/plans/data/projects.json");

        // A non-empty directory where the document should be makes the
        // content rename fail after the precondition has passed
        std::fs::create_dir_all(document.join("blocker")).unwrap();
        std::fs::write(sidecar(&document, "version"), "old").unwrap();
        let old = VersionToken::new("old");

        let failed = store
            .write(&locator(), b"[1]".to_vec(), Some(&old), "update")
            .await;
        assert!(matches!(failed, Err(StoreError::Io { .. })));

        let stale = store
            .write(&locator(), b"[2]".to_vec(), Some(&old), "update")
            .await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));

        let leftovers: Vec<_> = std::fs::read_dir(document.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "staged files left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_locator_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let store = FileDocumentStore::new(root);

        let escaping = [
            DocumentLocator::new("acme", "plans", "../../../outside.json"),
            DocumentLocator::new("..", "plans", "projects.json"),
            DocumentLocator::new("acme", "/etc", "projects.json"),
            DocumentLocator::new("acme", "plans", ""),
        ];

        for locator in &escaping {
            let written = store.write(locator, b"[]".to_vec(), None, "create").await;
            assert!(
                matches!(written, Err(StoreError::InvalidLocator(_))),
                "{} was accepted",
                locator
            );
            assert!(matches!(
                store.read(locator).await,
                Err(StoreError::InvalidLocator(_))
            ));
        }
        assert!(!dir.path().join("outside.json").exists());
    }
}
