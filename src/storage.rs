use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod github;
pub mod json;
pub mod memory;

/// Where the project document lives: a path inside an owner's repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentLocator {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl DocumentLocator {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for DocumentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.path)
    }
}

/// Opaque revision identifier handed out by a store on every read and write
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw document content together with the version it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDocument {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document '{0}' does not exist")]
    NotFound(DocumentLocator),

    #[error("The document store rejected the credential")]
    Unauthorized,

    #[error("'{0}' is not a valid document location")]
    InvalidLocator(DocumentLocator),

    #[error("Document '{locator}' changed since version {}", .expected.as_ref().map_or("<none>", VersionToken::as_str))]
    VersionConflict {
        locator: DocumentLocator,
        expected: Option<VersionToken>,
    },

    #[error("Document store unavailable: {0}")]
    Transient(String),

    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A versioned blob store with compare-and-swap writes.
///
/// `read` returns the current content and its version. `write` succeeds only
/// when the stored version still equals `expected`; `expected == None` means
/// the document must not exist yet. Implementations never retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError>;

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
        (**self).read(locator).await
    }

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        (**self).write(locator, content, expected, message).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
        (**self).read(locator).await
    }

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        (**self).write(locator, content, expected, message).await
    }
}
