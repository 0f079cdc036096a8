use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::storage::{DocumentLocator, DocumentStore, StoreError, VersionToken, VersionedDocument};

/// In-process document store.
///
/// Versions are counters exposed as `v1`, `v2`, ... Clones share the same
/// documents, so several coordinators can contend on one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentLocator, StoredDocument>>>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    content: Vec<u8>,
    version: u64,
}

fn token(version: u64) -> VersionToken {
    VersionToken::new(format!("v{version}"))
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `content` at version `v1`
    pub fn with_document(locator: DocumentLocator, content: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        if let Ok(mut documents) = store.documents.write() {
            documents.insert(
                locator,
                StoredDocument {
                    content: content.into(),
                    version: 1,
                },
            );
        }
        store
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::Transient("lock poisoned".to_string()))?;

        documents
            .get(locator)
            .map(|doc| VersionedDocument {
                content: doc.content.clone(),
                version: token(doc.version),
            })
            .ok_or_else(|| StoreError::NotFound(locator.clone()))
    }

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        _message: &str,
    ) -> Result<VersionToken, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::Transient("lock poisoned".to_string()))?;

        let current = documents.get(locator).map(|doc| doc.version);
        if current.map(token).as_ref() != expected {
            return Err(StoreError::VersionConflict {
                locator: locator.clone(),
                expected: expected.cloned(),
            });
        }

        let version = current.map_or(1, |v| v + 1);
        documents.insert(locator.clone(), StoredDocument { content, version });

        Ok(token(version))
    }
}
