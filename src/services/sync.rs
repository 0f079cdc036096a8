use thiserror::Error;
use tracing::{info, warn};

use crate::{
    models::{project::Project, repository::ProjectRepository},
    storage::{
        DocumentLocator, DocumentStore, StoreError, VersionToken,
        json::{CodecError, decode_projects, encode_projects},
    },
};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No project document exists at '{0}' yet")]
    DocumentMissing(DocumentLocator),

    #[error(
        "The document was changed by someone else since it was loaded. Reload and apply your edit again."
    )]
    VersionConflict,

    #[error("The credential was rejected. Check the token in the settings.")]
    Unauthorized,

    #[error("'{0}' is not a valid document location. Check the settings.")]
    InvalidLocation(DocumentLocator),

    #[error("Document store unavailable: {0}")]
    Transient(String),

    #[error("Project document is unusable: {0}")]
    Codec(#[from] CodecError),
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(locator) => SyncError::DocumentMissing(locator),
            StoreError::VersionConflict { .. } => SyncError::VersionConflict,
            StoreError::Unauthorized => SyncError::Unauthorized,
            StoreError::InvalidLocator(locator) => SyncError::InvalidLocation(locator),
            StoreError::Transient(message) => SyncError::Transient(message),
            io @ StoreError::Io { .. } => SyncError::Transient(io.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user about the outcome of a sync operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl SyncError {
    pub fn notice(&self) -> Notice {
        let level = match self {
            SyncError::DocumentMissing(_) | SyncError::VersionConflict => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Notice::new(level, self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Ready,
    Saving,
}

/// Read-modify-write cycles of the project document.
///
/// Holds the version token of the last successful read or write and presents
/// it as the precondition of the next write. A stale token is reported as
/// [`SyncError::VersionConflict`]; nothing is retried or merged.
pub struct SyncCoordinator<S> {
    store: S,
    locator: DocumentLocator,
    version: Option<VersionToken>,
    state: SyncState,
}

impl<S: DocumentStore> SyncCoordinator<S> {
    pub fn new(store: S, locator: DocumentLocator) -> Self {
        Self {
            store,
            locator,
            version: None,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    pub fn locator(&self) -> &DocumentLocator {
        &self.locator
    }

    /// Replaces the repository contents with the stored document.
    ///
    /// On any failure the repository and the version token are left as they
    /// were. A missing document is [`SyncError::DocumentMissing`], never an
    /// empty list.
    pub async fn load(&mut self, repository: &mut ProjectRepository) -> Result<Notice, SyncError> {
        let previous = self.state;
        self.state = SyncState::Loading;

        match self.fetch().await {
            Ok((projects, version)) => {
                let count = projects.len();
                repository.replace_all(projects);
                info!(locator = %self.locator, %version, count, "document loaded");
                self.version = Some(version);
                self.state = SyncState::Ready;
                Ok(Notice::new(
                    NoticeLevel::Success,
                    format!("Loaded {count} projects"),
                ))
            }
            Err(e) => {
                warn!(locator = %self.locator, error = %e, "document load failed");
                self.state = previous;
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<(Vec<Project>, VersionToken), SyncError> {
        let document = self.store.read(&self.locator).await?;
        let projects = decode_projects(&document.content)?;
        Ok((projects, document.version))
    }

    /// Writes the whole repository with the last known version as precondition,
    /// then reloads so the repository reflects what the store holds.
    ///
    /// Without a known version the write creates the document, which is how a
    /// caller initializes storage after [`SyncError::DocumentMissing`].
    pub async fn save(&mut self, repository: &mut ProjectRepository) -> Result<Notice, SyncError> {
        let content = encode_projects(repository.projects())?;
        let message = format!(
            "Update projects via pm-tracker - {}",
            jiff::Timestamp::now()
        );

        let previous = self.state;
        self.state = SyncState::Saving;

        let written = self
            .store
            .write(&self.locator, content, self.version.as_ref(), &message)
            .await;

        match written {
            Ok(version) => {
                info!(locator = %self.locator, %version, "document saved");
                self.version = Some(version);
                self.state = SyncState::Ready;
                self.load(repository).await?;
                Ok(Notice::new(NoticeLevel::Success, "Projects saved"))
            }
            Err(e) => {
                let e = SyncError::from(e);
                warn!(locator = %self.locator, error = %e, "document save failed");
                self.state = previous;
                Err(e)
            }
        }
    }
}
