use serde_json::to_string_pretty;
use thiserror::Error;

use crate::models::project::Project;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Document is not valid UTF-8: {source}")]
    NotUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Failed to parse project list: {source}")]
    ParseFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize project list: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes the stored document: a UTF-8 JSON array of projects
pub fn decode_projects(content: &[u8]) -> Result<Vec<Project>, CodecError> {
    let text = std::str::from_utf8(content).map_err(|e| CodecError::NotUtf8 { source: e })?;
    // Stores may hand back a BOM-prefixed blob
    let text = text.trim_start_matches('\u{feff}');
    serde_json::from_str(text).map_err(|e| CodecError::ParseFailed { source: e })
}

/// Pretty-printed with a trailing newline so diffs between revisions stay small
pub fn encode_projects(projects: &[Project]) -> Result<Vec<u8>, CodecError> {
    let mut json =
        to_string_pretty(projects).map_err(|e| CodecError::SerializeFailed { source: e })?;
    json.push('\n');
    Ok(json.into_bytes())
}
