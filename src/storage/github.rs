use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{DocumentLocator, DocumentStore, StoreError, VersionToken, VersionedDocument};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Document store backed by the GitHub repository contents API.
///
/// The version token is the blob SHA GitHub reports for the file.
pub struct GitHubStore {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct UpdateResponse {
    content: UpdatedContent,
}

#[derive(Deserialize)]
struct UpdatedContent {
    sha: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GitHubStore {
    pub fn new(token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pm-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn contents_url(&self, locator: &DocumentLocator) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            locator.owner,
            locator.repo,
            locator.path.trim_start_matches('/')
        )
    }
}

/// Best-effort extraction of GitHub's `{"message": ...}` error body
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);
    format!("GitHub error ({status}): {message}")
}

fn transient(e: reqwest::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

#[async_trait]
impl DocumentStore for GitHubStore {
    async fn read(&self, locator: &DocumentLocator) -> Result<VersionedDocument, StoreError> {
        let url = self.contents_url(locator);
        let cache_buster = jiff::Timestamp::now().as_millisecond().to_string();
        debug!(%url, "fetching document");

        let response = self
            .client
            .get(&url)
            .query(&[("t", cache_buster.as_str())])
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(transient)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(locator.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::Unauthorized);
            }
            _ => return Err(StoreError::Transient(error_message(response).await)),
        }

        let contents: ContentsResponse = response.json().await.map_err(transient)?;

        // GitHub wraps base64 payloads at 60 columns
        let encoded: String = contents
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let content = STANDARD
            .decode(encoded)
            .map_err(|e| StoreError::Transient(format!("Invalid base64 content: {e}")))?;

        Ok(VersionedDocument {
            content,
            version: VersionToken::new(contents.sha),
        })
    }

    async fn write(
        &self,
        locator: &DocumentLocator,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let url = self.contents_url(locator);
        let body = UpdateRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected.map(VersionToken::as_str),
        };
        debug!(%url, "updating document");

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await
            .map_err(transient)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                let reason = error_message(response).await;
                warn!(%url, %reason, "write precondition failed");
                return Err(StoreError::VersionConflict {
                    locator: locator.clone(),
                    expected: expected.cloned(),
                });
            }
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(locator.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::Unauthorized);
            }
            _ => return Err(StoreError::Transient(error_message(response).await)),
        }

        let updated: UpdateResponse = response.json().await.map_err(transient)?;
        Ok(VersionToken::new(updated.content.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn locator() -> DocumentLocator {
        DocumentLocator::new("acme", "plans", "data/projects.json")
    }

    const CONTENTS_PATH: &str = "/repos/acme/plans/contents/data/projects.json";

    #[tokio::test]
    async fn test_read_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        // "[]\n" split across lines the way GitHub returns it
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc123",
                "content": "W10\nK\n",
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let store = GitHubStore::with_api_url(server.uri(), "secret").unwrap();
        let document = store.read(&locator()).await.unwrap();

        assert_eq!(document.content, b"[]\n".to_vec());
        assert_eq!(document.version.as_str(), "abc123");
    }

    #[tokio::test]
    async fn test_read_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/plans/contents/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/plans/contents/private.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/plans/contents/flaky.json"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let store = GitHubStore::with_api_url(server.uri(), "secret").unwrap();

        let missing = store
            .read(&DocumentLocator::new("acme", "plans", "missing.json"))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        let private = store
            .read(&DocumentLocator::new("acme", "plans", "private.json"))
            .await;
        assert!(matches!(private, Err(StoreError::Unauthorized)));

        let flaky = store
            .read(&DocumentLocator::new("acme", "plans", "flaky.json"))
            .await;
        assert!(matches!(flaky, Err(StoreError::Transient(_))));
    }

    #[tokio::test]
    async fn test_write_sends_sha_precondition() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS_PATH))
            .and(body_partial_json(serde_json::json!({
                "sha": "abc123",
                "content": "W10=",
                "message": "Update projects"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": { "sha": "def456" }
            })))
            .mount(&server)
            .await;

        let store = GitHubStore::with_api_url(server.uri(), "secret").unwrap();
        let version = store
            .write(
                &locator(),
                b"[]".to_vec(),
                Some(&VersionToken::new("abc123")),
                "Update projects",
            )
            .await
            .unwrap();

        assert_eq!(version.as_str(), "def456");
    }

    #[tokio::test]
    async fn test_write_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "message": "data/projects.json does not match abc123"
            })))
            .mount(&server)
            .await;

        let store = GitHubStore::with_api_url(server.uri(), "secret").unwrap();
        let result = store
            .write(
                &locator(),
                b"[]".to_vec(),
                Some(&VersionToken::new("abc123")),
                "Update projects",
            )
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_create_omits_sha() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS_PATH))
            .and(|request: &Request| {
                serde_json::from_slice::<serde_json::Value>(&request.body)
                    .map(|body| body.get("sha").is_none())
                    .unwrap_or(false)
            })
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "content": { "sha": "first" }
            })))
            .mount(&server)
            .await;

        let store = GitHubStore::with_api_url(server.uri(), "secret").unwrap();
        let version = store
            .write(&locator(), b"[]".to_vec(), None, "Create projects")
            .await
            .unwrap();

        assert_eq!(version.as_str(), "first");
    }
}
