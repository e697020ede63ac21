//! File-cloud API connector implementation
//!
//! Implements the `ChangeFeed`, `MetadataStore` and `FileStore` traits over
//! the public filesystem and events REST API.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::events::{ChangeEvent, ChangeFeed, EventAction};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::{CorrelatedFile, FileEntry, FileStore, MetadataStore};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::FileCloudError;
use crate::types::{Event, EventsCursor, EventsPage, FsEntry, SearchPage};

/// Fixed delay inserted before every API request. The public API enforces a
/// per-second quota; pacing requests is cheaper than handling the 429s.
const DEFAULT_REQUEST_PACE: Duration = Duration::from_secs(1);

/// Retry attempts for rate-limited and server-error responses.
const MAX_RETRIES: u32 = 3;

/// File-cloud API connector
///
/// One connector instance covers all three storage seams of the pipeline:
/// the change-event feed, entry metadata with custom-metadata sections, and
/// raw content download. Requests are paced at a fixed interval and retried
/// with exponential backoff on 429/5xx.
pub struct FileCloudConnector {
    http_client: Arc<dyn HttpClient>,
    domain: String,
    access_token: String,
    pace: Duration,
    /// Custom-metadata namespace searched by `find_by_correlation`.
    namespace: String,
    /// Property key inside the namespace carrying the correlation id.
    correlation_key: String,
}

impl FileCloudConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        domain: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            domain: domain.into(),
            access_token: access_token.into(),
            pace: DEFAULT_REQUEST_PACE,
            namespace: "vault".to_string(),
            correlation_key: "correlation id".to_string(),
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Point correlation search at a different namespace/key pair.
    pub fn with_correlation_section(
        mut self,
        namespace: impl Into<String>,
        correlation_key: impl Into<String>,
    ) -> Self {
        self.namespace = namespace.into();
        self.correlation_key = correlation_key.into();
        self
    }

    /// Percent-encode a filesystem path, keeping the separators.
    fn encode_path(path: &str) -> String {
        path.split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn api_url(&self, suffix: &str) -> String {
        format!("https://{}/pubapi/v1/{}", self.domain, suffix)
    }

    fn convert_entry(entry: FsEntry) -> FileEntry {
        let custom_metadata = entry.sections();
        FileEntry {
            path: entry.path,
            name: entry.name,
            entry_id: entry.entry_id,
            group_id: entry.group_id,
            is_folder: entry.is_folder,
            custom_metadata,
        }
    }

    fn convert_event(event: Event) -> ChangeEvent {
        let action = match event.action.as_str() {
            "create" => EventAction::Create,
            "move" => EventAction::Move,
            "copy" => EventAction::Copy,
            _ => EventAction::Other,
        };
        ChangeEvent {
            id: event.id,
            action,
            target_path: event.data.target_path,
            is_folder: event.data.is_folder,
        }
    }

    /// Execute a paced API request with retry on 429/5xx and transport
    /// errors. Non-retryable statuses surface as `ApiError`.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
    ) -> crate::error::Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            tokio::time::sleep(self.pace).await;

            let attempt_request = request.clone().bearer_token(&self.access_token);
            match self.http_client.execute(attempt_request).await {
                Ok(response) => {
                    let status = response.status;

                    if response.is_success() {
                        debug!(status, "API request succeeded");
                        return Ok(response);
                    } else if status == 429 || response.is_server_error() {
                        attempt += 1;
                        if attempt >= MAX_RETRIES {
                            warn!(status, attempts = MAX_RETRIES, "API request exhausted retries");
                            return Err(FileCloudError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", MAX_RETRIES),
                            });
                        }
                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(status, attempt, backoff_ms, "retryable API failure");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        return Err(FileCloudError::ApiError {
                            status_code: status,
                            message: String::from_utf8_lossy(&response.body).to_string(),
                        });
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!(attempts = MAX_RETRIES, "API request exhausted retries: {}", e);
                        return Err(FileCloudError::NetworkError(e.to_string()));
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(attempt, backoff_ms, "transport failure, retrying: {}", e);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn events_cursor(&self, folder: &str) -> crate::error::Result<EventsCursor> {
        let url = format!(
            "{}?folder={}",
            self.api_url("events/cursor"),
            urlencoding::encode(folder)
        );
        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await?;
        let cursor: EventsCursor = response
            .json()
            .map_err(|e| FileCloudError::ParseError(e.to_string()))?;
        Ok(cursor)
    }
}

#[async_trait]
impl ChangeFeed for FileCloudConnector {
    #[instrument(skip(self))]
    async fn list_events(
        &self,
        folder: &str,
        since_id: u64,
        count: u32,
    ) -> Result<Vec<ChangeEvent>> {
        let url = format!(
            "{}?folder={}&id={}&count={}&suppress=user",
            self.api_url("events"),
            urlencoding::encode(folder),
            since_id,
            count
        );

        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let page: EventsPage = response.json()?;

        let events: Vec<ChangeEvent> = page.results.into_iter().map(Self::convert_event).collect();
        debug!(count = events.len(), since_id, "listed change events");
        Ok(events)
    }

    async fn latest_event_id(&self, folder: &str) -> Result<u64> {
        let cursor = self
            .events_cursor(folder)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        Ok(cursor.latest_event_id)
    }

    async fn oldest_event_id(&self, folder: &str) -> Result<u64> {
        let cursor = self
            .events_cursor(folder)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        Ok(cursor.oldest_event_id)
    }
}

#[async_trait]
impl MetadataStore for FileCloudConnector {
    #[instrument(skip(self), fields(path = %path))]
    async fn get_metadata(&self, path: &str) -> Result<Option<FileEntry>> {
        let url = format!(
            "{}{}?list_custom_metadata=true",
            self.api_url("fs"),
            Self::encode_path(path)
        );

        match self
            .execute_with_retry(HttpRequest::get(url))
            .await
        {
            Ok(response) => {
                let entry: FsEntry = response.json()?;
                Ok(Some(Self::convert_entry(entry)))
            }
            // The entry vanished between the event and the lookup.
            Err(FileCloudError::ApiError {
                status_code: 404, ..
            }) => {
                debug!(path, "entry not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, data), fields(group_id = %group_id, namespace = %namespace))]
    async fn set_metadata(
        &self,
        group_id: &str,
        namespace: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        let url = self.api_url(&format!(
            "fs/ids/file/{}/properties/{}",
            urlencoding::encode(group_id),
            urlencoding::encode(namespace)
        ));

        let request = HttpRequest::post(url).json(&data)?;
        self.execute_with_retry(request)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        info!(group_id, "custom metadata written");
        Ok(())
    }
}

#[async_trait]
impl FileStore for FileCloudConnector {
    #[instrument(skip(self), fields(path = %path))]
    async fn download(&self, path: &str) -> Result<Bytes> {
        let url = format!("{}{}", self.api_url("fs-content"), Self::encode_path(path));

        let response = self
            .execute_with_retry(
                HttpRequest::get(url).timeout(Duration::from_secs(60)),
            )
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;

        info!(bytes = response.body.len(), "downloaded file");
        Ok(response.body)
    }

    #[instrument(skip(self))]
    async fn find_by_correlation(&self, correlation_id: &str) -> Result<Vec<CorrelatedFile>> {
        let url = format!("https://{}/pubapi/v2/search", self.domain);
        let body = json!({
            "type": "FILE",
            "custom_metadata": {
                "namespace": self.namespace,
                "key": self.correlation_key,
                "value": correlation_id,
            }
        });

        let request = HttpRequest::post(url).json(&body)?;
        let response = self
            .execute_with_retry(request)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let page: SearchPage = response.json()?;

        let mut files = Vec::with_capacity(page.results.len());
        for hit in page.results {
            let content = self.download(&hit.path).await?;
            files.push(CorrelatedFile {
                name: hit.name,
                group_id: hit.group_id,
                content,
            });
        }

        info!(correlation_id, files = files.len(), "resolved correlated files");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpMethod;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedHttp {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<HttpResponse>>,
    }

    impl ScriptedHttp {
        fn new(responses: Vec<HttpResponse>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }

        fn response(status: u16, body: &str) -> HttpResponse {
            HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::copy_from_slice(body.as_bytes()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| bridge_traits::error::BridgeError::OperationFailed(
                    "no scripted response".to_string(),
                ))
        }
    }

    fn connector(http: Arc<ScriptedHttp>) -> FileCloudConnector {
        FileCloudConnector::new(http, "files.example.com", "tok")
            .with_pace(Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_list_events_converts_actions() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(
            200,
            r#"{"results": [
                {"id": 5, "action": "create", "data": {"target_path": "/Shared/a.csv", "is_folder": false}},
                {"id": 6, "action": "rename", "data": {"target_path": "/Shared/b.csv", "is_folder": false}}
            ]}"#,
        )]));

        let events = connector(http.clone())
            .list_events("/Shared", 4, 100)
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Create);
        assert_eq!(events[1].action, EventAction::Other);

        let requests = http.requests.lock().unwrap();
        assert!(requests[0].url.contains("id=4"));
        assert!(requests[0].url.contains("suppress=user"));
        assert_eq!(
            requests[0].headers.get("Authorization").unwrap(),
            "Bearer tok"
        );
    }

    #[tokio::test]
    async fn test_get_metadata_404_is_absence() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(
            404,
            "not found",
        )]));

        let entry = connector(http)
            .get_metadata("/Shared/assays/gone.xlsx")
            .await
            .unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_get_metadata_flattens_sections() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(
            200,
            r#"{
                "path": "/Shared/assays/plate1.xlsx",
                "name": "plate1.xlsx",
                "entry_id": "e-1",
                "group_id": "g-1",
                "is_folder": false,
                "custom_metadata": [{"vault": {"mapping template id": "mt-1"}}]
            }"#,
        )]));

        let entry = connector(http.clone())
            .get_metadata("/Shared/assays/plate1.xlsx")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.entry_id, "e-1");
        assert_eq!(
            entry.metadata_str("vault", "mapping template id"),
            Some("mt-1")
        );

        let requests = http.requests.lock().unwrap();
        assert!(requests[0].url.contains("list_custom_metadata=true"));
    }

    #[tokio::test]
    async fn test_path_segments_encoded() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(
            200,
            "payload",
        )]));

        connector(http.clone())
            .download("/Shared/assay runs/plate 1.xlsx")
            .await
            .unwrap();

        let requests = http.requests.lock().unwrap();
        assert!(requests[0]
            .url
            .ends_with("/fs-content/Shared/assay%20runs/plate%201.xlsx"));
    }

    #[tokio::test]
    async fn test_retry_on_server_error_then_success() {
        let http = Arc::new(ScriptedHttp::new(vec![
            ScriptedHttp::response(503, "unavailable"),
            ScriptedHttp::response(200, r#"{"oldest_event_id": 3, "latest_event_id": 9}"#),
        ]));

        let latest = connector(http.clone())
            .latest_event_id("/Shared")
            .await
            .unwrap();
        assert_eq!(latest, 9);
        assert_eq!(http.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(
            403,
            "forbidden",
        )]));

        let result = connector(http.clone()).latest_event_id("/Shared").await;
        assert!(result.is_err());
        assert_eq!(http.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_metadata_posts_section() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedHttp::response(200, "{}")]));

        connector(http.clone())
            .set_metadata("g-1", "vault", serde_json::json!({"status": "Processing"}))
            .await
            .unwrap();

        let requests = http.requests.lock().unwrap();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert!(requests[0].url.ends_with("/fs/ids/file/g-1/properties/vault"));
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["status"], "Processing");
    }
}
