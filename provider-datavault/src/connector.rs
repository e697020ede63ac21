//! Data-vault API connector implementation
//!
//! Implements `VaultGateway` over the vault's REST API. Authentication is a
//! vault-issued API token in a custom header; every request is scoped to
//! one vault id.

use async_trait::async_trait;
use base64::Engine;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::vault::{
    MappingTemplate, ProtocolDef, ProtocolRuns, SlurpJob, SlurpRequest, VaultGateway,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::DataVaultError;
use crate::types::{MappingTemplateResp, ProtocolLookupPage, RecentRunsPage, SlurpResp};

/// Authentication header carrying the vault API token.
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Page size for the recent-runs listing.
const RUNS_PAGE_SIZE: u32 = 1000;

/// Retry attempts for rate-limited and server-error responses.
const MAX_RETRIES: u32 = 3;

/// Data-vault API connector
pub struct DataVaultConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    vault_id: String,
    api_token: String,
}

impl DataVaultConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        vault_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            vault_id: vault_id.into(),
            api_token: api_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.vault_id, path)
    }

    /// Execute an API request with retry on 429/5xx and transport errors.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
    ) -> crate::error::Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let attempt_request = request.clone().header(TOKEN_HEADER, &self.api_token);
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
                            return Err(DataVaultError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", MAX_RETRIES),
                            });
                        }
                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(status, attempt, backoff_ms, "retryable API failure");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        return Err(DataVaultError::ApiError {
                            status_code: status,
                            message: String::from_utf8_lossy(&response.body).to_string(),
                        });
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!(attempts = MAX_RETRIES, "API request exhausted retries: {}", e);
                        return Err(DataVaultError::NetworkError(e.to_string()));
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(attempt, backoff_ms, "transport failure, retrying: {}", e);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl VaultGateway for DataVaultConnector {
    #[instrument(skip(self))]
    async fn get_mapping_template(&self, mapping_template_id: &str) -> Result<MappingTemplate> {
        let url = self.url(&format!(
            "mapping_templates/{}",
            urlencoding::encode(mapping_template_id)
        ));

        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let template: MappingTemplateResp = response.json()?;

        Ok(MappingTemplate {
            id: template.id.to_string(),
            header_mappings: template.header_mappings,
        })
    }

    #[instrument(skip(self))]
    async fn get_protocol(&self, name: &str) -> Result<ProtocolDef> {
        let url = format!(
            "{}?names={}",
            self.url("protocols"),
            urlencoding::encode(name)
        );

        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let page: ProtocolLookupPage = response.json()?;

        if page.count != 1 {
            return Err(DataVaultError::AmbiguousProtocol {
                name: name.to_string(),
                count: page.count,
            }
            .into());
        }
        page.objects.into_iter().next().ok_or_else(|| {
            DataVaultError::ParseError(format!(
                "protocol page for '{}' reported count 1 but carried no objects",
                name
            ))
            .into()
        })
    }

    #[instrument(skip(self, request), fields(file_name = %request.file_name))]
    async fn submit_slurp(&self, request: SlurpRequest) -> Result<u64> {
        let body = json!({
            "project": request.project,
            "autoreject": request.autoreject,
            "mapping_template": request.mapping_template_id,
            "runs": { "conditions": request.correlation_id },
            "file_name": request.file_name,
            "csv": request.csv,
        });

        let http_request = HttpRequest::post(self.url("slurps")).json(&body)?;
        let response = self
            .execute_with_retry(http_request)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let slurp: SlurpResp = response.json()?;

        info!(slurp_id = slurp.id, "submitted slurp");
        Ok(slurp.id)
    }

    async fn slurp_status(&self, slurp_id: u64) -> Result<SlurpJob> {
        let url = self.url(&format!("slurps/{}", slurp_id));
        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let slurp: SlurpResp = response.json()?;
        Ok(SlurpJob {
            id: slurp.id,
            state: slurp.state,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_slurp(&self, slurp_id: u64) -> Result<()> {
        let url = self.url(&format!("slurps/{}", slurp_id));
        self.execute_with_retry(HttpRequest::delete(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        info!(slurp_id, "slurp cancelled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_recent_runs(&self, modified_after: DateTime<Utc>) -> Result<Vec<ProtocolRuns>> {
        let url = format!(
            "{}?runs_modified_after={}&page_size={}",
            self.url("protocols"),
            urlencoding::encode(&modified_after.to_rfc3339()),
            RUNS_PAGE_SIZE
        );

        let response = self
            .execute_with_retry(HttpRequest::get(url))
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        let page: RecentRunsPage = response.json()?;

        Ok(page
            .objects
            .into_iter()
            .map(|protocol| ProtocolRuns {
                protocol_name: protocol.name,
                runs: protocol.runs.into_iter().map(Into::into).collect(),
            })
            .collect())
    }

    #[instrument(skip(self, fields))]
    async fn set_run_fields(&self, run_id: u64, fields: serde_json::Value) -> Result<()> {
        let url = self.url(&format!("runs/{}", run_id));
        let request = HttpRequest::put(url).json(&fields)?;
        self.execute_with_retry(request)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        Ok(())
    }

    #[instrument(skip(self, content), fields(file_name = %file_name))]
    async fn attach_run_file(&self, run_id: u64, file_name: &str, content: Bytes) -> Result<()> {
        let body = json!({
            "resource_class": "run",
            "resource_id": run_id,
            "file_name": file_name,
            "content": base64::engine::general_purpose::STANDARD.encode(&content),
        });

        let request = HttpRequest::post(self.url("files")).json(&body)?;
        self.execute_with_retry(request)
            .await
            .map_err(bridge_traits::error::BridgeError::from)?;
        info!(run_id, "attached file to run");
        Ok(())
    }
}
