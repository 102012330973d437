//! REST backend boundary: the `ListBackend` seam and its `reqwest` client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, Url};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{self, AppError};
use crate::middleware::auth::BearerToken;
use crate::models::bulk::{BulkAction, BulkOutcome, BulkResponse, HttpVerb};
use crate::models::dashboard::DashboardSpec;
use crate::models::pagination::{self, ResultPage};
use crate::models::query::QueryState;
use crate::models::selection::RowId;
use crate::services::request;
use crate::storage::ClientStorage;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything a dashboard needs from the backend.
pub trait ListBackend: Send + Sync + 'static {
    fn fetch_page(
        &self,
        spec: &DashboardSpec,
        query: &QueryState,
    ) -> impl Future<Output = Result<ResultPage, AppError>> + Send;

    fn bulk_action(
        &self,
        action: &BulkAction,
        ids: &[RowId],
    ) -> impl Future<Output = Result<BulkOutcome, AppError>> + Send;

    /// Spreadsheet bytes for the current filters, fully buffered.
    fn export(
        &self,
        spec: &DashboardSpec,
        query: &QueryState,
    ) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;

    fn update_status(
        &self,
        spec: &DashboardSpec,
        id: &RowId,
        status: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// HTTP implementation of [`ListBackend`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
    storage: Arc<dyn ClientStorage>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, storage: Arc<dyn ClientStorage>) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url()?,
            timeout: config.request_timeout(),
            storage,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn token(&self) -> Result<BearerToken, AppError> {
        BearerToken::from_storage(self.storage.as_ref())
    }

    async fn send(
        &self,
        token: &BearerToken,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, AppError> {
        let request_id = Uuid::now_v7();
        let response = token
            .authorize(request)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout.as_secs())
                } else {
                    AppError::Transport(e)
                }
            })?;
        let status = response.status();
        tracing::debug!(%request_id, url = %response.url(), status = status.as_u16(), "Backend responded");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = errors::extract_message(&body).unwrap_or_default();
        Err(AppError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

impl ListBackend for ApiClient {
    async fn fetch_page(
        &self,
        spec: &DashboardSpec,
        query: &QueryState,
    ) -> Result<ResultPage, AppError> {
        let token = self.token()?;
        let url = request::list_url(&self.base_url, spec, query)?;
        let response = self.send(&token, self.http.get(url)).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Decode(e.to_string()))?;
        pagination::normalize(body, spec, query.page())
    }

    async fn bulk_action(&self, action: &BulkAction, ids: &[RowId]) -> Result<BulkOutcome, AppError> {
        let token = self.token()?;
        let url = request::bulk_url(&self.base_url, &action.endpoint)?;
        let builder = match action.verb {
            HttpVerb::Post => self.http.post(url),
            HttpVerb::Patch => self.http.patch(url),
            HttpVerb::Put => self.http.put(url),
        };
        let response = self.send(&token, builder.json(&action.body(ids))).await?;
        let text = response.text().await?;
        let parsed = if text.trim().is_empty() {
            BulkResponse::default()
        } else {
            // Bodies that are not a count report (e.g. the updated rows) mean full success.
            serde_json::from_str(&text).unwrap_or_default()
        };
        Ok(BulkOutcome::from_response(ids.len(), parsed))
    }

    async fn export(&self, spec: &DashboardSpec, query: &QueryState) -> Result<Vec<u8>, AppError> {
        let token = self.token()?;
        let url = request::export_url(&self.base_url, spec, query)?;
        let response = self.send(&token, self.http.get(url)).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn update_status(
        &self,
        spec: &DashboardSpec,
        id: &RowId,
        status: &str,
    ) -> Result<(), AppError> {
        let token = self.token()?;
        let url = request::status_update_url(&self.base_url, spec, id, status)?;
        self.send(&token, self.http.put(url)).await?;
        Ok(())
    }
}
