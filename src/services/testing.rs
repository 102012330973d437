//! In-memory backend for service and session tests.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::errors::AppError;
use crate::models::bulk::{BulkAction, BulkOutcome};
use crate::models::dashboard::DashboardSpec;
use crate::models::pagination::{ResultPage, Row};
use crate::models::query::QueryState;
use crate::models::selection::RowId;
use crate::services::client::ListBackend;

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub rows: Vec<Row>,
    pub fetch_delay: Mutex<Option<Duration>>,
    pub fail_next_fetch: Mutex<Option<AppError>>,
    pub bulk_result: Mutex<Option<Result<BulkOutcome, AppError>>>,
    pub export_result: Mutex<Option<Result<Vec<u8>, AppError>>>,
    pub fetches: Mutex<Vec<QueryState>>,
    pub bulk_calls: Mutex<Vec<(String, Vec<RowId>)>>,
    pub status_calls: Mutex<Vec<(RowId, String)>>,
}

impl FakeBackend {
    /// `count` rows with ids `1..=count` named `member-<id>`.
    pub fn with_rows(count: i64) -> Self {
        let rows = (1..=count)
            .map(|id| {
                serde_json::from_value(json!({"id": id, "name": format!("member-{id}")}))
                    .expect("row fixture")
            })
            .collect();
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn last_fetch(&self) -> Option<QueryState> {
        self.fetches.lock().unwrap().last().cloned()
    }
}

impl ListBackend for FakeBackend {
    async fn fetch_page(
        &self,
        _spec: &DashboardSpec,
        query: &QueryState,
    ) -> Result<ResultPage, AppError> {
        self.fetches.lock().unwrap().push(query.clone());
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.fail_next_fetch.lock().unwrap().take() {
            return Err(err);
        }
        let matching: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| row.text("name").contains(query.search()))
            .cloned()
            .collect();
        let per_page = query.per_page() as usize;
        let start = (query.page() as usize - 1) * per_page;
        let rows = matching.iter().skip(start).take(per_page).cloned().collect();
        Ok(ResultPage::new(
            rows,
            matching.len() as u64,
            query.page(),
            query.per_page(),
        ))
    }

    async fn bulk_action(&self, action: &BulkAction, ids: &[RowId]) -> Result<BulkOutcome, AppError> {
        self.bulk_calls
            .lock()
            .unwrap()
            .push((action.name.clone(), ids.to_vec()));
        let scripted = self.bulk_result.lock().unwrap().take();
        scripted.unwrap_or_else(|| {
            Ok(BulkOutcome {
                requested: ids.len(),
                affected: ids.len(),
                failed: 0,
                errors: Vec::new(),
            })
        })
    }

    async fn export(&self, _spec: &DashboardSpec, _query: &QueryState) -> Result<Vec<u8>, AppError> {
        let scripted = self.export_result.lock().unwrap().take();
        scripted.unwrap_or_else(|| Ok(b"PK\x03\x04fake-xlsx".to_vec()))
    }

    async fn update_status(
        &self,
        _spec: &DashboardSpec,
        id: &RowId,
        status: &str,
    ) -> Result<(), AppError> {
        self.status_calls
            .lock()
            .unwrap()
            .push((id.clone(), status.to_string()));
        Ok(())
    }
}
