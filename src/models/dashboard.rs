//! Per-dashboard configuration of the list controller.

use std::time::Duration;

use crate::models::bulk::BulkAction;

/// Everything that differs between two list dashboards.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSpec {
    /// Stable identifier, also the storage key prefix.
    pub name: String,
    pub title: String,
    /// Resource path relative to the API base, without extension.
    pub resource: String,
    pub per_page: u32,
    /// Fields OR-combined into the `_cont` search predicate.
    pub search_fields: Vec<String>,
    /// Key holding the rows array; detected when `None`.
    pub rows_key: Option<String>,
    /// Top-level count spellings used when no pagination object is sent.
    pub count_aliases: Vec<String>,
    pub id_field: String,
    /// Columns shown by text renderers.
    pub columns: Vec<String>,
    pub empty_message: String,
    /// Overrides the configured search debounce.
    pub debounce: Option<Duration>,
    pub bulk_actions: Vec<BulkAction>,
    /// Values accepted by the status-update endpoint; empty means unchecked.
    pub statuses: Vec<String>,
}

impl DashboardSpec {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        resource: impl Into<String>,
        per_page: u32,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            resource: resource.into(),
            per_page: per_page.max(1),
            search_fields: Vec::new(),
            rows_key: None,
            count_aliases: Vec::new(),
            id_field: "id".to_string(),
            columns: vec!["id".to_string()],
            empty_message: "No records found".to_string(),
            debounce: None,
            bulk_actions: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Storage key under which the last viewed page is persisted.
    pub fn page_storage_key(&self) -> String {
        format!("{}_currentPage", self.name)
    }

    /// Query parameter name for the combined search predicate, e.g.
    /// `q[name_or_email_or_mobile_cont]`.
    pub fn search_param(&self) -> Option<String> {
        if self.search_fields.is_empty() {
            return None;
        }
        Some(format!("q[{}_cont]", self.search_fields.join("_or_")))
    }

    pub fn bulk_action(&self, name: &str) -> Option<&BulkAction> {
        self.bulk_actions.iter().find(|a| a.name == name)
    }

    pub fn debounce_or(&self, default: Duration) -> Duration {
        self.debounce.unwrap_or(default)
    }
}
