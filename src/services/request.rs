//! Serialization of query state into backend URLs.

use reqwest::Url;

use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::query::{Predicate, QueryState};
use crate::models::selection::RowId;

/// Representation requested from a list resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xlsx,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Filter and search parameters, without paging.
pub fn filter_params(spec: &DashboardSpec, query: &QueryState) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (key, value) in query.filters() {
        let name = match key.predicate() {
            Predicate::In => format!("{}[]", key.param_name()),
            _ => key.param_name(),
        };
        for v in value.to_params() {
            params.push((name.clone(), v));
        }
    }
    if !query.search().is_empty() {
        if let Some(name) = spec.search_param() {
            params.push((name, query.search().to_string()));
        }
    }
    params
}

/// Full parameter list for a list fetch: filters, search, `page`, `per_page`.
pub fn list_params(spec: &DashboardSpec, query: &QueryState) -> Vec<(String, String)> {
    let mut params = filter_params(spec, query);
    params.push(("page".to_string(), query.page().to_string()));
    params.push(("per_page".to_string(), query.per_page().to_string()));
    params
}

fn resource_url(base: &Url, path: &str) -> Result<Url, AppError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AppError::Config(format!("bad resource path {path:?}: {e}")))
}

/// `GET <resource>.json?...&page=<n>&per_page=<m>`
pub fn list_url(base: &Url, spec: &DashboardSpec, query: &QueryState) -> Result<Url, AppError> {
    let mut url = resource_url(base, &format!("{}.{}", spec.resource, Format::Json.extension()))?;
    url.query_pairs_mut().extend_pairs(list_params(spec, query));
    Ok(url)
}

/// `GET <resource>.xlsx?<same filters>`
pub fn export_url(base: &Url, spec: &DashboardSpec, query: &QueryState) -> Result<Url, AppError> {
    let mut url = resource_url(base, &format!("{}.{}", spec.resource, Format::Xlsx.extension()))?;
    let params = filter_params(spec, query);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// `PUT <resource>/status_update?id=<id>&status=<value>`
pub fn status_update_url(
    base: &Url,
    spec: &DashboardSpec,
    id: &RowId,
    status: &str,
) -> Result<Url, AppError> {
    let mut url = resource_url(base, &format!("{}/status_update", spec.resource))?;
    url.query_pairs_mut()
        .append_pair("id", &id.to_string())
        .append_pair("status", status);
    Ok(url)
}

pub fn bulk_url(base: &Url, endpoint: &str) -> Result<Url, AppError> {
    resource_url(base, endpoint)
}
