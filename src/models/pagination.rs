//! Result pages and normalization of the backend's list envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::selection::RowId;

/// Keys tried, in order, when a dashboard does not name its rows key.
const ROW_KEYS: [&str; 3] = ["data", "items", "records"];

/// Opaque entity record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub Map<String, Value>);

impl Row {
    pub fn id(&self, id_field: &str) -> Option<RowId> {
        self.0.get(id_field).and_then(RowId::from_json)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Display text for a field; strings unquoted, missing fields empty.
    pub fn text(&self, field: &str) -> String {
        match self.0.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// One page of rows as last received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    pub rows: Vec<Row>,
    pub total_count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

impl ResultPage {
    /// `ceil(total_count / per_page)`.
    pub fn total_pages_for(total_count: u64, per_page: u32) -> u32 {
        let per_page = u64::from(per_page.max(1));
        let pages = total_count.div_ceil(per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn new(rows: Vec<Row>, total_count: u64, current_page: u32, per_page: u32) -> Self {
        let total_pages = Self::total_pages_for(total_count, per_page);
        Self {
            rows,
            total_count,
            total_pages,
            current_page,
            per_page,
            has_more: current_page < total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_ids(&self, id_field: &str) -> Vec<RowId> {
        self.rows.iter().filter_map(|row| row.id(id_field)).collect()
    }
}

/// Pagination metadata in whichever spelling the backend used.
#[derive(Debug, Clone, Default)]
pub struct PaginationMeta {
    pub current_page: Option<u32>,
    pub total_count: Option<u64>,
    pub total_pages: Option<u32>,
    pub next_page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Top-level list payload: either a bare array or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Bare(Vec<Map<String, Value>>),
    Wrapped(Map<String, Value>),
}

/// Normalize any supported list payload into a canonical [`ResultPage`].
///
/// `requested_page` fills in when the backend omits `current_page`.
pub fn normalize(
    body: Value,
    spec: &DashboardSpec,
    requested_page: u32,
) -> Result<ResultPage, AppError> {
    let envelope: ListEnvelope = serde_json::from_value(body)
        .map_err(|e| AppError::Decode(format!("list body is neither array nor object: {e}")))?;

    let (raw_rows, meta, object) = match envelope {
        ListEnvelope::Bare(rows) => (rows, PaginationMeta::default(), None),
        ListEnvelope::Wrapped(mut object) => {
            let rows = take_rows(&mut object, spec.rows_key.as_deref())?;
            let meta = read_meta(&object);
            (rows, meta, Some(object))
        }
    };

    let rows: Vec<Row> = raw_rows.into_iter().map(Row).collect();
    let per_page = meta.per_page.unwrap_or(spec.per_page).max(1);
    let current_page = meta.current_page.unwrap_or(requested_page).max(1);

    let alias_count = object.as_ref().and_then(|object| {
        spec.count_aliases
            .iter()
            .find_map(|alias| object.get(alias).and_then(Value::as_u64))
    });

    let total_count = meta.total_count.or(alias_count);
    let page = match (total_count, meta.total_pages) {
        (Some(count), Some(pages)) => ResultPage {
            has_more: meta.next_page.is_some() || current_page < pages,
            rows,
            total_count: count,
            total_pages: pages,
            current_page,
            per_page,
        },
        (Some(count), None) => {
            let mut page = ResultPage::new(rows, count, current_page, per_page);
            page.has_more |= meta.next_page.is_some();
            page
        }
        (None, _) => {
            // No count anywhere: the only signal is `next_page`.
            let has_more = meta.next_page.is_some();
            let seen = u64::from(current_page - 1) * u64::from(per_page) + rows.len() as u64;
            let total_pages = meta
                .total_pages
                .unwrap_or(if has_more { current_page + 1 } else { current_page });
            let total_pages = if seen == 0 { 0 } else { total_pages };
            ResultPage {
                rows,
                total_count: seen,
                total_pages,
                current_page,
                per_page,
                has_more,
            }
        }
    };
    Ok(page)
}

fn take_rows(
    object: &mut Map<String, Value>,
    rows_key: Option<&str>,
) -> Result<Vec<Map<String, Value>>, AppError> {
    let key = match rows_key {
        Some(key) => key.to_string(),
        None => ROW_KEYS
            .iter()
            .find(|k| object.get(**k).is_some_and(Value::is_array))
            .map(|k| k.to_string())
            .or_else(|| {
                object
                    .iter()
                    .find(|(_, v)| v.is_array())
                    .map(|(k, _)| k.clone())
            })
            .ok_or_else(|| AppError::Decode("no rows array in list body".to_string()))?,
    };
    let value = object
        .remove(&key)
        .ok_or_else(|| AppError::Decode(format!("missing rows key {key:?}")))?;
    serde_json::from_value(value)
        .map_err(|e| AppError::Decode(format!("rows under {key:?} are not objects: {e}")))
}

/// Spellings of the total count, first present wins.
const COUNT_KEYS: [&str; 3] = ["total_count", "total_entries", "count"];

/// Reads pagination from a nested `pagination`/`meta` object, else from the
/// top level. Fields of an unexpected type are ignored rather than rejected.
fn read_meta(object: &Map<String, Value>) -> PaginationMeta {
    let source = ["pagination", "meta"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_object))
        .unwrap_or(object);

    let page_field = |key: &str| {
        source
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };

    PaginationMeta {
        current_page: page_field("current_page"),
        total_count: COUNT_KEYS
            .iter()
            .find_map(|key| source.get(*key).and_then(Value::as_u64)),
        total_pages: page_field("total_pages"),
        next_page: page_field("next_page"),
        per_page: page_field("per_page"),
    }
}
