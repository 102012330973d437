//! Query state: predicate filters, committed search term, and page position.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("field pattern compiles"));

/// Comparison operator half of a predicate-style filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq,
    NotEq,
    Cont,
    Start,
    Gteq,
    Lteq,
    In,
    Null,
    Present,
}

impl Predicate {
    /// Longest suffixes first so `not_eq` wins over `eq`.
    const ALL: [Predicate; 9] = [
        Predicate::NotEq,
        Predicate::Present,
        Predicate::Start,
        Predicate::Gteq,
        Predicate::Lteq,
        Predicate::Cont,
        Predicate::Null,
        Predicate::Eq,
        Predicate::In,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::NotEq => "not_eq",
            Self::Cont => "cont",
            Self::Start => "start",
            Self::Gteq => "gteq",
            Self::Lteq => "lteq",
            Self::In => "in",
            Self::Null => "null",
            Self::Present => "present",
        }
    }
}

/// A backend predicate name: a field plus a comparison operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    field: String,
    predicate: Predicate,
}

impl FilterKey {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Result<Self, AppError> {
        let field = field.into();
        if !FIELD_NAME.is_match(&field) {
            return Err(AppError::Validation(format!(
                "Invalid filter field: {field:?}"
            )));
        }
        Ok(Self { field, predicate })
    }

    /// Exact-match key, the default for bare filter names like `status`.
    pub fn eq(field: impl Into<String>) -> Result<Self, AppError> {
        Self::new(field, Predicate::Eq)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// Query-string parameter name, e.g. `q[status_eq]`.
    pub fn param_name(&self) -> String {
        format!("q[{}_{}]", self.field, self.predicate.suffix())
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.field, self.predicate.suffix())
    }
}

impl FromStr for FilterKey {
    type Err = AppError;

    /// Parses `created_at_gteq`, `name_cont`, or a bare `status` (exact match).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for predicate in Predicate::ALL {
            let suffix = format!("_{}", predicate.suffix());
            if let Some(field) = s.strip_suffix(&suffix) {
                if !field.is_empty() {
                    return Self::new(field, predicate);
                }
            }
        }
        Self::eq(s)
    }
}

/// Value side of a filter entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Infers a scalar value from raw dialog or command-line input.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }

    /// Parses input for `key`. Only `in` filters split on commas; any other
    /// predicate keeps the whole string, commas included.
    pub fn parse_for(key: &FilterKey, raw: &str) -> Self {
        match key.predicate() {
            Predicate::In => Self::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => Self::parse(raw),
        }
    }

    /// Values as they appear in the query string.
    pub fn to_params(&self) -> Vec<String> {
        match self {
            Self::Bool(b) => vec![b.to_string()],
            Self::Int(n) => vec![n.to_string()],
            Self::Text(s) => vec![s.clone()],
            Self::List(items) => items.clone(),
        }
    }

    /// An empty text or list carries no constraint.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

pub type Filters = BTreeMap<FilterKey, FilterValue>;

/// Everything the next list fetch should request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    filters: Filters,
    search: String,
    page: u32,
    per_page: u32,
}

impl QueryState {
    pub fn new(per_page: u32) -> Self {
        Self {
            filters: Filters::new(),
            search: String::new(),
            page: 1,
            per_page: per_page.max(1),
        }
    }

    /// Starts at a restored page; the first response clamps it if needed.
    pub fn starting_at(per_page: u32, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..Self::new(per_page)
        }
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Replace one filter entry. A blank value removes it.
    pub fn set_filter(&mut self, key: FilterKey, value: FilterValue) {
        if value.is_blank() {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, value);
        }
        self.page = 1;
    }

    pub fn clear_filter(&mut self, key: &FilterKey) {
        self.filters.remove(key);
        self.page = 1;
    }

    /// Store a committed (post-debounce) search term.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
        self.page = 1;
    }

    /// Move to page `n`, returning whether the page changed.
    ///
    /// With `total_pages` unknown only page 1 is reachable. Requests are
    /// ignored while a fetch is in flight.
    pub fn set_page(&mut self, n: u32, total_pages: Option<u32>, in_flight: bool) -> bool {
        if in_flight || n == self.page || n < 1 {
            return false;
        }
        let in_range = match total_pages {
            Some(total) if total > 0 => n <= total,
            _ => n == 1,
        };
        if in_range {
            self.page = n;
        }
        in_range
    }

    /// Pull the page back into `[1, total_pages]`. Returns whether it moved.
    pub fn clamp_page(&mut self, total_pages: u32) -> bool {
        if total_pages > 0 && self.page > total_pages {
            self.page = total_pages;
            return true;
        }
        false
    }

    /// Commit a filter dialog. A draft equal to the current filters is a no-op.
    pub fn apply_draft(&mut self, draft: FilterDraft) -> bool {
        if draft.filters == self.filters {
            return false;
        }
        self.filters = draft.filters;
        self.page = 1;
        true
    }
}

/// Uncommitted filter dialog state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDraft {
    filters: Filters,
}

impl FilterDraft {
    /// Seed a draft from the committed filters.
    pub fn from_query(query: &QueryState) -> Self {
        Self {
            filters: query.filters.clone(),
        }
    }

    pub fn set(&mut self, key: FilterKey, value: FilterValue) {
        if value.is_blank() {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &FilterKey) {
        self.filters.remove(key);
    }

    /// "Reset" inside the dialog; nothing is committed until apply.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn is_dirty(&self, query: &QueryState) -> bool {
        self.filters != query.filters
    }
}
