//! Bulk action definitions and their outcomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::selection::RowId;

/// HTTP verb a bulk endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Post,
    Patch,
    Put,
}

/// One operation applicable to every selected row via a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    /// Command name, e.g. `reschedule`.
    pub name: String,
    /// Path relative to the API base, e.g. `task_occurrences/bulk_reschedule.json`.
    pub endpoint: String,
    pub verb: HttpVerb,
    /// Body key carrying the id list, e.g. `task_occurrence_ids`.
    pub ids_field: String,
    /// Operation-specific body fields merged next to the id list.
    pub fields: Map<String, Value>,
    /// Success wording: "Successfully {past_tense} N {noun}(s)".
    pub past_tense: String,
    pub noun: String,
}

impl BulkAction {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        ids_field: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            past_tense: format!("{name}d"),
            name,
            endpoint: endpoint.into(),
            verb: HttpVerb::Post,
            ids_field: ids_field.into(),
            fields: Map::new(),
            noun: "item".to_string(),
        }
    }

    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn wording(mut self, past_tense: impl Into<String>, noun: impl Into<String>) -> Self {
        self.past_tense = past_tense.into();
        self.noun = noun.into();
        self
    }

    /// `{ <ids_field>: [...], ...fields }`; the id list always wins a key clash.
    pub fn body(&self, ids: &[RowId]) -> Value {
        let mut body = self.fields.clone();
        let ids = ids
            .iter()
            .map(|id| serde_json::to_value(id).unwrap_or(Value::Null))
            .collect();
        body.insert(self.ids_field.clone(), Value::Array(ids));
        Value::Object(body)
    }

    pub fn success_message(&self, affected: usize) -> String {
        format!(
            "Successfully {} {affected} {}(s)",
            self.past_tense, self.noun
        )
    }

    pub fn progress_message(&self, count: usize) -> String {
        format!("Applying {} to {count} {}(s)...", self.name, self.noun)
    }
}

/// Backend response to a bulk request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(alias = "succeeded", alias = "updated_count")]
    pub updated: Option<usize>,
    pub failed: Option<usize>,
    pub total: Option<usize>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub message: Option<String>,
}

/// What a bulk request achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub requested: usize,
    pub affected: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BulkOutcome {
    /// Reconcile a response against the number of ids sent. A response that
    /// reports nothing counts as every id affected.
    pub fn from_response(requested: usize, response: BulkResponse) -> Self {
        let total = response.total.unwrap_or(requested);
        let affected = response
            .updated
            .unwrap_or_else(|| total.saturating_sub(response.failed.unwrap_or(0)));
        let failed = response
            .failed
            .unwrap_or_else(|| total.saturating_sub(affected));
        let mut errors = response.errors;
        if failed > 0 && errors.is_empty() {
            errors.extend(response.message);
        }
        Self {
            requested,
            affected,
            failed,
            errors,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}
