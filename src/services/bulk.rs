//! Bulk action dispatch over the current selection.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::bulk::{BulkAction, BulkOutcome};
use crate::models::selection::SelectionSet;
use crate::services::client::ListBackend;
use crate::services::notify::{Level, LoadingToast, Notifier};

pub const EMPTY_SELECTION_MESSAGE: &str = "Select at least one item";

/// Apply `action` to every selected id with one batched request.
///
/// The selection is cleared only when every id succeeded; on any failure it
/// is left intact so the user can retry without re-selecting. The caller is
/// responsible for refreshing the list after `Ok`.
pub async fn dispatch<B: ListBackend>(
    backend: &B,
    notifier: &Arc<dyn Notifier>,
    action: &BulkAction,
    selection: &mut SelectionSet,
) -> Result<BulkOutcome, AppError> {
    if selection.is_empty() {
        notifier.show(Level::Error, EMPTY_SELECTION_MESSAGE);
        return Err(AppError::Validation(EMPTY_SELECTION_MESSAGE.to_string()));
    }

    let ids = selection.ids();
    let result = {
        let _toast = LoadingToast::show(notifier, &action.progress_message(ids.len()));
        backend.bulk_action(action, &ids).await
    };

    match result {
        Ok(outcome) if outcome.is_complete() => {
            tracing::info!(action = %action.name, affected = outcome.affected, "Bulk action succeeded");
            notifier.show(Level::Success, &action.success_message(outcome.affected));
            selection.clear();
            Ok(outcome)
        }
        Ok(outcome) => {
            let err = AppError::PartialFailure {
                affected: outcome.affected,
                failed: outcome.failed,
                message: outcome.errors.first().cloned(),
            };
            tracing::warn!(action = %action.name, affected = outcome.affected, failed = outcome.failed, "Bulk action partially failed");
            notifier.show(Level::Error, &err.user_message());
            Err(err)
        }
        Err(e) => {
            tracing::warn!(action = %action.name, error = %e, "Bulk action failed");
            notifier.show(Level::Error, &e.user_message());
            Err(e)
        }
    }
}
