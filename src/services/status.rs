//! Single-row status changes.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::selection::RowId;
use crate::services::client::ListBackend;
use crate::services::notify::{Level, LoadingToast, Notifier};

/// Set `status` on row `id`. The caller refreshes the list after `Ok`.
pub async fn update<B: ListBackend>(
    backend: &B,
    notifier: &Arc<dyn Notifier>,
    spec: &DashboardSpec,
    id: &RowId,
    status: &str,
) -> Result<(), AppError> {
    let status = status.trim();
    if status.is_empty() || (!spec.statuses.is_empty() && !spec.statuses.iter().any(|s| s == status)) {
        let err = AppError::Validation(format!("Unknown status \"{status}\""));
        notifier.show(Level::Error, &err.user_message());
        return Err(err);
    }

    let result = {
        let _toast = LoadingToast::show(notifier, "Updating status...");
        backend.update_status(spec, id, status).await
    };

    match result {
        Ok(()) => {
            tracing::info!(dashboard = %spec.name, %id, status, "Status updated");
            notifier.show(Level::Success, "Status updated successfully");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(dashboard = %spec.name, %id, status, error = %e, "Status update failed");
            notifier.show(Level::Error, &e.user_message());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dashboards;
    use crate::services::notify::{drain, ChannelNotifier, NotifyEvent};
    use crate::services::testing::FakeBackend;

    fn notifier() -> (Arc<dyn Notifier>, tokio::sync::mpsc::UnboundedReceiver<NotifyEvent>) {
        let (notifier, rx) = ChannelNotifier::channel();
        (Arc::new(notifier), rx)
    }

    #[tokio::test]
    async fn known_status_is_sent() {
        let backend = FakeBackend::with_rows(2);
        let (notifier, mut rx) = notifier();
        let spec = dashboards::club_memberships();

        update(&backend, &notifier, &spec, &RowId::Int(2), "inactive")
            .await
            .unwrap();
        assert_eq!(
            *backend.status_calls.lock().unwrap(),
            vec![(RowId::Int(2), "inactive".to_string())]
        );
        assert!(matches!(
            drain(&mut rx).last(),
            Some(NotifyEvent::Show(n)) if n.level == Level::Success
        ));
    }

    #[tokio::test]
    async fn undeclared_status_is_rejected_locally() {
        let backend = FakeBackend::with_rows(2);
        let (notifier, mut rx) = notifier();
        let spec = dashboards::club_memberships();

        let err = update(&backend, &notifier, &spec, &RowId::Int(1), "archived")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(backend.status_calls.lock().unwrap().is_empty());
        assert_eq!(drain(&mut rx).len(), 1);
    }
}
