pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;

use config::AppConfig;
use errors::AppError;
use services::client::{ApiClient, ListBackend};
use services::notify::{Notifier, TracingNotifier};
use services::session::DashboardSession;
use storage::ClientStorage;

/// Shared handles every dashboard session is opened with.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<dyn ClientStorage>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    /// Context that reports notifications to the log.
    pub fn new(config: AppConfig, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            config,
            storage,
            notifier: Arc::new(TracingNotifier::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn api_client(&self) -> Result<ApiClient, AppError> {
        ApiClient::new(&self.config, Arc::clone(&self.storage))
    }

    /// Open a built-in dashboard by name.
    pub fn open_dashboard<B: ListBackend>(
        &self,
        name: &str,
        backend: Arc<B>,
    ) -> Result<DashboardSession<B>, AppError> {
        let spec = config::dashboards::find(name)
            .ok_or_else(|| AppError::Config(format!("unknown dashboard \"{name}\"")))?;
        Ok(DashboardSession::open(
            Arc::new(spec),
            backend,
            Arc::clone(&self.notifier),
            Arc::clone(&self.storage),
            &self.config,
        ))
    }
}
