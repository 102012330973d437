//! Spreadsheet export of the current filtered list.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;

use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::query::QueryState;
use crate::services::client::ListBackend;
use crate::services::notify::{Level, LoadingToast, Notifier};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("filename pattern compiles"));

/// `<resource>_<YYYY-MM-DD>.xlsx`, with path separators and anything else
/// unsafe in the resource collapsed to `_`.
pub fn export_filename(resource: &str, date: NaiveDate) -> String {
    let stem = UNSAFE_CHARS.replace_all(resource.trim_matches('/'), "_");
    let stem = if stem.is_empty() { "export".into() } else { stem };
    format!("{stem}_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Download the export for the current filters into `dir`.
///
/// The whole body is received before anything is written, then staged in a
/// `.part` file and renamed, so a failed export never leaves a file behind.
pub async fn export<B: ListBackend>(
    backend: &B,
    notifier: &Arc<dyn Notifier>,
    spec: &DashboardSpec,
    query: &QueryState,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, AppError> {
    let result = {
        let _toast = LoadingToast::show(notifier, "Preparing export...");
        match backend.export(spec, query).await {
            Ok(bytes) => write_atomic(dir, &export_filename(&spec.resource, date), &bytes).await,
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(path) => {
            tracing::info!(dashboard = %spec.name, path = %path.display(), "Export written");
            notifier.show(Level::Success, &format!("Exported to {}", path.display()));
            Ok(path)
        }
        Err(e) => {
            tracing::warn!(dashboard = %spec.name, error = %e, "Export failed");
            notifier.show(Level::Error, &format!("Export failed: {}", e.user_message()));
            Err(e)
        }
    }
}

async fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(name);
    let staging = dir.join(format!("{name}.part"));
    let written = match tokio::fs::write(&staging, bytes).await {
        Ok(()) => tokio::fs::rename(&staging, &target).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(target)
}
