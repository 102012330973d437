//! One open dashboard: the single writer over its list state.
//!
//! A session owns the [`ListController`] and the search [`Debouncer`] and
//! performs the fetches the controller asks for on spawned tasks. Completed
//! fetches come back over a channel and are reconciled one at a time by
//! [`DashboardSession::process`], so no two writers ever race on the state.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::pagination::ResultPage;
use crate::models::query::{FilterKey, FilterValue};
use crate::models::selection::{PageSelection, RowId};
use crate::services::client::ListBackend;
use crate::services::controller::{Completion, FetchTicket, ListController, ViewState};
use crate::services::debounce::Debouncer;
use crate::services::notify::{Level, Notifier};
use crate::services::pager::{self, Pager};
use crate::services::{bulk, export, status};
use crate::storage::{self, ClientStorage};

type FetchResult = (u64, Result<ResultPage, AppError>);

/// A user intent against an open dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Raw search input, one call per keystroke.
    Search(String),
    SetFilter(FilterKey, FilterValue),
    ClearFilter(FilterKey),
    /// Replace every filter at once, as a filter dialog's "Apply" does.
    ApplyFilters(Vec<(FilterKey, FilterValue)>),
    Page(u32),
    Next,
    Previous,
    Toggle(RowId),
    SelectPage,
    ClearPage,
    ClearSelection,
    Refresh,
    Retry,
    Bulk {
        action: String,
        fields: Vec<(String, String)>,
    },
    Export,
    Status {
        id: RowId,
        status: String,
    },
}

impl FromStr for Command {
    type Err = AppError;

    /// Parse a terminal line such as `filter status active` or
    /// `bulk reschedule start_date=2026-11-02`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();
        let usage = |hint: &str| AppError::Validation(format!("usage: {hint}"));

        let command = match (verb, args.as_slice()) {
            ("search" | "/", _) => Self::Search(rest.to_string()),
            ("filter", [key, value @ ..]) if !value.is_empty() => {
                let key: FilterKey = key.parse()?;
                let value = FilterValue::parse_for(&key, &value.join(" "));
                Self::SetFilter(key, value)
            }
            ("filter", _) => return Err(usage("filter <field[_predicate]> <value>")),
            ("unfilter", [key]) => Self::ClearFilter(key.parse()?),
            ("unfilter", _) => return Err(usage("unfilter <field[_predicate]>")),
            ("filters", pairs) => Self::ApplyFilters(
                pairs
                    .iter()
                    .map(|pair| -> Result<(FilterKey, FilterValue), AppError> {
                        let (key, value) = pair
                            .split_once('=')
                            .ok_or_else(|| usage("filters [field=value ...]"))?;
                        let key: FilterKey = key.parse()?;
                        let value = FilterValue::parse_for(&key, value);
                        Ok((key, value))
                    })
                    .collect::<Result<_, AppError>>()?,
            ),
            ("page", [n]) => Self::Page(n.parse().map_err(|_| usage("page <n>"))?),
            ("page", _) => return Err(usage("page <n>")),
            ("next" | "n", []) => Self::Next,
            ("prev" | "p", []) => Self::Previous,
            ("toggle" | "x", [id]) => Self::Toggle(row_id(id)),
            ("all", []) => Self::SelectPage,
            ("none", []) => Self::ClearPage,
            ("clear", []) => Self::ClearSelection,
            ("refresh" | "r", []) => Self::Refresh,
            ("retry", []) => Self::Retry,
            ("bulk", [action, pairs @ ..]) => Self::Bulk {
                action: action.to_string(),
                fields: pairs
                    .iter()
                    .map(|pair| {
                        pair.split_once('=')
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .ok_or_else(|| usage("bulk <action> [field=value ...]"))
                    })
                    .collect::<Result<_, AppError>>()?,
            },
            ("bulk", _) => return Err(usage("bulk <action> [field=value ...]")),
            ("export", []) => Self::Export,
            ("status", [id, value]) => Self::Status {
                id: row_id(id),
                status: value.to_string(),
            },
            ("status", _) => return Err(usage("status <id> <value>")),
            _ => return Err(AppError::Validation(format!("unknown command \"{line}\""))),
        };
        Ok(command)
    }
}

fn row_id(raw: &str) -> RowId {
    match raw.parse::<RowId>() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

/// Something the session was waiting on has happened.
#[derive(Debug)]
pub enum SessionEvent {
    Fetched {
        seq: u64,
        result: Result<ResultPage, AppError>,
    },
    SearchDue,
}

/// One-line summary under the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Idle,
    Loading,
    Showing { from: u64, to: u64, total: u64 },
    Empty(String),
    Error(String),
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Loading => f.write_str("Loading..."),
            Self::Showing { from, to, total } => write!(f, "Showing {from}-{to} of {total}"),
            Self::Empty(message) => f.write_str(message),
            Self::Error(message) => write!(f, "Error: {message} (type `retry`)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: Option<RowId>,
    pub selected: bool,
    pub cells: Vec<String>,
}

/// Everything needed to draw the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub title: String,
    pub search: String,
    pub filters: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<RowView>,
    pub page_selection: PageSelection,
    pub selected: usize,
    pub pager: Pager,
    pub status: StatusLine,
}

pub struct DashboardSession<B: ListBackend> {
    spec: Arc<DashboardSpec>,
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    storage: Arc<dyn ClientStorage>,
    controller: ListController,
    /// Ids that appeared on any page applied in this session.
    seen: BTreeSet<RowId>,
    debouncer: Debouncer,
    timeout: Duration,
    export_dir: PathBuf,
    results_tx: mpsc::UnboundedSender<FetchResult>,
    results_rx: mpsc::UnboundedReceiver<FetchResult>,
    in_flight: Option<JoinHandle<()>>,
}

impl<B: ListBackend> DashboardSession<B> {
    /// Open `spec` at its last viewed page and start the initial load.
    pub fn open(
        spec: Arc<DashboardSpec>,
        backend: Arc<B>,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn ClientStorage>,
        config: &AppConfig,
    ) -> Self {
        let page = storage::load_page(storage.as_ref(), &spec.page_storage_key());
        let debounce = spec.debounce_or(config.search_debounce());
        tracing::info!(dashboard = %spec.name, page, debounce_ms = debounce.as_millis() as u64, "Opening dashboard");

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let mut session = Self {
            controller: ListController::starting_at(Arc::clone(&spec), page),
            seen: BTreeSet::new(),
            debouncer: Debouncer::new(debounce),
            spec,
            backend,
            notifier,
            storage,
            timeout: config.request_timeout(),
            export_dir: config.export_dir.clone(),
            results_tx,
            results_rx,
            in_flight: None,
        };
        let ticket = session.controller.refresh();
        session.spawn(ticket);
        session
    }

    pub fn spec(&self) -> &DashboardSpec {
        &self.spec
    }

    pub fn controller(&self) -> &ListController {
        &self.controller
    }

    /// A fetch is outstanding or a search commit is scheduled.
    pub fn is_busy(&self) -> bool {
        self.controller.is_loading() || self.debouncer.deadline().is_some()
    }

    fn spawn(&mut self, ticket: FetchTicket) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        let backend = Arc::clone(&self.backend);
        let spec = Arc::clone(&self.spec);
        let tx = self.results_tx.clone();
        let timeout = self.timeout;
        self.in_flight = Some(tokio::spawn(async move {
            let result = match time::timeout(timeout, backend.fetch_page(&spec, &ticket.query)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(timeout.as_secs())),
            };
            // The session may already be closed.
            let _ = tx.send((ticket.seq, result));
        }));
    }

    fn spawn_opt(&mut self, ticket: Option<FetchTicket>) {
        if let Some(ticket) = ticket {
            self.spawn(ticket);
        }
    }

    fn refresh(&mut self) {
        let ticket = self.controller.refresh();
        self.spawn(ticket);
    }

    /// Apply a command. Failures have already been surfaced as toasts; the
    /// error is returned for logging.
    pub async fn handle(&mut self, command: Command) -> Result<(), AppError> {
        tracing::debug!(dashboard = %self.spec.name, ?command, "Handling command");
        match command {
            Command::Search(raw) => {
                if let Some(term) = self.debouncer.input(raw, Instant::now()) {
                    let ticket = self.controller.set_search(&term);
                    self.spawn_opt(ticket);
                }
            }
            Command::SetFilter(key, value) => {
                let ticket = self.controller.set_filter(key, value);
                self.spawn_opt(ticket);
            }
            Command::ClearFilter(key) => {
                let ticket = self.controller.clear_filter(&key);
                self.spawn_opt(ticket);
            }
            Command::ApplyFilters(filters) => {
                let mut draft = self.controller.open_filter_draft();
                draft.clear();
                for (key, value) in filters {
                    draft.set(key, value);
                }
                let ticket = self.controller.apply_filter_draft(draft);
                self.spawn_opt(ticket);
            }
            Command::Page(n) => {
                let ticket = self.controller.set_page(n);
                self.spawn_opt(ticket);
            }
            Command::Next => {
                let ticket = self.controller.next_page();
                self.spawn_opt(ticket);
            }
            Command::Previous => {
                let ticket = self.controller.previous_page();
                self.spawn_opt(ticket);
            }
            Command::Toggle(id) => {
                if !self.seen.contains(&id) {
                    let err = AppError::Validation(format!("No row {id} on this dashboard"));
                    self.notifier.show(Level::Error, &err.user_message());
                    return Err(err);
                }
                self.controller.selection_mut().toggle(id);
            }
            Command::SelectPage => {
                let ids = self.page_ids();
                self.controller.selection_mut().select_all_on_page(&ids);
            }
            Command::ClearPage => {
                let ids = self.page_ids();
                self.controller.selection_mut().clear_all_on_page(&ids);
            }
            Command::ClearSelection => self.controller.selection_mut().clear(),
            Command::Refresh => self.refresh(),
            Command::Retry => {
                let ticket = self.controller.retry();
                self.spawn_opt(ticket);
            }
            Command::Bulk { action, fields } => self.bulk(&action, fields).await?,
            Command::Export => {
                let today = chrono::Local::now().date_naive();
                export::export(
                    self.backend.as_ref(),
                    &self.notifier,
                    &self.spec,
                    self.controller.query(),
                    &self.export_dir,
                    today,
                )
                .await?;
            }
            Command::Status { id, status: value } => {
                status::update(self.backend.as_ref(), &self.notifier, &self.spec, &id, &value)
                    .await?;
                self.refresh();
            }
        }
        Ok(())
    }

    async fn bulk(&mut self, name: &str, fields: Vec<(String, String)>) -> Result<(), AppError> {
        let Some(action) = self.spec.bulk_action(name).cloned() else {
            let err = AppError::Validation(format!("Unknown bulk action \"{name}\""));
            self.notifier.show(Level::Error, &err.user_message());
            return Err(err);
        };
        let action = fields.into_iter().fold(action, |action, (key, raw)| {
            let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
            action.field(key, value)
        });
        bulk::dispatch(
            self.backend.as_ref(),
            &self.notifier,
            &action,
            self.controller.selection_mut(),
        )
        .await?;
        self.refresh();
        Ok(())
    }

    fn page_ids(&self) -> Vec<RowId> {
        self.controller
            .cache()
            .get()
            .map(|page| page.row_ids(&self.spec.id_field))
            .unwrap_or_default()
    }

    /// Wait for the next fetch completion or the search debounce deadline.
    ///
    /// Only call this while [`is_busy`](Self::is_busy); otherwise nothing
    /// will ever arrive.
    pub async fn wait(&mut self) -> SessionEvent {
        let deadline = self.debouncer.deadline();
        let debounce = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            Some((seq, result)) = self.results_rx.recv() => SessionEvent::Fetched { seq, result },
            () = debounce => SessionEvent::SearchDue,
        }
    }

    pub fn process(&mut self, event: SessionEvent) -> Option<Completion> {
        match event {
            SessionEvent::Fetched { seq, result } => Some(self.complete(seq, result)),
            SessionEvent::SearchDue => {
                self.tick(Instant::now());
                None
            }
        }
    }

    /// Commit the search term if its debounce window has elapsed by `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(term) = self.debouncer.fire(now) {
            let ticket = self.controller.set_search(&term);
            self.spawn_opt(ticket);
        }
    }

    fn complete(&mut self, seq: u64, result: Result<ResultPage, AppError>) -> Completion {
        let completion = self.controller.complete(seq, result);
        match &completion {
            Completion::Applied => {
                self.in_flight = None;
                let ids = self.page_ids();
                self.seen.extend(ids);
                let page = self.controller.query().page();
                if let Err(e) =
                    storage::save_page(self.storage.as_ref(), &self.spec.page_storage_key(), page)
                {
                    tracing::warn!(dashboard = %self.spec.name, error = %e, "Could not persist current page");
                }
            }
            Completion::Failed(message) => {
                self.in_flight = None;
                self.notifier.show(Level::Error, message);
            }
            Completion::Reissue(ticket) => self.spawn(ticket.clone()),
            Completion::Stale => {}
        }
        completion
    }

    /// Process events until no fetch or search commit is outstanding.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            let event = self.wait().await;
            self.process(event);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let view = self.controller.view();
        let query = self.controller.query();
        let selection = self.controller.selection();
        let page = view.page();
        let page_ids = self.page_ids();

        let rows = page
            .map(|page| {
                page.rows
                    .iter()
                    .map(|row| {
                        let id = row.id(&self.spec.id_field);
                        RowView {
                            selected: id.as_ref().is_some_and(|id| selection.contains(id)),
                            cells: self.spec.columns.iter().map(|c| row.text(c)).collect(),
                            id,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let status = match &view {
            ViewState::Idle => StatusLine::Idle,
            ViewState::Loading { .. } => StatusLine::Loading,
            ViewState::Failed { message, .. } => StatusLine::Error(message.to_string()),
            ViewState::Loaded(page) if page.is_empty() => {
                StatusLine::Empty(self.spec.empty_message.clone())
            }
            ViewState::Loaded(page) => {
                let from = u64::from(page.current_page.saturating_sub(1)) * u64::from(page.per_page) + 1;
                StatusLine::Showing {
                    from,
                    to: from + page.rows.len() as u64 - 1,
                    total: page.total_count,
                }
            }
        };

        Snapshot {
            title: self.spec.title.clone(),
            search: self.debouncer.raw().to_string(),
            filters: query
                .filters()
                .iter()
                .map(|(key, value)| format!("{key}={}", value.to_params().join(",")))
                .collect(),
            columns: self.spec.columns.clone(),
            rows,
            page_selection: selection.page_state(&page_ids),
            selected: selection.len(),
            pager: pager::render(
                query.page(),
                self.controller.total_pages().unwrap_or(0),
                view.is_loading(),
            ),
            status,
        }
    }
}

impl<B: ListBackend> Drop for DashboardSession<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
