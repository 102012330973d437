//! List controller: query state, fetch lifecycle, result cache, selection.
//!
//! Pure state machine with no I/O. Every query mutation that changes what
//! should be displayed yields a [`FetchTicket`]; the caller performs the
//! request and hands the outcome back through [`ListController::complete`].
//! Tickets carry a sequence number and the query snapshot they were issued
//! for, so a late response for an outdated query is discarded instead of
//! overwriting newer rows.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::dashboard::DashboardSpec;
use crate::models::pagination::ResultPage;
use crate::models::query::{FilterDraft, FilterKey, FilterValue, QueryState};
use crate::models::selection::SelectionSet;

/// A request the caller should perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: QueryState,
}

/// How a completed fetch was reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Rows replaced.
    Applied,
    /// Previous rows kept; message should be surfaced.
    Failed(String),
    /// Response no longer matched the current query; dropped silently.
    Stale,
    /// Requested page was beyond the last page; refetch the clamped page.
    Reissue(FetchTicket),
}

/// Last known-good page. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    page: Option<ResultPage>,
}

impl ResultCache {
    pub fn get(&self) -> Option<&ResultPage> {
        self.page.as_ref()
    }

    pub fn set(&mut self, page: ResultPage) {
        self.page = Some(page);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Idle,
    Loaded,
    Failed(String),
}

/// What the table should show right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<'a> {
    Idle,
    Loading {
        previous: Option<&'a ResultPage>,
    },
    Loaded(&'a ResultPage),
    Failed {
        message: &'a str,
        last_good: Option<&'a ResultPage>,
    },
}

impl<'a> ViewState<'a> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Rows to draw: loading and error states keep showing the last page.
    pub fn page(&self) -> Option<&'a ResultPage> {
        match self {
            Self::Idle => None,
            Self::Loading { previous } => *previous,
            Self::Loaded(page) => Some(page),
            Self::Failed { last_good, .. } => *last_good,
        }
    }

    /// Loading finished and the backend matched nothing.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Loaded(page) if page.is_empty())
    }
}

pub struct ListController {
    spec: Arc<DashboardSpec>,
    query: QueryState,
    cache: ResultCache,
    outcome: Outcome,
    pending: Option<FetchTicket>,
    next_seq: u64,
    selection: SelectionSet,
}

impl ListController {
    pub fn new(spec: Arc<DashboardSpec>) -> Self {
        Self::starting_at(spec, 1)
    }

    /// Open at a restored page number.
    pub fn starting_at(spec: Arc<DashboardSpec>, page: u32) -> Self {
        let query = QueryState::starting_at(spec.per_page, page);
        Self {
            spec,
            query,
            cache: ResultCache::default(),
            outcome: Outcome::Idle,
            pending: None,
            next_seq: 0,
            selection: SelectionSet::new(),
        }
    }

    pub fn spec(&self) -> &DashboardSpec {
        &self.spec
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&FetchTicket> {
        self.pending.as_ref()
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.cache.get().map(|page| page.total_pages)
    }

    pub fn view(&self) -> ViewState<'_> {
        if self.pending.is_some() {
            return ViewState::Loading {
                previous: self.cache.get(),
            };
        }
        match &self.outcome {
            Outcome::Idle => ViewState::Idle,
            Outcome::Loaded => match self.cache.get() {
                Some(page) => ViewState::Loaded(page),
                None => ViewState::Idle,
            },
            Outcome::Failed(message) => ViewState::Failed {
                message: message.as_str(),
                last_good: self.cache.get(),
            },
        }
    }

    /// Issue a fetch for the current query, superseding any pending one.
    fn issue(&mut self) -> FetchTicket {
        self.next_seq += 1;
        let ticket = FetchTicket {
            seq: self.next_seq,
            query: self.query.clone(),
        };
        tracing::debug!(
            dashboard = %self.spec.name,
            seq = ticket.seq,
            page = ticket.query.page(),
            superseded = self.pending.as_ref().map(|p| p.seq),
            "Issuing list fetch"
        );
        self.pending = Some(ticket.clone());
        ticket
    }

    fn issue_if_changed(&mut self, before: &QueryState) -> Option<FetchTicket> {
        (self.query != *before).then(|| self.issue())
    }

    /// Initial load, or an explicit refresh of the current page.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue()
    }

    /// Replay the current query after a failed fetch.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        let failed = matches!(self.outcome, Outcome::Failed(_));
        (failed && self.pending.is_none()).then(|| self.issue())
    }

    pub fn set_filter(&mut self, key: FilterKey, value: FilterValue) -> Option<FetchTicket> {
        let before = self.query.clone();
        self.query.set_filter(key, value);
        self.issue_if_changed(&before)
    }

    pub fn clear_filter(&mut self, key: &FilterKey) -> Option<FetchTicket> {
        let before = self.query.clone();
        self.query.clear_filter(key);
        self.issue_if_changed(&before)
    }

    pub fn set_search(&mut self, term: &str) -> Option<FetchTicket> {
        let before = self.query.clone();
        self.query.set_search(term);
        self.issue_if_changed(&before)
    }

    /// Seed a filter dialog from the committed filters.
    pub fn open_filter_draft(&self) -> FilterDraft {
        FilterDraft::from_query(&self.query)
    }

    pub fn apply_filter_draft(&mut self, draft: FilterDraft) -> Option<FetchTicket> {
        self.query.apply_draft(draft).then(|| self.issue())
    }

    pub fn set_page(&mut self, n: u32) -> Option<FetchTicket> {
        let total = self.total_pages();
        let in_flight = self.pending.is_some();
        self.query
            .set_page(n, total, in_flight)
            .then(|| self.issue())
    }

    pub fn next_page(&mut self) -> Option<FetchTicket> {
        self.set_page(self.query.page() + 1)
    }

    pub fn previous_page(&mut self) -> Option<FetchTicket> {
        let page = self.query.page();
        if page <= 1 {
            return None;
        }
        self.set_page(page - 1)
    }

    /// Reconcile a fetch outcome with the current state.
    pub fn complete(&mut self, seq: u64, result: Result<ResultPage, AppError>) -> Completion {
        let Some(pending) = self.pending.as_ref().filter(|p| p.seq == seq) else {
            tracing::debug!(dashboard = %self.spec.name, seq, "Discarding superseded response");
            return Completion::Stale;
        };
        let matches_query = pending.query == self.query;
        self.pending = None;
        if !matches_query {
            tracing::debug!(dashboard = %self.spec.name, seq, "Discarding response for outdated query");
            return Completion::Stale;
        }

        match result {
            Ok(page) => {
                if self.query.clamp_page(page.total_pages) {
                    tracing::debug!(
                        dashboard = %self.spec.name,
                        total_pages = page.total_pages,
                        "Requested page out of range, clamping"
                    );
                    return Completion::Reissue(self.issue());
                }
                tracing::debug!(
                    dashboard = %self.spec.name,
                    seq,
                    rows = page.rows.len(),
                    total = page.total_count,
                    "Applied list page"
                );
                self.cache.set(page);
                self.outcome = Outcome::Loaded;
                Completion::Applied
            }
            Err(e) => {
                let message = e.user_message();
                tracing::warn!(dashboard = %self.spec.name, seq, error = %e, "List fetch failed");
                self.outcome = Outcome::Failed(message.clone());
                Completion::Failed(message)
            }
        }
    }
}
