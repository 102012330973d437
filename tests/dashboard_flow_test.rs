//! End-to-end dashboard flows against an in-process fixture backend.
//!
//! The fixture speaks the same list, bulk, export and status endpoints as
//! the real API, so these tests drive the actual `ApiClient` over HTTP.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use propdesk::config::AppConfig;
use propdesk::middleware::auth::TOKEN_KEY;
use propdesk::models::selection::RowId;
use propdesk::services::client::{ApiClient, REQUEST_ID_HEADER};
use propdesk::services::notify::{drain, ChannelNotifier, Level, NotifyEvent};
use propdesk::services::session::{Command, DashboardSession, StatusLine};
use propdesk::storage::{ClientStorage, MemoryStorage};
use propdesk::AppContext;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

const TOKEN: &str = "fixture-token";
const XLSX: &[u8] = b"PK\x03\x04loyalty-tiers";

#[derive(Debug, Clone)]
struct Hit {
    method: String,
    path: String,
    params: Vec<(String, String)>,
    request_id: Option<String>,
}

#[derive(Default)]
struct Fixture {
    hits: Mutex<Vec<Hit>>,
    bulk_bodies: Mutex<Vec<Value>>,
}

impl Fixture {
    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    fn record(&self, method: &str, path: String, query: Option<&str>, headers: &HeaderMap) -> Hit {
        let params = Url::parse(&format!("http://fixture/?{}", query.unwrap_or_default()))
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let hit = Hit {
            method: method.to_string(),
            path,
            params,
            request_id: headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        };
        self.hits.lock().unwrap().push(hit.clone());
        hit
    }
}

fn param<'a>(hit: &'a Hit, name: &str) -> Option<&'a str> {
    hit.params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid or expired token"})),
    )
        .into_response()
}

fn rows_for(resource: &str) -> Vec<Value> {
    match resource {
        "loyalty_tiers" => (1..=45)
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Tier {id}"),
                    "point_range_from": (id - 1) * 100,
                    "point_range_to": id * 100 - 1,
                })
            })
            .collect(),
        "task_occurrences" => (1..=30)
            .map(|id| {
                json!({
                    "id": id,
                    "checklist_name": format!("Fire check {id}"),
                    "asset_name": "Pump room",
                    "start_date": "2026-10-20",
                    "status": if id % 2 == 0 { "open" } else { "closed" },
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn matches(row: &Value, params: &[(String, String)]) -> bool {
    params.iter().all(|(key, value)| {
        let Some(inner) = key.strip_prefix("q[").and_then(|k| k.strip_suffix(']')) else {
            return true;
        };
        if let Some(fields) = inner.strip_suffix("_cont") {
            let needle = value.to_lowercase();
            fields.split("_or_").any(|field| {
                row[field]
                    .as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
        } else if let Some(field) = inner.strip_suffix("_eq") {
            match &row[field] {
                Value::String(s) => s == value,
                other => other.to_string() == *value,
            }
        } else {
            true
        }
    })
}

async fn list(
    State(fixture): State<Arc<Fixture>>,
    Path(file): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let hit = fixture.record("GET", format!("/api/{file}"), query.as_deref(), &headers);
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some((resource, ext)) = file.rsplit_once('.') else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let rows: Vec<Value> = rows_for(resource)
        .into_iter()
        .filter(|row| matches(row, &hit.params))
        .collect();

    if ext == "xlsx" {
        return (
            [(
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )],
            XLSX,
        )
            .into_response();
    }

    let page: usize = param(&hit, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = param(&hit, "per_page").and_then(|p| p.parse().ok()).unwrap_or(20);
    let total = rows.len();
    let slice: Vec<Value> = rows.into_iter().skip((page - 1) * per_page).take(per_page).collect();
    Json(json!({
        resource: slice,
        "pagination": {
            "current_page": page,
            "per_page": per_page,
            "total_count": total,
            "total_pages": total.div_ceil(per_page),
        }
    }))
    .into_response()
}

async fn bulk(
    State(fixture): State<Arc<Fixture>>,
    Path((resource, action)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fixture.record("POST", format!("/api/{resource}/{action}"), None, &headers);
    if !authorized(&headers) {
        return unauthorized();
    }
    fixture.bulk_bodies.lock().unwrap().push(body.clone());
    let ids = body["task_occurrence_ids"].as_array().cloned().unwrap_or_default();
    match body["start_date"].as_str() {
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": {"code": "missing_date", "message": "Start date is required"}})),
        )
            .into_response(),
        Some(date) if date < "2026-01-01" => Json(json!({
            "updated": ids.len() - 1,
            "failed": 1,
            "errors": ["Occurrence 1 is already closed"],
        }))
        .into_response(),
        Some(_) => Json(json!({"updated": ids.len()})).into_response(),
    }
}

async fn status_update(
    State(fixture): State<Arc<Fixture>>,
    Path(resource): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    fixture.record(
        "PUT",
        format!("/api/{resource}/status_update"),
        query.as_deref(),
        &headers,
    );
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"message": "Status updated"})).into_response()
}

async fn start_fixture() -> (String, Arc<Fixture>) {
    let fixture = Arc::new(Fixture::default());
    let app = Router::new()
        .route("/api/{file}", get(list))
        .route("/api/{resource}/status_update", put(status_update))
        .route("/api/{resource}/{action}", post(bulk))
        .with_state(Arc::clone(&fixture));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{addr}/api"), fixture)
}

struct Harness {
    session: DashboardSession<ApiClient>,
    storage: Arc<MemoryStorage>,
    toasts: UnboundedReceiver<NotifyEvent>,
    fixture: Arc<Fixture>,
    export_dir: tempfile::TempDir,
}

async fn open(dashboard: &str, token: Option<&str>) -> Harness {
    let (base_url, fixture) = start_fixture().await;
    let export_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::with_base_url(base_url);
    config.export_dir = export_dir.path().to_path_buf();

    let storage = Arc::new(MemoryStorage::new());
    if let Some(token) = token {
        storage.set(TOKEN_KEY, token).unwrap();
    }
    let (notifier, toasts) = ChannelNotifier::channel();
    let context = AppContext::new(config, storage.clone()).with_notifier(Arc::new(notifier));
    let backend = Arc::new(context.api_client().unwrap());
    let session = context.open_dashboard(dashboard, backend).unwrap();
    Harness {
        session,
        storage,
        toasts,
        fixture,
        export_dir,
    }
}

fn shown(events: &[NotifyEvent], level: Level) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            NotifyEvent::Show(n) if n.level == level => Some(n.message.clone()),
            _ => None,
        })
        .collect()
}

fn list_hits(fixture: &Fixture) -> Vec<Hit> {
    fixture
        .hits()
        .into_iter()
        .filter(|h| h.method == "GET" && h.path.ends_with(".json"))
        .collect()
}

#[tokio::test]
async fn pages_through_loyalty_tiers() {
    let mut c = open("loyalty_tiers", Some(TOKEN)).await;
    c.session.settle().await;

    let snap = c.session.snapshot();
    assert_eq!(snap.rows.len(), 10);
    assert_eq!(snap.rows[0].cells, vec!["1", "Tier 1", "0", "99"]);
    assert_eq!(
        snap.status,
        StatusLine::Showing {
            from: 1,
            to: 10,
            total: 45
        }
    );
    assert_eq!(snap.pager.links.len(), 5);

    c.session.handle(Command::Page(5)).await.unwrap();
    c.session.settle().await;
    let snap = c.session.snapshot();
    assert_eq!(snap.rows.len(), 5);
    assert!(!snap.pager.next_enabled);
    assert_eq!(
        c.storage.get("loyalty_tiers_currentPage").as_deref(),
        Some("5")
    );

    let hits = list_hits(&c.fixture);
    assert_eq!(hits.len(), 2);
    assert_eq!(param(&hits[1], "page"), Some("5"));
    assert_eq!(param(&hits[1], "per_page"), Some("10"));
    assert!(hits[1].request_id.is_some());
    assert_ne!(hits[0].request_id, hits[1].request_id);
}

#[tokio::test]
async fn search_resets_to_first_page_and_filters_rows() {
    let mut c = open("loyalty_tiers", Some(TOKEN)).await;
    c.session.settle().await;
    c.session.handle(Command::Page(3)).await.unwrap();
    c.session.settle().await;

    for raw in ["T", "Ti", "Tier 4"] {
        c.session.handle(Command::Search(raw.into())).await.unwrap();
    }
    c.session.settle().await;

    let hits = list_hits(&c.fixture);
    assert_eq!(hits.len(), 3);
    let last = hits.last().unwrap();
    assert_eq!(param(last, "q[name_cont]"), Some("Tier 4"));
    assert_eq!(param(last, "page"), Some("1"));

    let snap = c.session.snapshot();
    assert_eq!(snap.rows.len(), 7);
    assert_eq!(
        snap.status,
        StatusLine::Showing {
            from: 1,
            to: 7,
            total: 7
        }
    );
}

#[tokio::test]
async fn no_matches_shows_empty_state_and_clearing_is_instant() {
    let mut c = open("loyalty_tiers", Some(TOKEN)).await;
    c.session.settle().await;

    c.session.handle(Command::Search("platinum".into())).await.unwrap();
    c.session.settle().await;
    let snap = c.session.snapshot();
    assert!(snap.rows.is_empty());
    assert_eq!(snap.status, StatusLine::Empty("No tiers found".into()));

    c.session.handle(Command::Search(String::new())).await.unwrap();
    assert!(c.session.controller().is_loading());
    c.session.settle().await;
    assert_eq!(c.session.snapshot().rows.len(), 10);
    let last = list_hits(&c.fixture).pop().unwrap();
    assert_eq!(param(&last, "q[name_cont]"), None);
}

#[tokio::test]
async fn filters_are_encoded_as_predicates() {
    let mut c = open("task_occurrences", Some(TOKEN)).await;
    c.session.settle().await;

    c.session
        .handle("filter status open".parse().unwrap())
        .await
        .unwrap();
    c.session.settle().await;

    let last = list_hits(&c.fixture).pop().unwrap();
    assert_eq!(param(&last, "q[status_eq]"), Some("open"));
    let snap = c.session.snapshot();
    assert_eq!(snap.rows.len(), 15);
    assert_eq!(snap.filters, vec!["status_eq=open".to_string()]);
}

#[tokio::test]
async fn missing_token_never_reaches_backend() {
    let mut c = open("loyalty_tiers", None).await;
    c.session.settle().await;

    assert!(c.fixture.hits().is_empty());
    assert_eq!(
        c.session.snapshot().status,
        StatusLine::Error("You are not signed in".into())
    );
    assert_eq!(
        shown(&drain(&mut c.toasts), Level::Error),
        vec!["You are not signed in"]
    );
}

#[tokio::test]
async fn rejected_token_reports_expired_session() {
    let mut c = open("loyalty_tiers", Some("stale-token")).await;
    c.session.settle().await;

    assert_eq!(c.fixture.hits().len(), 1);
    assert_eq!(
        c.session.snapshot().status,
        StatusLine::Error("Your session has expired".into())
    );
}

#[tokio::test]
async fn bulk_reschedule_clears_selection_and_refreshes() {
    let mut c = open("task_occurrences", Some(TOKEN)).await;
    c.session.settle().await;
    c.session.handle(Command::SelectPage).await.unwrap();
    c.session.handle(Command::Toggle(RowId::Int(2))).await.unwrap();
    assert_eq!(c.session.snapshot().selected, 19);

    c.session
        .handle("bulk reschedule start_date=2026-11-02".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(c.session.snapshot().selected, 0);
    c.session.settle().await;

    let body = c.fixture.bulk_bodies.lock().unwrap()[0].clone();
    assert_eq!(body["start_date"], "2026-11-02");
    let ids = body["task_occurrence_ids"].as_array().unwrap();
    assert_eq!(ids.len(), 19);
    assert!(!ids.contains(&json!(2)));

    let events = drain(&mut c.toasts);
    assert_eq!(
        shown(&events, Level::Success),
        vec!["Successfully rescheduled 19 task(s)"]
    );
    let loading = shown(&events, Level::Loading).len();
    let dismissed = events
        .iter()
        .filter(|e| matches!(e, NotifyEvent::Dismiss(_)))
        .count();
    assert_eq!(loading, 1);
    assert_eq!(dismissed, 1);
    assert_eq!(list_hits(&c.fixture).len(), 2);
}

#[tokio::test]
async fn bulk_failures_keep_selection() {
    let mut c = open("task_occurrences", Some(TOKEN)).await;
    c.session.settle().await;
    c.session.handle(Command::Toggle(RowId::Int(1))).await.unwrap();
    c.session.handle(Command::Toggle(RowId::Int(4))).await.unwrap();

    let err = c
        .session
        .handle("bulk reschedule".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, propdesk::errors::AppError::Http { status: 422, .. }));
    assert_eq!(c.session.snapshot().selected, 2);

    c.session
        .handle("bulk reschedule start_date=2025-12-01".parse().unwrap())
        .await
        .unwrap_err();
    assert_eq!(c.session.snapshot().selected, 2);

    assert_eq!(
        shown(&drain(&mut c.toasts), Level::Error),
        vec![
            "Start date is required",
            "1 succeeded, 1 failed: Occurrence 1 is already closed",
        ]
    );
    assert_eq!(list_hits(&c.fixture).len(), 1);
}

#[tokio::test]
async fn export_downloads_current_filters() {
    let mut c = open("loyalty_tiers", Some(TOKEN)).await;
    c.session.settle().await;
    c.session.handle(Command::Search("Tier 1".into())).await.unwrap();
    c.session.settle().await;

    c.session.handle(Command::Export).await.unwrap();

    let export = c
        .fixture
        .hits()
        .into_iter()
        .find(|h| h.path.ends_with(".xlsx"))
        .unwrap();
    assert_eq!(export.path, "/api/loyalty_tiers.xlsx");
    assert_eq!(param(&export, "q[name_cont]"), Some("Tier 1"));
    assert_eq!(param(&export, "page"), None);

    let today = chrono::Local::now().date_naive().format("%Y-%m-%d");
    let path = c
        .export_dir
        .path()
        .join(format!("loyalty_tiers_{today}.xlsx"));
    assert_eq!(std::fs::read(path).unwrap(), XLSX);
}

#[tokio::test]
async fn status_update_puts_and_refreshes() {
    let mut c = open("task_occurrences", Some(TOKEN)).await;
    c.session.settle().await;

    c.session.handle("status 3 skipped".parse().unwrap()).await.unwrap();
    c.session.settle().await;

    let put = c
        .fixture
        .hits()
        .into_iter()
        .find(|h| h.method == "PUT")
        .unwrap();
    assert_eq!(put.path, "/api/task_occurrences/status_update");
    assert_eq!(param(&put, "id"), Some("3"));
    assert_eq!(param(&put, "status"), Some("skipped"));
    assert_eq!(list_hits(&c.fixture).len(), 2);

    let err = c
        .session
        .handle("status 3 demolished".parse().unwrap())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
