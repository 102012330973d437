use std::sync::Arc;

use mimalloc::MiMalloc;
use propdesk::config::AppConfig;
use propdesk::middleware::auth;
use propdesk::services::notify::{ChannelNotifier, Level, NotifyEvent};
use propdesk::services::pager::PageItem;
use propdesk::services::session::{Command, Snapshot};
use propdesk::storage::FileStorage;
use propdesk::AppContext;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

enum Input {
    Line(Option<String>),
    Settled,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays a clean dashboard.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "propdesk=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env()?;
    let storage = Arc::new(FileStorage::open(&config.storage_path)?);
    if let Some(token) = &config.api_token {
        auth::store_token(storage.as_ref(), token)?;
    }

    let (notifier, mut toasts) = ChannelNotifier::channel();
    tokio::spawn(async move {
        while let Some(event) = toasts.recv().await {
            if let NotifyEvent::Show(toast) = event {
                let tag = match toast.level {
                    Level::Info => "info",
                    Level::Success => "ok",
                    Level::Error => "error",
                    Level::Loading => "...",
                };
                println!("[{tag}] {}", toast.message);
            }
        }
    });

    let context = AppContext::new(config, storage).with_notifier(Arc::new(notifier));
    let backend = Arc::new(context.api_client()?);
    let name = context.config.dashboard.clone();
    let mut session = context.open_dashboard(&name, backend)?;
    tracing::info!(dashboard = %name, base_url = %context.config.api_base_url, "Dashboard session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            event = session.wait(), if session.is_busy() => {
                session.process(event);
                Input::Settled
            }
        };

        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) if line.trim().is_empty() => print_snapshot(&session.snapshot()),
            Input::Line(Some(line)) if matches!(line.trim(), "quit" | "q") => break,
            Input::Line(Some(line)) => match line.parse::<Command>() {
                Ok(command) => {
                    if let Err(e) = session.handle(command).await {
                        tracing::debug!(error = %e, "Command failed");
                    }
                    if !session.is_busy() {
                        print_snapshot(&session.snapshot());
                    }
                }
                Err(e) => println!("{}", e.user_message()),
            },
            Input::Settled if !session.is_busy() => print_snapshot(&session.snapshot()),
            Input::Settled => {}
        }
    }

    tracing::info!(dashboard = %name, "Dashboard session closed");
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("== {} ==", snapshot.title);
    if !snapshot.search.is_empty() {
        println!("search: {}", snapshot.search);
    }
    if !snapshot.filters.is_empty() {
        println!("filters: {}", snapshot.filters.join(" "));
    }
    println!("    {}", snapshot.columns.join(" | "));
    for row in &snapshot.rows {
        let mark = if row.selected { "[x]" } else { "[ ]" };
        println!("{mark} {}", row.cells.join(" | "));
    }

    let pages: Vec<String> = snapshot
        .pager
        .links
        .iter()
        .map(|link| match link.item {
            PageItem::Page(n) if link.active => format!("[{n}]"),
            PageItem::Page(n) => n.to_string(),
            PageItem::Ellipsis => "...".to_string(),
        })
        .collect();
    let prev = if snapshot.pager.previous_enabled { "<" } else { " " };
    let next = if snapshot.pager.next_enabled { ">" } else { " " };
    println!("{prev} {} {next}", pages.join(" "));

    if snapshot.selected > 0 {
        println!("{} selected", snapshot.selected);
    }
    println!("{}", snapshot.status);
}
