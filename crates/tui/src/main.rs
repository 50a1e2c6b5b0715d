mod app;
mod renderer;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::future::join_all;
use ratatui::{Terminal, backend::CrosstermBackend};
use thorn_insight_client::InsightClient;
use thorn_insight_core::model::{Action, Panel, PanelStatus, Session, StageFilter};
use thorn_insight_core::svg::render_svg;
use thorn_insight_protocol::Viewport;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal debugger for the thorn compiler's trace server.
#[derive(Debug, Parser)]
#[command(name = "thorn-insight", version, about)]
struct Args {
    /// Trace server address (host:port or http:// URL)
    #[arg(long, env = "THORN_INSIGHT_ADDR", default_value = "127.0.0.1:8000")]
    addr: String,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Where log output goes while the terminal is in use
    #[arg(long, default_value = "thorn-insight.log")]
    log_file: PathBuf,

    /// Write the graph of `--stage` as SVG to this path and exit
    #[arg(long)]
    export_graph: Option<PathBuf>,

    /// Initial stage filter: all, lexer, parser, canonize-item-path,
    /// type-resolver or llvm. `all` shows the parser graph.
    #[arg(long, default_value = "all")]
    stage: StageFilter,
}

fn init_tracing(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_file)?;

    let client = InsightClient::new(&args.addr, Duration::from_millis(args.timeout_ms))?;
    info!(server = client.base_url(), stage = args.stage.label(), "starting");

    if let Some(path) = &args.export_graph {
        return export_graph(client, args.stage, path).await;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let app = app::App::new(client, Session::with_stage_filter(args.stage), tx);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;

    let result = app::run(&mut terminal, app, rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

/// Fetch one stage's graph and every node preview, then write the laid-out
/// graph as SVG.
async fn export_graph(client: InsightClient, stage: StageFilter, path: &Path) -> Result<()> {
    let mut session = Session::with_stage_filter(stage);
    let mut effects = session.dispatch(Action::Start);

    while !effects.is_empty() {
        let responses = join_all(effects.into_iter().map(|e| client.fulfill(e))).await;
        effects = responses
            .into_iter()
            .flat_map(|r| session.receive(r))
            .collect();
    }

    if let PanelStatus::Failed(message) = session.status(Panel::Graph) {
        bail!("fetching graph: {message}");
    }
    let Some(bounds) = session.graph().bounds() else {
        bail!("the {} graph is empty", session.state().stage_filter.label());
    };
    // Layout already leaves a margin at the top-left; mirror it.
    let viewport = Viewport::sized(bounds.right() + bounds.x, bounds.bottom() + bounds.y);
    let commands = session.graph_commands(&viewport);
    let svg = render_svg(&commands, viewport.width, viewport.height, false);
    std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), nodes = session.graph().graph().len(), "graph exported");
    Ok(())
}
