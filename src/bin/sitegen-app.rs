use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use sitegen::app::http::{AppState, router};
use sitegen::app::log_store::{LocalFsLogStore, LogStore};
use sitegen::app::runner::{SiteRunner, openai_coordinator};
use sitegen::backend::RetryPolicy;
use sitegen::batch::BatchOptions;
use sitegen::config::OpenAiConfig;
use sitegen::logging::LogFormat;
use sitegen::render::SiteRenderer;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Directory holding the generation logs.
    #[arg(long, default_value = "workspace-app")]
    data_dir: PathBuf,

    /// Directory for rendered HTML pages.
    #[arg(long, default_value = "workspace-app/sites")]
    out: PathBuf,

    /// Maximum sites generated at the same time, shared by all requests.
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Per-request batch deadline in seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    sitegen::logging::init(args.log_format)?;
    tracing::info!(?args, "starting sitegen-app");

    let config = OpenAiConfig::from_env()?;
    let retry = RetryPolicy {
        max_attempts: args.max_attempts.max(1),
        ..RetryPolicy::default()
    };
    let options = BatchOptions {
        concurrency: args.concurrency,
        deadline: args.deadline_secs.map(Duration::from_secs),
        seed: None,
    };
    let log_store: Arc<dyn LogStore> = Arc::new(LocalFsLogStore::new(&args.data_dir));
    let runner = SiteRunner::new(
        openai_coordinator(&config, retry, options)?,
        SiteRenderer::new()?,
        log_store,
        args.out.clone(),
    );
    let app = router(AppState {
        runner: Arc::new(runner),
    });

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
