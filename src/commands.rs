use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::app::log_store::{LocalFsLogStore, LogStore};
use crate::app::runner::{BatchReport, RunError, SiteRunner, openai_coordinator};
use crate::backend::RetryPolicy;
use crate::batch::BatchOptions;
use crate::cli::{GenerateArgs, HistoryArgs, StatsArgs};
use crate::config::OpenAiConfig;
use crate::model::{GenerationRequest, Style};
use crate::render::SiteRenderer;

pub async fn generate(args: GenerateArgs) -> Result<BatchReport, RunError> {
    let style = args.style.parse::<Style>()?;
    let request = GenerationRequest::new(args.topic, args.count, style, args.tokens)?;

    let config = OpenAiConfig::from_env().context("load OpenAI config")?;
    let retry = RetryPolicy {
        max_attempts: args.max_attempts.max(1),
        ..RetryPolicy::default()
    };
    let options = BatchOptions {
        concurrency: args.concurrency,
        deadline: args.deadline_secs.map(Duration::from_secs),
        seed: args.seed,
    };
    let coordinator = openai_coordinator(&config, retry, options)?;

    let log_store: Arc<dyn LogStore> = Arc::new(LocalFsLogStore::new(&args.data_dir));
    let runner = SiteRunner::new(
        coordinator,
        SiteRenderer::new()?,
        log_store,
        PathBuf::from(&args.out),
    );
    runner.run(request).await
}

pub fn print_report(
    report: &BatchReport,
    requested: u32,
    out: &mut impl Write,
) -> std::io::Result<()> {
    for site in &report.sites {
        writeln!(
            out,
            "site {} [{} / {}] {}",
            site.site_id,
            site.template_id,
            site.color_scheme,
            site.file_path.display()
        )?;
    }
    for failure in &report.failed {
        writeln!(
            out,
            "failed site {} at {} ({}): {}",
            failure.site_index, failure.slot_description, failure.error_kind, failure.message
        )?;
    }
    writeln!(
        out,
        "generated {}/{} sites for {:?}",
        report.generated_count, requested, report.topic
    )
}

pub async fn history(args: HistoryArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let store = LocalFsLogStore::new(&args.data_dir);
    let logs = store.history(args.offset, args.limit).await?;
    for log in logs {
        let line = serde_json::to_string(&log).context("serialize generation log")?;
        writeln!(out, "{line}").context("write history")?;
    }
    Ok(())
}

pub async fn stats(args: StatsArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let store = LocalFsLogStore::new(&args.data_dir);
    let stats = store.stats().await?;
    let json = serde_json::to_string_pretty(&stats).context("serialize stats")?;
    writeln!(out, "{json}").context("write stats")?;
    Ok(())
}
