use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use sitegen::app::runner::RunError;
use sitegen::cli::{Cli, Command};

const EXIT_VALIDATION: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    sitegen::logging::init(cli.log_format).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Generate(args) => {
            let requested = args.count;
            match sitegen::commands::generate(args).await {
                Ok(report) => {
                    sitegen::commands::print_report(&report, requested, &mut stdout)
                        .context("write report")?;
                    if report.generated_count == 0 {
                        return Ok(ExitCode::FAILURE);
                    }
                }
                Err(RunError::Validation(err)) => {
                    eprintln!("invalid request: {err}");
                    return Ok(ExitCode::from(EXIT_VALIDATION));
                }
                Err(RunError::Internal(err)) => return Err(err.context("generate")),
            }
        }
        Command::History(args) => {
            sitegen::commands::history(args, &mut stdout)
                .await
                .context("history")?;
        }
        Command::Stats(args) => {
            sitegen::commands::stats(args, &mut stdout)
                .await
                .context("stats")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
