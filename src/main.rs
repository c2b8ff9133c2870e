use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Builder;
use unplayable_sweep::api::client::ApiClient;
use unplayable_sweep::cli::CliArgs;
use unplayable_sweep::config::{self, Settings};
use unplayable_sweep::core::catalog::Catalog;
use unplayable_sweep::core::processor::JobService;
use unplayable_sweep::core::stats;
use unplayable_sweep::error::{AppError, AppResult};
use unplayable_sweep::io;
use unplayable_sweep::logging::{log, setup_logging, LogLevel};
use unplayable_sweep::testing;

fn main() -> ExitCode {
    setup_logging();

    let cli_args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            log(LogLevel::Error, &format!("CLI Argument Error: {}", e));
            let _ = CliArgs::command().print_help();
            return ExitCode::from(2);
        }
    };

    let runtime = match Builder::new_multi_thread()
        .enable_all()
        .thread_name("sweep-worker")
        .worker_threads(num_cpus::get())
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("FATAL: Failed to build Tokio runtime: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let main_result: AppResult<i32> = runtime.block_on(run(cli_args));

    match main_result {
        Ok(exit_code) => ExitCode::from(exit_code as u8),
        Err(e) => {
            log(LogLevel::Error, &format!("FATAL: {}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> AppResult<i32> {
    let settings = Settings::from_env()?;

    let catalog: Arc<dyn Catalog> = match args.get_fixture_file() {
        Some(fixture_path) => {
            if !fixture_path.exists() {
                return Err(AppError::Argument(format!(
                    "Fixture file not found: {}",
                    fixture_path.display()
                )));
            }
            Arc::new(testing::load_fixture(&fixture_path).await?)
        }
        None => {
            let token = args
                .get_token()
                .ok_or_else(|| AppError::Argument("An access token is required.".to_string()))?;
            Arc::new(ApiClient::new(token, &settings)?)
        }
    };

    let out_dir = args.get_out_dir();
    io::ensure_output_dir(&out_dir).await?;

    let started = Instant::now();
    let service = JobService::new(catalog, settings);
    let job_id = service.start(args.to_params());

    let mut last_processed = None;
    let view = service
        .wait_for(&job_id, args.get_poll_interval(), |view| {
            if last_processed != Some(view.processed) {
                last_processed = Some(view.processed);
                log(
                    LogLevel::Info,
                    &format!(
                        "Progress: {}/{}{} item(s), {} unavailable.",
                        view.processed,
                        view.total,
                        if view.total_complete { "" } else { "+" },
                        view.unavailable_count
                    ),
                );
            }
        })
        .await?;

    stats::print_summary(&view, started.elapsed());

    if let Some(table) = service.export_unavailable_rows(&job_id) {
        io::save_csv(out_dir.join(config::UNAVAILABLE_CSV_FILE), table, "unavailable tracks").await?;
    }
    if let Some(table) = service.export_bad_uri_rows(&job_id) {
        io::save_csv(out_dir.join(config::BAD_URI_CSV_FILE), table, "bad URIs").await?;
    }

    Ok(stats::determine_exit_code(&view))
}
