use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::output::Table;
use crate::utils;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

const LINE_END: &str = "\r\n";

pub async fn ensure_output_dir(base_dir: &Path) -> AppResult<()> {
    log(
        LogLevel::Info,
        &format!("Ensuring output directory exists: {}", base_dir.display()),
    );
    fs::create_dir_all(base_dir)
        .await
        .map_err(|e| map_io_error(e, base_dir))
}

fn map_io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::Io(format!("I/O error at path '{}': {}", path.display(), error))
}

async fn write_file_async(fpath: &Path, data: &[u8]) -> AppResult<()> {
    let mut file = File::create(fpath)
        .await
        .map_err(|e| map_io_error(e, fpath))?;
    file.write_all(data)
        .await
        .map_err(|e| map_io_error(e, fpath))?;
    file.flush().await.map_err(|e| map_io_error(e, fpath))?;

    Ok(())
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

fn push_line<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field.as_ref());
    }
    out.push_str(LINE_END);
}

pub fn render_csv(table: &Table) -> String {
    let mut out = String::new();
    push_line(&mut out, &table.headers);
    for row in &table.rows {
        push_line(&mut out, row);
    }
    out
}

pub async fn save_csv(fpath: PathBuf, table: Table, log_ctx: &str) -> AppResult<usize> {
    let row_count = table.rows.len();
    let rendered = utils::run_blocking(move || Ok(render_csv(&table))).await?;

    match write_file_async(&fpath, rendered.as_bytes()).await {
        Ok(()) => {
            log(
                LogLevel::Success,
                &format!(
                    "Saved {} ({} row(s)) to '{}'.",
                    log_ctx,
                    row_count,
                    fpath.display()
                ),
            );
            Ok(row_count)
        }
        Err(e) => {
            log(
                LogLevel::Error,
                &format!(
                    "Save CSV ({}) FAIL - Write Error: {}. File: '{}'",
                    log_ctx,
                    e,
                    fpath.display()
                ),
            );

            if fs::try_exists(&fpath).await.unwrap_or(false) {
                let _ = fs::remove_file(&fpath).await;
            }

            Err(e)
        }
    }
}
