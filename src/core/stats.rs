use crate::logging::{log, LogLevel};
use crate::model::output::JobView;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub playlists_scanned: usize,
    pub items_scanned: u64,
    pub unavailable_rows: usize,
    pub ghost_rows: usize,
    pub candidates: usize,
    pub rejected_format: usize,
    pub rejected_write: usize,
    pub added: usize,
}

impl ScanStats {
    pub fn dry_run_summary(&self) -> String {
        format!(
            "[DRY RUN] Playlist was not created.\n\
             Writable candidates: {}\n\
             Rejected by format: {}\n\
             Tracks without URI: {}\n\
             Unavailable rows: {}",
            self.candidates, self.rejected_format, self.ghost_rows, self.unavailable_rows
        )
    }

    pub fn live_summary(&self, playlist_name: &str, playlist_url: &str) -> String {
        format!(
            "Created playlist: {}\n\
             URL: {}\n\
             Added tracks: {}\n\
             Rejected by format: {}\n\
             Rejected by write: {}\n\
             Unavailable rows: {}",
            playlist_name,
            playlist_url,
            self.added,
            self.rejected_format,
            self.rejected_write,
            self.unavailable_rows
        )
    }
}

pub fn print_summary(view: &JobView, duration: Duration) {
    let sep = "=".repeat(60);
    let title = format!("Sweep Summary (Job {})", view.id);
    println!("\n{}\n{:^60}\n{}", sep, title, sep);
    println!("{:<22} {}", "Status:", view.status);
    println!("{:<22} {:.3?}", "Total Run Time:", duration);
    let total_note = if view.total_complete { "" } else { " (estimate incomplete)" };
    println!(
        "{:<22} {} / {}{}",
        "Processed:", view.processed, view.total, total_note
    );
    println!("{:<22} {}", "Unavailable rows:", view.unavailable_count);
    println!("{:<22} {}", "Bad URIs:", view.bad_uri_count);
    if let Some(url) = &view.playlist_url {
        println!("{:<22} {}", "Playlist:", url);
    }
    println!("{}", "-".repeat(60));
    if let Some(result) = &view.result {
        println!("{}", result);
        println!("{}", sep);
    }

    log_overall_status(view);

    let end_ts_str = chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string();
    log(
        LogLevel::Step,
        &format!("--- Run Finished at {} ---", end_ts_str),
    );
}

fn log_overall_status(view: &JobView) {
    if view.running {
        log(LogLevel::Warning, "Job is still running.");
    } else if view.status.starts_with("error") {
        log(
            LogLevel::Error,
            &format!("Job failed: {}. Partial findings were still exported.", view.status),
        );
    } else if view.bad_uri_count > 0 {
        log(
            LogLevel::Warning,
            &format!(
                "Job completed; {} URI(s) could not be added. See the bad URI export.",
                view.bad_uri_count
            ),
        );
    } else {
        log(LogLevel::Success, "Job completed successfully.");
    }
}

pub fn determine_exit_code(view: &JobView) -> i32 {
    if view.status == "done" {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_summary_reports_candidates() {
        let stats = ScanStats {
            candidates: 5,
            ..ScanStats::default()
        };
        let summary = stats.dry_run_summary();
        assert!(summary.starts_with("[DRY RUN]"));
        assert!(summary.contains("Writable candidates: 5"));
    }

    #[test]
    fn live_summary_lists_every_counter() {
        let stats = ScanStats {
            added: 4,
            rejected_format: 1,
            rejected_write: 1,
            unavailable_rows: 7,
            ..ScanStats::default()
        };
        let summary = stats.live_summary("Unavailable tracks - 2026-10-15", "https://x/y");
        for line in [
            "Created playlist: Unavailable tracks - 2026-10-15",
            "URL: https://x/y",
            "Added tracks: 4",
            "Rejected by format: 1",
            "Rejected by write: 1",
            "Unavailable rows: 7",
        ] {
            assert!(summary.contains(line), "missing '{}' in {}", line, summary);
        }
    }
}
