use crate::config;
use crate::core::processor::JobParams;
use crate::logging::{log, LogLevel};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Finds unplayable tracks across your playlists and Liked Songs and collects them into a new playlist.",
    long_about = None
)]
pub struct CliArgs {
    #[arg(
        long,
        env = "SPOTIFY_ACCESS_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN",
        required_unless_present = "fixture",
        help = "Web API access token (scopes: playlist-read-private, user-library-read, playlist-modify-private)"
    )]
    token: Option<String>,

    #[arg(
        long,
        value_name = "PLAYLIST",
        help = "Scan only this playlist (id, spotify:playlist: URI or open.spotify.com URL)"
    )]
    only: Option<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Scan at most N of your playlists (0 = all)"
    )]
    max_playlists: Option<usize>,

    #[arg(long, help = "Do not scan Liked Songs")]
    skip_liked: bool,

    #[arg(long, help = "Scan and report only; do not create a playlist")]
    dry_run: bool,

    #[arg(
        long,
        default_value_t = config::MAX_WRITE_BATCH,
        value_name = "N",
        help = "URIs per add request, clamped to 1..=100"
    )]
    batch_size: usize,

    #[arg(
        long,
        default_value = config::DEFAULT_OUT_DIR,
        value_name = "DIR_PATH",
        help = "Output directory for the CSV exports"
    )]
    out_dir: String,

    #[arg(
        long,
        default_value_t = config::DEFAULT_POLL_MS,
        value_name = "MS",
        help = "Progress polling interval in milliseconds"
    )]
    poll_ms: u64,

    #[arg(
        long,
        value_name = "FILE_PATH",
        help = "Run offline against a local JSON catalog fixture instead of the live API"
    )]
    fixture: Option<String>,
}

impl CliArgs {
    pub fn get_out_dir(&self) -> PathBuf {
        PathBuf::from(&self.out_dir)
    }

    pub fn get_fixture_file(&self) -> Option<PathBuf> {
        self.fixture.as_deref().map(PathBuf::from)
    }

    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    pub fn to_params(&self) -> JobParams {
        let batch_size = config::clamp_batch_size(self.batch_size);
        if batch_size != self.batch_size {
            log(
                LogLevel::Warning,
                &format!(
                    "Batch size {} out of range, using {}.",
                    self.batch_size, batch_size
                ),
            );
        }
        JobParams {
            only_playlist: self.only.clone(),
            max_playlists: self.max_playlists,
            include_saved: !self.skip_liked,
            dry_run: self.dry_run,
            batch_size,
        }
    }
}
