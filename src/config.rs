use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::Duration;

pub const DEFAULT_OUT_DIR: &str = "./sweep_output";

pub const HTTP_TIMEOUT_SECONDS: u64 = 20;
pub const HTTP_CONNECT_TIMEOUT: u64 = 10;
pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_BASE_SECS: f32 = 1.0;
pub const MAX_RETRY_AFTER_SECS: u64 = 60;

pub const API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const PLAYLIST_URL_BASE: &str = "https://open.spotify.com/playlist/";

pub const PLAYLIST_PAGE_SIZE: u32 = 50;
pub const PLAYLIST_ITEM_PAGE_SIZE: u32 = 100;
pub const SAVED_TRACK_PAGE_SIZE: u32 = 50;

pub const MIN_WRITE_BATCH: usize = 1;
pub const MAX_WRITE_BATCH: usize = 100;

pub const DEFAULT_PACING_SECS: f32 = 0.05;
pub const DEFAULT_JOB_RETENTION_SECS: u64 = 3600;
pub const DEFAULT_POLL_MS: u64 = 1000;

pub const PLAYLIST_FIELDS: &str = "id,name,owner(id)";
pub const PLAYLIST_TOTAL_FIELDS: &str = "total";
pub const PLAYLIST_ITEM_FIELDS: &str = "items(added_at,track(uri,id,name,is_playable,available_markets,restrictions,artists(name),album(name))),next";
pub const FROM_TOKEN_MARKET: &str = "from_token";

pub const REMEDIATION_NAME_PREFIX: &str = "Unavailable tracks";
pub const REMEDIATION_DESCRIPTION: &str = "Collected automatically";
pub const LIKED_SONGS_LABEL: &str = "Liked Songs";

pub const UNAVAILABLE_CSV_FILE: &str = "unavailable_tracks.csv";
pub const BAD_URI_CSV_FILE: &str = "bad_uris.csv";

pub static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut h = HeaderMap::new();
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h
});

pub static TRACK_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^spotify:track:[0-9A-Za-z]{22}$").unwrap());
pub static BARE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z]{22}$").unwrap());
pub static SCHEME_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^spotify:[a-z]+:([0-9A-Za-z]{22})$").unwrap());
pub static WEB_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://open\.spotify\.com/(?:intl-[A-Za-z-]+/)?[a-z]+/([0-9A-Za-z]{22})(?:[/?#].*)?$")
        .unwrap()
});

#[derive(Debug, Clone)]
pub struct Settings {
    pub pacing: Duration,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub job_retention: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pacing: Duration::from_secs_f32(DEFAULT_PACING_SECS),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECONDS),
            max_retries: MAX_RETRIES,
            job_retention: Duration::from_secs(DEFAULT_JOB_RETENTION_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Settings::default();
        Ok(Settings {
            pacing: env_parse::<f32>("RATE_LIMIT_SLEEP")?
                .map(|secs| Duration::from_secs_f32(secs.max(0.0)))
                .unwrap_or(defaults.pacing),
            http_timeout: env_parse::<f32>("SPOTIFY_TIMEOUT")?
                .map(|secs| Duration::from_secs_f32(secs.max(1.0)))
                .unwrap_or(defaults.http_timeout),
            max_retries: env_parse::<u32>("SPOTIFY_RETRIES")?.unwrap_or(defaults.max_retries),
            job_retention: env_parse::<u64>("JOB_RETENTION_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_retention),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> AppResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::ConfigError(format!("Environment variable {} has invalid value '{}'", key, raw))
        }),
        Err(_) => Ok(None),
    }
}

pub fn clamp_batch_size(requested: usize) -> usize {
    requested.clamp(MIN_WRITE_BATCH, MAX_WRITE_BATCH)
}
