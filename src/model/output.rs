use crate::config;
use crate::core::classify::Reason;
use crate::model::common::PlaylistId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowSource {
    Playlist { id: PlaylistId, name: String },
    LikedSongs,
}

impl RowSource {
    pub fn label(&self) -> &str {
        match self {
            RowSource::Playlist { name, .. } => name,
            RowSource::LikedSongs => config::LIKED_SONGS_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableRow {
    pub source: RowSource,
    pub added_at: Option<String>,
    pub track_name: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub uri: Option<String>,
    pub reasons: Vec<Reason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadUriRecord {
    pub uri: String,
    pub note: String,
}

impl BadUriRecord {
    pub const INVALID_FORMAT: &'static str = "invalid_uri_format";

    pub fn invalid_format(uri: &str) -> Self {
        BadUriRecord {
            uri: uri.to_string(),
            note: Self::INVALID_FORMAT.to_string(),
        }
    }

    pub fn add_failed(uri: &str, detail: &str) -> Self {
        BadUriRecord {
            uri: uri.to_string(),
            note: format!("add_failed:{}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub status: String,
    pub running: bool,
    pub processed: u64,
    pub total: u64,
    pub total_complete: bool,
    pub result: Option<String>,
    pub playlist_url: Option<String>,
    pub unavailable_count: usize,
    pub bad_uri_count: usize,
}

pub trait TabularRow {
    const HEADERS: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

impl TabularRow for UnavailableRow {
    const HEADERS: &'static [&'static str] = &[
        "playlist", "added_at", "track", "artists", "album", "uri", "reasons",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.source.label().to_string(),
            self.added_at.clone().unwrap_or_default(),
            self.track_name.clone().unwrap_or_default(),
            self.artists.join(", "),
            self.album.clone().unwrap_or_default(),
            self.uri.clone().unwrap_or_default(),
            self.reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        ]
    }
}

impl TabularRow for BadUriRecord {
    const HEADERS: &'static [&'static str] = &["uri", "note"];

    fn fields(&self) -> Vec<String> {
        vec![self.uri.clone(), self.note.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_records<R: TabularRow>(records: &[R]) -> Self {
        Table {
            headers: R::HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: records.iter().map(TabularRow::fields).collect(),
        }
    }
}
