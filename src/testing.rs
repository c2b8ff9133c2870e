use crate::core::catalog::Catalog;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::common::{CurrentUser, Page, Playlist, PlaylistEntry, Track};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct FakePlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
    #[serde(default)]
    pub fail_count: bool,
    #[serde(default)]
    pub fail_at_offset: Option<u32>,
}

impl FakePlaylist {
    pub fn new(id: &str, name: &str) -> Self {
        FakePlaylist {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: None,
            entries: Vec::new(),
            fail_count: false,
            fail_at_offset: None,
        }
    }

    pub fn with_entries(mut self, entries: Vec<PlaylistEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    pub fn failing_at_offset(mut self, offset: u32) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }

    fn as_playlist(&self) -> Playlist {
        Playlist {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            owner_id: self.owner_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFixture {
    pub user: CurrentUser,
    #[serde(default)]
    pub playlists: Vec<FakePlaylist>,
    #[serde(default)]
    pub saved: Vec<PlaylistEntry>,
    #[serde(default)]
    pub reject_uris: Vec<String>,
}

#[derive(Debug, Default)]
struct Writes {
    created: Vec<Playlist>,
    added: HashMap<String, Vec<String>>,
    add_calls: usize,
}

#[derive(Debug)]
pub struct FakeCatalog {
    user: CurrentUser,
    playlists: Vec<FakePlaylist>,
    saved: Vec<PlaylistEntry>,
    fail_saved_count: bool,
    rejected: HashSet<String>,
    add_failure: Option<AppError>,
    writes: Mutex<Writes>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        FakeCatalog {
            user: CurrentUser {
                id: "tester".to_string(),
                country: Some("DE".to_string()),
            },
            playlists: Vec::new(),
            saved: Vec::new(),
            fail_saved_count: false,
            rejected: HashSet::new(),
            add_failure: None,
            writes: Mutex::new(Writes::default()),
        }
    }
}

impl From<CatalogFixture> for FakeCatalog {
    fn from(fixture: CatalogFixture) -> Self {
        FakeCatalog {
            user: fixture.user,
            playlists: fixture.playlists,
            saved: fixture.saved,
            rejected: fixture.reject_uris.into_iter().collect(),
            ..FakeCatalog::default()
        }
    }
}

impl FakeCatalog {
    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.user = user;
        self
    }

    pub fn with_playlist(mut self, playlist: FakePlaylist) -> Self {
        self.playlists.push(playlist);
        self
    }

    pub fn with_saved(mut self, entries: Vec<PlaylistEntry>) -> Self {
        self.saved = entries;
        self
    }

    pub fn failing_saved_count(mut self) -> Self {
        self.fail_saved_count = true;
        self
    }

    pub fn rejecting<I: IntoIterator<Item = String>>(mut self, uris: I) -> Self {
        self.rejected.extend(uris);
        self
    }

    pub fn failing_adds_with(mut self, error: AppError) -> Self {
        self.add_failure = Some(error);
        self
    }

    fn writes(&self) -> MutexGuard<'_, Writes> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn created_playlists(&self) -> Vec<Playlist> {
        self.writes().created.clone()
    }

    pub fn added_to(&self, playlist_id: &str) -> Vec<String> {
        self.writes()
            .added
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_call_count(&self) -> usize {
        self.writes().add_calls
    }

    fn find(&self, playlist_id: &str, endpoint: &str) -> AppResult<&FakePlaylist> {
        self.playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::api_error(404, "Resource not found", endpoint))
    }
}

fn page_of<T: Clone>(all: &[T], limit: u32, offset: u32) -> Page<T> {
    let start = (offset as usize).min(all.len());
    let end = start.saturating_add(limit as usize).min(all.len());
    Page {
        items: all[start..end].to_vec(),
        has_next: end < all.len(),
        total: Some(all.len() as u64),
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn current_user(&self) -> AppResult<CurrentUser> {
        Ok(self.user.clone())
    }

    async fn list_playlists(&self, limit: u32, offset: u32) -> AppResult<Page<Playlist>> {
        let all: Vec<Playlist> = self.playlists.iter().map(FakePlaylist::as_playlist).collect();
        Ok(page_of(&all, limit, offset))
    }

    async fn playlist(&self, playlist_id: &str) -> AppResult<Playlist> {
        self.find(playlist_id, "playlist").map(FakePlaylist::as_playlist)
    }

    async fn playlist_item_count(&self, playlist_id: &str) -> AppResult<u64> {
        let playlist = self.find(playlist_id, "playlist_total")?;
        if playlist.fail_count {
            return Err(AppError::api_error(500, "Internal Server Error", "playlist_total"));
        }
        Ok(playlist.entries.len() as u64)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> AppResult<Page<PlaylistEntry>> {
        let playlist = self.find(playlist_id, "playlist_items")?;
        if playlist.fail_at_offset.is_some_and(|at| offset >= at) {
            return Err(AppError::api_error(502, "Bad Gateway", "playlist_items"));
        }
        Ok(page_of(&playlist.entries, limit, offset))
    }

    async fn saved_track_count(&self) -> AppResult<u64> {
        if self.fail_saved_count {
            return Err(AppError::api_error(503, "Service Unavailable", "saved_total"));
        }
        Ok(self.saved.len() as u64)
    }

    async fn list_saved_tracks(&self, limit: u32, offset: u32) -> AppResult<Page<PlaylistEntry>> {
        Ok(page_of(&self.saved, limit, offset))
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        _public: bool,
        _description: &str,
    ) -> AppResult<Playlist> {
        let mut writes = self.writes();
        let playlist = Playlist {
            id: format!("created{:0>15}", writes.created.len() + 1),
            name: Some(name.to_string()),
            owner_id: Some(owner_id.to_string()),
        };
        writes.created.push(playlist.clone());
        Ok(playlist)
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> AppResult<()> {
        let mut writes = self.writes();
        writes.add_calls += 1;
        if let Some(error) = &self.add_failure {
            return Err(error.clone());
        }
        if let Some(bad) = uris.iter().find(|u| self.rejected.contains(*u)) {
            return Err(AppError::api_error(
                400,
                format!("Invalid track uri: {}", bad),
                "add_tracks",
            ));
        }
        writes
            .added
            .entry(playlist_id.to_string())
            .or_default()
            .extend(uris.iter().cloned());
        Ok(())
    }
}

pub async fn load_fixture(path: &Path) -> AppResult<FakeCatalog> {
    log(
        LogLevel::Info,
        &format!("Loading catalog fixture: {}", path.display()),
    );
    let json_content = fs::read_to_string(path).await.map_err(AppError::from)?;
    let fixture: CatalogFixture = serde_json::from_str(&json_content).map_err(AppError::from)?;
    log(
        LogLevel::Info,
        &format!(
            "Fixture has {} playlist(s) and {} saved track(s).",
            fixture.playlists.len(),
            fixture.saved.len()
        ),
    );
    Ok(FakeCatalog::from(fixture))
}

pub fn playable_track(n: u32) -> Track {
    let id = format!("{:0>22}", n);
    Track {
        uri: Some(format!("spotify:track:{}", id)),
        id: Some(id),
        name: Some(format!("Track {}", n)),
        is_playable: Some(true),
        ..Track::default()
    }
}

pub fn playable_entry(n: u32) -> PlaylistEntry {
    PlaylistEntry {
        added_at: Some("2020-01-01T00:00:00Z".to_string()),
        track: Some(playable_track(n)),
    }
}

pub fn unplayable_entry(n: u32) -> PlaylistEntry {
    PlaylistEntry {
        added_at: Some("2020-01-01T00:00:00Z".to_string()),
        track: Some(Track {
            is_playable: Some(false),
            ..playable_track(n)
        }),
    }
}

pub fn ghost_entry() -> PlaylistEntry {
    PlaylistEntry {
        added_at: Some("2019-05-05T00:00:00Z".to_string()),
        track: None,
    }
}
