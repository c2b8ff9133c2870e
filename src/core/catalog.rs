use crate::error::AppResult;
use crate::model::common::{CurrentUser, Page, Playlist, PlaylistEntry};
use async_trait::async_trait;

/// `add_tracks` must fail with an error for which
/// [`AppError::is_rejection`](crate::error::AppError::is_rejection) holds when
/// the service refuses the submitted URIs themselves.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn current_user(&self) -> AppResult<CurrentUser>;

    async fn list_playlists(&self, limit: u32, offset: u32) -> AppResult<Page<Playlist>>;

    async fn playlist(&self, playlist_id: &str) -> AppResult<Playlist>;

    async fn playlist_item_count(&self, playlist_id: &str) -> AppResult<u64>;

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> AppResult<Page<PlaylistEntry>>;

    async fn saved_track_count(&self) -> AppResult<u64>;

    async fn list_saved_tracks(&self, limit: u32, offset: u32) -> AppResult<Page<PlaylistEntry>>;

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> AppResult<Playlist>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> AppResult<()>;
}
