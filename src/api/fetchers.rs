use super::client::ApiClient;
use super::model::{
    ApiAddItems, ApiCreatePlaylist, ApiPaging, ApiPlaylist, ApiTotal, ApiTrackEntry, ApiUser,
};
use crate::config;
use crate::core::catalog::Catalog;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::common::{CurrentUser, Page, Playlist, PlaylistEntry};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::IgnoredAny;

const NO_BODY: Option<&()> = None;

fn paging_params(limit: u32, offset: u32) -> Vec<(&'static str, String)> {
    vec![("limit", limit.to_string()), ("offset", offset.to_string())]
}

#[async_trait]
impl Catalog for ApiClient {
    async fn current_user(&self) -> AppResult<CurrentUser> {
        let user: ApiUser = self
            .fetch(Method::GET, "me", "/me", &[], NO_BODY)
            .await
            .inspect_err(|e| {
                log(LogLevel::Error, &format!("User Fetch FAIL: {}", e));
            })?;
        Ok(user.into())
    }

    async fn list_playlists(&self, limit: u32, offset: u32) -> AppResult<Page<Playlist>> {
        let paging: ApiPaging<ApiPlaylist> = self
            .fetch(
                Method::GET,
                "my_playlists",
                "/me/playlists",
                &paging_params(limit, offset),
                NO_BODY,
            )
            .await?;
        Ok(paging.into_page())
    }

    async fn playlist(&self, playlist_id: &str) -> AppResult<Playlist> {
        let params = [("fields", config::PLAYLIST_FIELDS.to_string())];
        let playlist: ApiPlaylist = self
            .fetch(
                Method::GET,
                "playlist",
                &format!("/playlists/{}", playlist_id),
                &params,
                NO_BODY,
            )
            .await
            .inspect_err(|e| {
                log(
                    LogLevel::Warning,
                    &format!("Playlist Fetch FAIL [{}]: {}", playlist_id, e),
                );
            })?;
        Ok(playlist.into())
    }

    async fn playlist_item_count(&self, playlist_id: &str) -> AppResult<u64> {
        let params = [
            ("limit", "1".to_string()),
            ("fields", config::PLAYLIST_TOTAL_FIELDS.to_string()),
        ];
        let endpoint_name = "playlist_total";
        let resp: ApiTotal = self
            .fetch(
                Method::GET,
                endpoint_name,
                &format!("/playlists/{}/tracks", playlist_id),
                &params,
                NO_BODY,
            )
            .await?;
        resp.total
            .ok_or_else(|| AppError::response_invalid("missing 'total'", endpoint_name))
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> AppResult<Page<PlaylistEntry>> {
        let mut params = paging_params(limit, offset);
        params.extend([
            ("market", config::FROM_TOKEN_MARKET.to_string()),
            ("additional_types", "track".to_string()),
            ("fields", config::PLAYLIST_ITEM_FIELDS.to_string()),
        ]);
        let paging: ApiPaging<ApiTrackEntry> = self
            .fetch(
                Method::GET,
                "playlist_items",
                &format!("/playlists/{}/tracks", playlist_id),
                &params,
                NO_BODY,
            )
            .await
            .inspect_err(|e| {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Playlist Items FAIL [{} @ {}]: {}",
                        playlist_id, offset, e
                    ),
                );
            })?;
        Ok(paging.into_page())
    }

    async fn saved_track_count(&self) -> AppResult<u64> {
        let endpoint_name = "saved_total";
        let resp: ApiTotal = self
            .fetch(
                Method::GET,
                endpoint_name,
                "/me/tracks",
                &paging_params(1, 0),
                NO_BODY,
            )
            .await?;
        resp.total
            .ok_or_else(|| AppError::response_invalid("missing 'total'", endpoint_name))
    }

    async fn list_saved_tracks(&self, limit: u32, offset: u32) -> AppResult<Page<PlaylistEntry>> {
        let mut params = paging_params(limit, offset);
        params.push(("market", config::FROM_TOKEN_MARKET.to_string()));
        let paging: ApiPaging<ApiTrackEntry> = self
            .fetch(Method::GET, "saved_tracks", "/me/tracks", &params, NO_BODY)
            .await?;
        Ok(paging.into_page())
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> AppResult<Playlist> {
        let payload = ApiCreatePlaylist {
            name,
            public,
            description,
        };
        let created: ApiPlaylist = self
            .fetch(
                Method::POST,
                "create_playlist",
                &format!("/users/{}/playlists", owner_id),
                &[],
                Some(&payload),
            )
            .await
            .inspect_err(|e| {
                log(
                    LogLevel::Error,
                    &format!("Create Playlist FAIL ['{}']: {}", name, e),
                );
            })?;
        log(
            LogLevel::Info,
            &format!("Created playlist '{}' ({}).", name, created.id),
        );
        Ok(created.into())
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> AppResult<()> {
        let payload = ApiAddItems { uris };
        let _: IgnoredAny = self
            .fetch(
                Method::POST,
                "add_tracks",
                &format!("/playlists/{}/tracks", playlist_id),
                &[],
                Some(&payload),
            )
            .await?;
        Ok(())
    }
}
