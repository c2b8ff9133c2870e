use crate::model::common::{CurrentUser, Page, Playlist, PlaylistEntry, Track};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
pub struct ApiPaging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> ApiPaging<T> {
    pub fn into_page<U: From<T>>(self) -> Page<U> {
        Page {
            has_next: self.next.as_deref().is_some_and(|n| !n.is_empty()),
            total: self.total,
            items: self.items.into_iter().map(U::from).collect(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiTotal {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ApiNamed {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiOwner {
    pub id: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiPlaylist {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<ApiOwner>,
}

impl From<ApiPlaylist> for Playlist {
    fn from(p: ApiPlaylist) -> Self {
        Playlist {
            id: p.id,
            name: p.name,
            owner_id: p.owner.map(|o| o.id),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiRestrictions {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_playable: Option<bool>,
    #[serde(default)]
    pub available_markets: Option<Vec<String>>,
    #[serde(default)]
    pub restrictions: Option<ApiRestrictions>,
    #[serde(default)]
    pub artists: Vec<ApiNamed>,
    #[serde(default)]
    pub album: Option<ApiNamed>,
}

impl From<ApiTrack> for Track {
    fn from(t: ApiTrack) -> Self {
        Track {
            id: t.id,
            uri: t.uri,
            name: t.name,
            is_playable: t.is_playable,
            restriction: t.restrictions.and_then(|r| r.reason),
            available_markets: t.available_markets,
            artists: t.artists.into_iter().filter_map(|a| a.name).collect(),
            album: t.album.and_then(|a| a.name),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiTrackEntry {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<ApiTrack>,
}

impl From<ApiTrackEntry> for PlaylistEntry {
    fn from(e: ApiTrackEntry) -> Self {
        PlaylistEntry {
            added_at: e.added_at,
            track: e.track.map(Track::from),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiUser {
    pub id: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl From<ApiUser> for CurrentUser {
    fn from(u: ApiUser) -> Self {
        CurrentUser {
            id: u.id,
            country: u.country,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ApiCreatePlaylist<'a> {
    pub name: &'a str,
    pub public: bool,
    pub description: &'a str,
}

#[derive(Serialize, Debug, Clone)]
pub struct ApiAddItems<'a> {
    pub uris: &'a [String],
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
}
