use serde::{Deserialize, Serialize};

use crate::item::{CatalogId, Item, TrackHandle};

/// Body of `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from the `/login` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,
}

/// Response from `/tracks/{id}`, and each entry of a track list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackModel {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub stream_url: String,
}

impl TrackModel {
    pub fn into_item(self) -> Item {
        Item::from_track(
            CatalogId::new(self.id),
            &self.title,
            &self.artists,
            TrackHandle::new(self.stream_url),
        )
    }
}

/// Response from `/albums/{id}` and `/playlists/{id}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackListModel {
    #[serde(default)]
    pub name: String,
    pub tracks: Vec<TrackModel>,
}
