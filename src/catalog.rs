//! Catalog lookups: turning a validated link into queued items.

use async_trait::async_trait;

use crate::error::Result;
use crate::item::Item;
use crate::link::{CatalogLink, LinkKind};

/// Resolves catalog links into track metadata.
///
/// Implementations must not partially succeed: on error nothing is returned
/// and nothing gets queued.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Tracks of a playlist, in playlist order.
    async fn fetch_playlist(&self, link: &CatalogLink) -> Result<Vec<Item>>;

    async fn fetch_track(&self, link: &CatalogLink) -> Result<Item>;

    /// Tracks of an album, in album order.
    async fn fetch_album(&self, link: &CatalogLink) -> Result<Vec<Item>>;
}

/// Fetches the items a link points at, dispatching on its kind.
///
/// # Errors
///
/// Propagates the catalog's error; callers then leave the selection
/// unchanged.
pub async fn resolve(catalog: &dyn Catalog, link: &CatalogLink) -> Result<Vec<Item>> {
    let items = match link.kind() {
        LinkKind::Playlist => catalog.fetch_playlist(link).await?,
        LinkKind::Track => vec![catalog.fetch_track(link).await?],
        LinkKind::Album => catalog.fetch_album(link).await?,
    };
    log::info!("Fetched {} item(s) from {link}", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::item::{CatalogId, TrackHandle};
    use crate::link::parse_link;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCatalog {
        calls: Mutex<Vec<String>>,
    }

    fn track(id: &str) -> Item {
        Item::new(CatalogId::new(id), id, TrackHandle::new(id))
    }

    #[async_trait]
    impl Catalog for RecordingCatalog {
        async fn fetch_playlist(&self, link: &CatalogLink) -> Result<Vec<Item>> {
            self.calls.lock().unwrap().push(format!("playlist:{}", link.id()));
            Ok(vec![track("p1"), track("p2")])
        }

        async fn fetch_track(&self, link: &CatalogLink) -> Result<Item> {
            self.calls.lock().unwrap().push(format!("track:{}", link.id()));
            if link.id() == "missing" {
                return Err(Error::Catalog("no such track".to_string()));
            }
            Ok(track(link.id()))
        }

        async fn fetch_album(&self, link: &CatalogLink) -> Result<Vec<Item>> {
            self.calls.lock().unwrap().push(format!("album:{}", link.id()));
            Ok(vec![track("a1"), track("a2"), track("a3")])
        }
    }

    #[tokio::test]
    async fn resolve_dispatches_on_kind() {
        let catalog = RecordingCatalog::default();
        let link = parse_link("spotify:album:xyz").unwrap();
        let items = resolve(&catalog, &link).await.unwrap();
        assert_eq!(items.len(), 3);

        let link = parse_link("spotify:playlist:pl").unwrap();
        assert_eq!(resolve(&catalog, &link).await.unwrap().len(), 2);

        let link = parse_link("spotify:track:t9").unwrap();
        let items = resolve(&catalog, &link).await.unwrap();
        assert_eq!(items[0].id().as_str(), "t9");

        assert_eq!(
            *catalog.calls.lock().unwrap(),
            vec!["album:xyz", "playlist:pl", "track:t9"]
        );
    }

    #[tokio::test]
    async fn resolve_propagates_fetch_failure() {
        let catalog = RecordingCatalog::default();
        let link = parse_link("spotify:track:missing").unwrap();
        assert!(matches!(
            resolve(&catalog, &link).await,
            Err(Error::Catalog(_))
        ));
    }
}
