use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use super::models::{LoginRequest, LoginResponse, TrackListModel, TrackModel};
use crate::catalog::Catalog;
use crate::config::DownloadConfig;
use crate::downloader::{PercentSink, TrackDownloader};
use crate::error::{Error, Result};
use crate::format::format_bytes;
use crate::fs::{FileSystem, TokioFileSystem, part_path};
use crate::item::Item;
use crate::link::CatalogLink;
use crate::session::{Authenticator, Credentials};

/// Replaces characters that are invalid in file names.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Removes an in-progress file on drop unless [`PartFile::keep`] was called.
///
/// Dropping covers both error returns and a download future that is dropped
/// mid-stream on cancellation.
struct PartFile<'a, F: FileSystem> {
    fs: &'a F,
    path: PathBuf,
    armed: bool,
}

impl<F: FileSystem> PartFile<'_, F> {
    const fn keep(&mut self) {
        self.armed = false;
    }
}

impl<F: FileSystem> Drop for PartFile<'_, F> {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("Removing {}", self.path.display());
            self.fs.discard_file(&self.path);
        }
    }
}

/// Client for the catalog HTTP service.
///
/// Tracks are streamed to `{dir}/{label} [{id}].mp3.part` and renamed into
/// place once the body has been read completely.
pub struct RemoteClient<F: FileSystem = TokioFileSystem> {
    http: reqwest::Client,
    base_url: String,
    config: DownloadConfig,
    fs: F,
}

impl RemoteClient<TokioFileSystem> {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str, config: DownloadConfig) -> Self {
        Self::with_fs(http, base_url, config, TokioFileSystem::new())
    }
}

impl<F: FileSystem> RemoteClient<F> {
    #[must_use]
    pub fn with_fs(http: reqwest::Client, base_url: &str, config: DownloadConfig, fs: F) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            fs,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Final location of an item's file. The catalog id keeps items that
    /// share a label apart.
    #[must_use]
    pub fn target_path(&self, item: &Item) -> PathBuf {
        let label = sanitize_filename(item.label());
        let id = sanitize_filename(item.id().as_str());
        if label.is_empty() {
            self.config.dir.join(format!("{id}.mp3"))
        } else {
            self.config.dir.join(format!("{label} [{id}].mp3"))
        }
    }

    /// Stream handles may be absolute URLs or paths on the catalog host.
    fn stream_url(&self, handle: &str) -> String {
        if handle.starts_with("http://") || handle.starts_with("https://") {
            handle.to_string()
        } else {
            format!("{}/{}", self.base_url, handle.trim_start_matches('/'))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Catalog(format!("{path}: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("Invalid response from {path}: {e}")))
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<Item>> {
        let list: TrackListModel = self.get_json(path).await?;
        log::debug!("{} track(s) in '{}'", list.tracks.len(), list.name);
        Ok(list.tracks.into_iter().map(TrackModel::into_item).collect())
    }

    /// Streams the body at `url` into `part`, reporting percent when the
    /// length is known.
    async fn fetch_to(
        &self,
        url: &str,
        part: &Path,
        progress: &dyn PercentSink,
    ) -> Result<u64> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Download(e.to_string()))?;

        let total = response.content_length().filter(|len| *len > 0);
        let mut file = self.fs.create_file(part).await?;
        let mut written: u64 = 0;
        progress.percent(0);

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(total) = total {
                let pct = written.saturating_mul(100) / total;
                progress.percent(i64::try_from(pct).unwrap_or(i64::MAX));
            }
        }
        file.flush().await?;

        if let Some(total) = total
            && written < total
        {
            return Err(Error::Download(format!(
                "connection closed after {written} of {total} bytes"
            )));
        }
        Ok(written)
    }
}

#[async_trait]
impl<F: FileSystem> Authenticator for RemoteClient<F> {
    async fn login(&self, credentials: &Credentials) -> Result<bool> {
        let body = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        };
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Login(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(false);
        }
        let response = response
            .error_for_status()
            .map_err(|e| Error::Login(e.to_string()))?;
        let reply: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::Login(format!("Invalid login response: {e}")))?;
        Ok(reply.ok)
    }
}

#[async_trait]
impl<F: FileSystem> Catalog for RemoteClient<F> {
    async fn fetch_playlist(&self, link: &CatalogLink) -> Result<Vec<Item>> {
        self.fetch_list(&format!("/playlists/{}", link.id())).await
    }

    async fn fetch_track(&self, link: &CatalogLink) -> Result<Item> {
        let track: TrackModel = self.get_json(&format!("/tracks/{}", link.id())).await?;
        Ok(track.into_item())
    }

    async fn fetch_album(&self, link: &CatalogLink) -> Result<Vec<Item>> {
        self.fetch_list(&format!("/albums/{}", link.id())).await
    }
}

#[async_trait]
impl<F: FileSystem> TrackDownloader for RemoteClient<F> {
    async fn download(&self, item: &Item, progress: &dyn PercentSink) -> Result<()> {
        self.fs.create_dir_all(&self.config.dir).await?;

        let target = self.target_path(item);
        if !self.config.overwrite && self.fs.file_exists(&target).await {
            log::info!("Skipping {}: already downloaded", target.display());
            progress.percent(100);
            return Ok(());
        }

        let mut part = PartFile {
            fs: &self.fs,
            path: part_path(&target),
            armed: self.config.cleanup_on_error,
        };
        let url = self.stream_url(item.handle().as_str());
        let bytes = self.fetch_to(&url, &part.path, progress).await?;
        self.fs.rename_file(&part.path, &target).await?;
        part.keep();
        log::info!("Saved {} ({})", target.display(), format_bytes(bytes));
        Ok(())
    }
}
