//! tracklist-dl - sequential bulk downloads of catalog tracks.
//!
//! Links to tracks, albums or playlists are resolved through a [`Catalog`]
//! into an ordered selection. A run then downloads every selected item, one
//! at a time, through a [`TrackDownloader`], reporting "N of M" progress and
//! per-item percent along the way. Nothing runs until the session's login
//! has been accepted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tracklist_dl::{Credentials, DownloadConfig, RemoteClient, RunStart, Service, ServiceEvent};
//!
//! # async fn example() -> tracklist_dl::Result<()> {
//! let client = Arc::new(RemoteClient::new(
//!     reqwest::Client::new(),
//!     "https://catalog.example",
//!     DownloadConfig::new().with_dir("music"),
//! ));
//! let (handle, mut events) = Service::spawn(client.clone());
//!
//! handle.authenticate(client.as_ref(), &Credentials::new("user", "pass")).await?;
//! handle.add_link(client.as_ref(), "spotify:album:4aawyAB9vmqN3uQ7FjRGTy").await?;
//! handle.select_all().await?;
//!
//! if handle.start_run().await? == RunStart::Started {
//!     while let Some(event) = events.recv().await {
//!         if let ServiceEvent::RunCompleted(summary) = event {
//!             println!("{} of {} downloaded", summary.succeeded, summary.total);
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod format;
pub mod fs;
pub mod item;
pub mod link;
pub mod orchestrator;
pub mod progress;
pub mod remote;
pub mod selection;
pub mod service;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use catalog::Catalog;
pub use config::{AppConfig, DownloadConfig, Messages};
pub use downloader::{NoProgress, PercentSink, TrackDownloader};
pub use error::{Error, Locked, Result};
pub use fs::{FileSystem, TokioFileSystem};
pub use item::{CatalogId, Item, TrackHandle};
pub use link::{CatalogLink, LinkKind, extract_links, parse_link};
pub use orchestrator::{Orchestrator, RunStatus, RunSummary, Snapshot};
pub use progress::ProgressTracker;
pub use remote::RemoteClient;
pub use selection::SelectionSet;
pub use service::{RunStart, Service, ServiceEvent, ServiceHandle};
pub use session::{AuthState, Authenticator, Credentials, SessionGate};
