//! Reference HTTP implementation of the login, catalog and download seams.

mod client;
mod models;

pub use client::{RemoteClient, sanitize_filename};
pub use models::{TrackListModel, TrackModel};
