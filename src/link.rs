//! Catalog link validation and extraction.
//!
//! Pasted links are validated here before any catalog fetch is attempted.
//! Both the URI form (`spotify:track:{id}`) and the web form
//! (`https://open.spotify.com/track/{id}`) are accepted; the web form is
//! normalised into the URI form.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^spotify:(?:user:[^:\s]+:)?(track|album|playlist):([a-z0-9]+)$")
        .expect("valid regex")
});

static WEB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^https?://open\.spotify\.com/(?:intl-[a-z-]+/)?(?:user/[^/\s]+/)?(track|album|playlist)/([a-z0-9]+)/?(?:\?\S*)?$",
    )
    .expect("valid regex")
});

static CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)spotify:(?:user:[^:\s]+:)?(?:track|album|playlist):[a-z0-9]+|https?://open\.spotify\.com/[^\s"'<>]+"#,
    )
    .expect("valid regex")
});

/// What a link points at in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Track,
    Album,
    Playlist,
}

impl LinkKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "track" => Some(Self::Track),
            "album" => Some(Self::Album),
            "playlist" => Some(Self::Playlist),
            _ => None,
        }
    }

    /// The path segment used in both link forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated catalog link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogLink {
    kind: LinkKind,
    id: String,
}

impl CatalogLink {
    #[must_use]
    pub const fn kind(&self) -> LinkKind {
        self.kind
    }

    /// Catalog id of the track, album or playlist.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical URI form, e.g. `spotify:album:{id}`.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:{}:{}", self.kind, self.id)
    }
}

impl fmt::Display for CatalogLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spotify:{}:{}", self.kind, self.id)
    }
}

/// Validates a single pasted link.
///
/// # Errors
///
/// Returns [`Error::InvalidLink`] if the text is not a track, album or
/// playlist link in either supported form.
pub fn parse_link(text: &str) -> Result<CatalogLink> {
    let trimmed = text.trim();
    let caps = URI_RE
        .captures(trimmed)
        .or_else(|| WEB_RE.captures(trimmed))
        .ok_or_else(|| Error::InvalidLink(trimmed.to_string()))?;

    let kind = LinkKind::from_segment(&caps[1])
        .ok_or_else(|| Error::InvalidLink(trimmed.to_string()))?;
    Ok(CatalogLink {
        kind,
        id: caps[2].to_string(),
    })
}

/// Extracts every valid catalog link from free text, in order of
/// appearance, without duplicates.
#[must_use]
pub fn extract_links(text: &str) -> Vec<CatalogLink> {
    let mut seen = HashSet::new();
    CANDIDATE_RE
        .find_iter(text)
        .filter_map(|m| {
            // Web links can pick up trailing punctuation from prose.
            let candidate = m.as_str().trim_end_matches(['.', ',', ';', ')']);
            parse_link(candidate).ok()
        })
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
