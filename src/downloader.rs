//! The single-item downloader seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::item::Item;

/// Receives percent-progress signals for the item currently downloading.
///
/// Values are passed through unchecked; the orchestrator discards anything
/// outside `0..=100`.
pub trait PercentSink: Send + Sync {
    fn percent(&self, value: i64);
}

/// A sink that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PercentSink for NoProgress {
    fn percent(&self, _value: i64) {}
}

/// Downloads one item to local storage.
///
/// The returned future resolving is the one terminal signal for the call;
/// `Ok` means the item was stored, `Err` that it was not. Any number of
/// percent signals may be sent through `progress` before that.
#[async_trait]
pub trait TrackDownloader: Send + Sync {
    async fn download(&self, item: &Item, progress: &dyn PercentSink) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_progress_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoProgress>();
    }
}
