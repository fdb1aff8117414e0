//! Lazy transfer policy: modification-time comparison per file

use chrono::{DateTime, Utc};

/// Which way a file is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local to remote
    Upload,
    /// Remote to local
    Download,
}

/// Outcome of comparing one source/destination pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDecision {
    Transfer,
    Skip,
}

/// Decide whether a single file needs to be transferred.
///
/// `source_mtime` belongs to the origin side of the copy (local for uploads,
/// remote for downloads) and `dest_mtime` to the side being written; `None`
/// means the destination does not exist yet. With `lazy` off every file
/// transfers. Otherwise a file is skipped only when the source is strictly
/// older than the destination: equal timestamps transfer, so a clock tie
/// never leaves the two trees drifting apart.
pub fn decide(
    lazy: bool,
    direction: Direction,
    source_mtime: DateTime<Utc>,
    dest_mtime: Option<DateTime<Utc>>,
) -> TransferDecision {
    if !lazy {
        return TransferDecision::Transfer;
    }
    match dest_mtime {
        None => TransferDecision::Transfer,
        Some(dest) if source_mtime >= dest => TransferDecision::Transfer,
        Some(dest) => {
            tracing::debug!(
                ?direction,
                %source_mtime,
                dest_mtime = %dest,
                "source older than destination"
            );
            TransferDecision::Skip
        }
    }
}
