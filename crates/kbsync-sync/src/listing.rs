//! Listing phase: paginate a remote source down to the low-water mark
//!
//! Adapters return pages in descending modification order without
//! filtering. This loop keeps only items strictly newer than the low-water
//! mark and stops as soon as a page ends at or below it, so older pages are
//! never requested.
//!
//! A provider that breaks the descending order can make this loop stop
//! before reaching newer items further down the listing. Those changes are
//! picked up once they are modified again.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use kbsync_core::domain::{RemoteId, RemoteItem, SyncSession};
use kbsync_core::ports::{IRemoteSource, SourceError};

/// Items gathered by one listing pass
#[derive(Debug, Default)]
pub struct Listing {
    /// Items newer than the low-water mark, newest first, one per id
    pub items: Vec<RemoteItem>,
    /// Greatest `last_modified` among `items`
    pub max_modified: Option<DateTime<Utc>>,
}

/// Why the pagination loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// The last item of a page was not newer than the low-water mark
    ReachedLowWaterMark,
    /// Empty page without `has_more`
    Empty,
    /// The provider reported no further pages
    Exhausted,
}

/// Lists every item changed since the session's low-water mark
///
/// Advances the session cursor once per fetched page.
///
/// # Errors
///
/// Propagates the first `SourceError` returned by the source.
pub async fn collect_changed(
    source: &dyn IRemoteSource,
    session: &mut SyncSession,
) -> Result<Listing, SourceError> {
    let low_water_mark = session.low_water_mark();
    let mut listing = Listing::default();
    let mut seen: HashSet<RemoteId> = HashSet::new();

    let stop = loop {
        let page = source
            .list_changed_since(session.cursor(), low_water_mark)
            .await?;

        let reached_mark = page
            .items
            .last()
            .map(|item| item.last_modified <= low_water_mark);
        let fetched = page.items.len();
        session.advance(page.next_cursor);

        for item in page.items {
            if item.last_modified <= low_water_mark || !seen.insert(item.id.clone()) {
                continue;
            }
            listing.max_modified = Some(match listing.max_modified {
                Some(max) => max.max(item.last_modified),
                None => item.last_modified,
            });
            listing.items.push(item);
        }

        debug!(
            provider = %source.provider(),
            page = session.pages_fetched(),
            fetched,
            kept = listing.items.len(),
            "Listed page"
        );

        match reached_mark {
            Some(true) => break Stop::ReachedLowWaterMark,
            None if !page.has_more => break Stop::Empty,
            _ => {}
        }
        if !page.has_more {
            break Stop::Exhausted;
        }
        if session.cursor().is_none() {
            warn!(
                provider = %source.provider(),
                "Source reported more pages without a cursor, stopping"
            );
            break Stop::Exhausted;
        }
    };

    debug!(
        provider = %source.provider(),
        pages = session.pages_fetched(),
        items = listing.items.len(),
        stop = ?stop,
        "Listing finished"
    );
    Ok(listing)
}
