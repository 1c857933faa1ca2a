use std::future::Future;

use super::models::Page;

/// Offset paging bounds for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: usize,
    pub max_pages: usize,
    pub max_items: usize,
}

impl PageLimits {
    pub const BOARDS: PageLimits = PageLimits {
        page_size: 50,
        max_pages: 100,
        max_items: 5_000,
    };

    pub const ISSUES: PageLimits = PageLimits {
        page_size: 50,
        max_pages: 200,
        max_items: 10_000,
    };
}

/// Why a paginated fetch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LastPage,
    EmptyPage,
    TotalReached,
    PageCap,
    ItemCap,
    FetchFailed,
}

impl StopReason {
    /// The listing ran to its natural end, so its items are the whole remote set.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::LastPage | Self::EmptyPage | Self::TotalReached)
    }
}

#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
}

/// Walk an offset-paged listing until it ends, a cap is hit, or a page fails.
///
/// A failed page ends the walk and keeps whatever was accumulated. Items beyond
/// `max_items` are dropped.
pub async fn fetch_all<T, F, Fut>(listing: &str, limits: PageLimits, mut fetch_page: F) -> Paginated<T>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Option<Page<T>>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut pages_fetched = 0;
    let mut start_at = 0;

    let stop_reason = loop {
        if pages_fetched >= limits.max_pages {
            break StopReason::PageCap;
        }

        let page = match fetch_page(start_at, limits.page_size).await {
            Some(page) => page,
            None => break StopReason::FetchFailed,
        };
        pages_fetched += 1;

        let page_len = page.values.len();
        if page_len == 0 {
            break StopReason::EmptyPage;
        }

        let room = limits.max_items.saturating_sub(items.len());
        items.extend(page.values.into_iter().take(room));
        tracing::debug!(listing, start_at, page_len, total = ?page.total, "fetched page");

        if page_len > room {
            break StopReason::ItemCap;
        }
        if page.is_last == Some(true) {
            break StopReason::LastPage;
        }
        if page.total.is_some_and(|total| items.len() as u64 >= total) {
            break StopReason::TotalReached;
        }
        if items.len() >= limits.max_items {
            break StopReason::ItemCap;
        }

        start_at += limits.page_size;
    };

    match stop_reason {
        StopReason::PageCap | StopReason::ItemCap => tracing::warn!(
            listing,
            pages_fetched,
            items = items.len(),
            reason = ?stop_reason,
            "pagination cap reached, listing truncated"
        ),
        StopReason::FetchFailed => tracing::warn!(
            listing,
            pages_fetched,
            items = items.len(),
            "page fetch failed, keeping items fetched so far"
        ),
        _ => {}
    }

    Paginated {
        items,
        pages_fetched,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limits(page_size: usize, max_pages: usize, max_items: usize) -> PageLimits {
        PageLimits {
            page_size,
            max_pages,
            max_items,
        }
    }

    /// Serves `0..len` in pages, flagging the final page when `flag_last` is set.
    fn page_of(len: usize, start: usize, size: usize, flag_last: bool, total: bool) -> Page<usize> {
        let end = (start + size).min(len);
        Page {
            values: (start.min(len)..end).collect(),
            total: total.then_some(len as u64),
            is_last: flag_last.then_some(end >= len),
        }
    }

    #[tokio::test]
    async fn walks_pages_until_last() {
        let calls = AtomicUsize::new(0);
        let out = fetch_all("test", limits(50, 100, 5_000), |start, size| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Some(page_of(125, start, size, true, false)) }
        })
        .await;

        assert_eq!(out.items.len(), 125);
        assert_eq!(out.items[124], 124);
        assert_eq!(out.pages_fetched, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.stop_reason, StopReason::LastPage);
        assert!(out.stop_reason.is_complete());
    }

    #[tokio::test]
    async fn stops_when_total_reached() {
        let out = fetch_all("test", limits(50, 100, 5_000), |start, size| async move {
            Some(page_of(60, start, size, false, true))
        })
        .await;

        assert_eq!(out.items.len(), 60);
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(out.stop_reason, StopReason::TotalReached);
    }

    #[tokio::test]
    async fn empty_page_ends_listing() {
        let out = fetch_all("test", limits(50, 100, 5_000), |start, size| async move {
            Some(page_of(50, start, size, false, false))
        })
        .await;

        assert_eq!(out.items.len(), 50);
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(out.stop_reason, StopReason::EmptyPage);
        assert!(out.stop_reason.is_complete());
    }

    #[tokio::test]
    async fn page_cap_bounds_requests_when_remote_never_finishes() {
        let calls = AtomicUsize::new(0);
        let out = fetch_all("test", limits(10, 5, 10_000), |start, size| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Some(page_of(usize::MAX / 2, start, size, false, false)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(out.items.len(), 50);
        assert_eq!(out.stop_reason, StopReason::PageCap);
        assert!(!out.stop_reason.is_complete());
    }

    #[tokio::test]
    async fn item_cap_truncates_to_limit() {
        let out = fetch_all("test", limits(50, 100, 120), |start, size| async move {
            Some(page_of(1_000, start, size, true, true))
        })
        .await;

        assert_eq!(out.items.len(), 120);
        assert_eq!(out.pages_fetched, 3);
        assert_eq!(out.stop_reason, StopReason::ItemCap);
    }

    #[tokio::test]
    async fn failure_mid_run_keeps_earlier_pages() {
        let out = fetch_all("test", limits(50, 100, 5_000), |start, size| async move {
            if start >= 100 {
                None
            } else {
                Some(page_of(500, start, size, true, true))
            }
        })
        .await;

        assert_eq!(out.items.len(), 100);
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(out.stop_reason, StopReason::FetchFailed);
        assert!(!out.stop_reason.is_complete());
    }

    #[tokio::test]
    async fn first_page_failure_yields_nothing() {
        let out: Paginated<usize> =
            fetch_all("test", limits(50, 100, 5_000), |_, _| async move { None }).await;

        assert!(out.items.is_empty());
        assert_eq!(out.pages_fetched, 0);
        assert_eq!(out.stop_reason, StopReason::FetchFailed);
    }
}
