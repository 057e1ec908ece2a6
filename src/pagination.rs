//! Lazy offset pagination over an upstream page fetcher
//!
//! A [`Paginator`] issues one upstream call per [`Paginator::next_page`] and
//! nothing in between. Dropping the paginator, or the pending `next_page`
//! future, cancels it: the in-flight request future is dropped with it and no
//! further calls are made.

use futures::Stream;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use tracing::debug;

use crate::error::FlightResult;

/// One page of upstream results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Zero-based position of this page in the sequence
    pub index: usize,
    pub offset: usize,
    /// Offset the next page would start at
    pub next_offset: usize,
    /// Set when this page had fewer records than requested
    pub is_last: bool,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Progress counters of a paginator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub pages_fetched: usize,
    pub records_seen: usize,
    pub next_offset: usize,
    /// The upstream signalled there is nothing more to fetch
    pub exhausted: bool,
    /// Iteration stopped because of the page ceiling, not the upstream
    pub truncated: bool,
    /// Iteration stopped because a page fetch failed
    pub failed: bool,
}

/// Cursor over the pages produced by `fetch_page(offset, page_size)`.
///
/// The sequence ends after a page shorter than `page_size` (which is still
/// yielded), at an empty page (which is not), at the page ceiling, or after
/// the first failed fetch (whose error is yielded once).
pub struct Paginator<T, F> {
    fetch_page: F,
    page_size: usize,
    max_pages: Option<usize>,
    state: PaginationState,
    _records: PhantomData<fn() -> T>,
}

/// Start a lazy page sequence. No upstream call is made until the first
/// [`Paginator::next_page`]. A `page_size` of zero is treated as one.
pub fn paginate<T, F, Fut>(fetch_page: F, page_size: usize) -> Paginator<T, F>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = FlightResult<Vec<T>>>,
{
    Paginator {
        fetch_page,
        page_size: page_size.max(1),
        max_pages: None,
        state: PaginationState::default(),
        _records: PhantomData,
    }
}

impl<T, F, Fut> Paginator<T, F>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = FlightResult<Vec<T>>>,
{
    /// Stop after `max_pages` pages even if the upstream has more
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    fn is_finished(&self) -> bool {
        self.state.exhausted || self.state.truncated || self.state.failed
    }

    /// Fetch the next page, or `None` once the sequence has ended
    pub async fn next_page(&mut self) -> Option<FlightResult<Page<T>>> {
        if self.is_finished() {
            return None;
        }
        if let Some(max) = self.max_pages {
            if self.state.pages_fetched >= max {
                debug!(max_pages = max, "page ceiling reached");
                self.state.truncated = true;
                return None;
            }
        }

        let offset = self.state.next_offset;
        debug!(offset, page_size = self.page_size, "fetching page");

        let records = match (self.fetch_page)(offset, self.page_size).await {
            Ok(records) => records,
            Err(err) => {
                self.state.failed = true;
                return Some(Err(err));
            }
        };

        if records.is_empty() {
            debug!(offset, "empty page, pagination exhausted");
            self.state.exhausted = true;
            return None;
        }

        let is_last = records.len() < self.page_size;
        let page = Page {
            index: self.state.pages_fetched,
            offset,
            next_offset: offset + records.len(),
            is_last,
            records,
        };

        self.state.pages_fetched += 1;
        self.state.records_seen += page.len();
        self.state.next_offset = page.next_offset;
        self.state.exhausted = is_last;

        Some(Ok(page))
    }

    /// Drain the remaining pages into one record list, failing on the first
    /// page error
    pub async fn collect_records(mut self) -> FlightResult<Vec<T>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await {
            records.extend(page?.records);
        }
        Ok(records)
    }

    /// Adapt the paginator into a `Stream` of pages
    pub fn into_stream(self) -> impl Stream<Item = FlightResult<Page<T>>> {
        futures::stream::unfold(self, |mut paginator| async move {
            paginator.next_page().await.map(|page| (page, paginator))
        })
    }
}
