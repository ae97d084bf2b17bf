//! Page-at-a-time listing helpers.
//!
//! Hosts return listings in 1-based pages and signal the end with an empty
//! page. [`drain`] collects everything; [`take_until`] stops as soon as a
//! boundary item shows up and keeps only what came before it.

use std::future::Future;

use tracing::{debug, trace};

use super::HostResult;

/// Fetch pages from 1 upward until an empty page, concatenating the results.
///
/// # Errors
///
/// Returns the first error from `fetch`; nothing collected so far is kept.
pub async fn drain<T, F, Fut>(mut fetch: F) -> HostResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = HostResult<Vec<T>>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let items = fetch(page).await?;
        trace!(page, count = items.len(), "fetched page");
        if items.is_empty() {
            break;
        }
        all.extend(items);
        page += 1;
    }
    debug!(pages = page - 1, total = all.len(), "drained listing");
    Ok(all)
}

/// Accumulates pages until a boundary item appears.
///
/// The boundary item and everything after it are discarded. If no boundary
/// ever appears, every item fed in is kept.
#[derive(Debug)]
pub struct TakeUntil<T> {
    items: Vec<T>,
    done: bool,
    found: bool,
}

impl<T> Default for TakeUntil<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            done: false,
            found: false,
        }
    }
}

impl<T> TakeUntil<T> {
    /// Start an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next page. Returns `true` if another page is wanted.
    ///
    /// An empty page ends the listing. Pages fed after that are ignored.
    pub fn push_page(&mut self, page: Vec<T>, is_boundary: impl Fn(&T) -> bool) -> bool {
        if self.done {
            return false;
        }
        if page.is_empty() {
            self.done = true;
            return false;
        }

        match page.iter().position(&is_boundary) {
            Some(idx) => {
                self.items.extend(page.into_iter().take(idx));
                self.done = true;
                self.found = true;
                false
            }
            None => {
                self.items.extend(page);
                true
            }
        }
    }

    /// Whether the boundary item was seen.
    pub const fn found_boundary(&self) -> bool {
        self.found
    }

    /// Items collected before the boundary, in order.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Fetch pages from 1 upward, stopping at the first page that holds a
/// boundary item, and return everything before that item.
///
/// # Errors
///
/// Returns the first error from `fetch`.
pub async fn take_until<T, F, Fut>(
    mut fetch: F,
    is_boundary: impl Fn(&T) -> bool,
) -> HostResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = HostResult<Vec<T>>>,
{
    let mut acc = TakeUntil::new();
    let mut page = 1;
    while acc.push_page(fetch(page).await?, &is_boundary) {
        page += 1;
    }

    debug!(pages = page, found = acc.found_boundary(), "scan stopped");
    Ok(acc.into_items())
}
