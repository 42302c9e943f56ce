//! Pagination driver for list operations.
//!
//! List RPCs return results one page at a time, each page naming the token
//! for the next one. [`list_all`] walks the pages, retrying each fetch
//! independently, and hands back the concatenated items. Callers see an
//! all-or-nothing result: a page fetch that exhausts its retry budget
//! fails the whole listing and any accumulated items are discarded.

use crate::error::Result;
use crate::idempotency::Idempotency;
use crate::retry::{execute_with_retry, BackoffPolicy, RetryPolicy};
use std::time::Duration;

/// One page of a listing.
pub trait Page {
    /// The items this listing yields.
    type Item;

    /// Token identifying the next page; empty means this was the last one.
    fn next_token(&self) -> &str;

    /// Take the page's items in response order.
    fn into_items(self) -> Vec<Self::Item>;
}

/// Fetch every page of a listing and concatenate the items.
///
/// Starts from an empty token and calls `fetch_page` with each successive
/// token until a page reports an empty next-token. Repeating a page fetch
/// with the same token is safe, so every fetch runs through the retry
/// loop as idempotent, and each page gets fresh clones of the policy
/// prototypes: a flaky early page does not spend the budget of later
/// ones.
pub fn list_all<P: Page>(
    retry_prototype: &dyn RetryPolicy,
    backoff_prototype: &dyn BackoffPolicy,
    mut sleep: impl FnMut(Duration),
    mut fetch_page: impl FnMut(&str) -> Result<P>,
) -> Result<Vec<P::Item>> {
    let mut items = Vec::new();
    let mut token = String::new();
    loop {
        let mut retry = retry_prototype.clone_policy();
        let mut backoff = backoff_prototype.clone_policy();
        let page = execute_with_retry(
            Idempotency::Idempotent,
            retry.as_mut(),
            backoff.as_mut(),
            &mut sleep,
            || fetch_page(&token),
        )?;
        token = page.next_token().to_string();
        items.extend(page.into_items());
        if token.is_empty() {
            return Ok(items);
        }
    }
}
