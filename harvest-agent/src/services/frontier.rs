// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Breadth-first crawl queue plus visited set.
//!
//! Enqueueing never consults the visited set; a URL may sit in the queue
//! several times. [`Frontier::mark_visited`] is the single dedup gate: the
//! engine calls it on every dequeued URL and discards the ones already seen.
//! When the queue hits its cap it is compacted first, so stale entries never
//! push out a page that has not been crawled.

use crate::models::crawler::BoundaryPolicy;
use crate::services::origin::{is_internal, within_boundary};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Strip the fragment so `page#a` and `page#b` share one visited-set key.
/// Returns `None` for anything that is not an absolute http(s) URL.
pub fn normalize_page_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.into())
}

/// Pending pages and pages already processed, owned by one crawl
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    boundary: BoundaryPolicy,
    max_queue: usize,
    dropped: usize,
}

impl Frontier {
    pub fn new(boundary: BoundaryPolicy, max_queue: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            boundary,
            max_queue,
            dropped: 0,
        }
    }

    /// Queue the starting page; filters do not apply to it
    pub fn enqueue_seed(&mut self, url: &str) -> bool {
        match normalize_page_url(url) {
            Some(normalized) => {
                self.queue.push_back(normalized);
                true
            }
            None => false,
        }
    }

    /// Next pending URL in FIFO order, possibly one that was already visited
    pub fn dequeue(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Record `url` as visited. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Queue an absolute link found on a page if it passes the origin filter and,
    /// under [`BoundaryPolicy::PathPrefix`], the prefix filter against `base_url`.
    /// Returns whether the link was queued.
    pub fn offer_link(&mut self, url: &str, base_url: &str) -> bool {
        let Some(normalized) = normalize_page_url(url) else {
            return false;
        };

        if !is_internal(&normalized, base_url) {
            return false;
        }
        if self.boundary == BoundaryPolicy::PathPrefix && !within_boundary(&normalized, base_url)
        {
            return false;
        }

        if self.queue.len() >= self.max_queue {
            self.compact();
        }
        if self.queue.len() >= self.max_queue {
            self.dropped += 1;
            tracing::debug!(url = %normalized, "Frontier full, dropping link");
            return false;
        }

        self.queue.push_back(normalized);
        true
    }

    /// Drop visited and repeated entries, keeping the first pending occurrence
    fn compact(&mut self) {
        let visited = &self.visited;
        let mut pending = HashSet::new();
        self.queue
            .retain(|url| !visited.contains(url) && pending.insert(url.clone()));
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Links refused because the queue was at capacity
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// True if some queued URL has not been visited yet
    pub fn has_unvisited(&self) -> bool {
        self.queue.iter().any(|url| !self.visited.contains(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://x.com/docs/";

    fn frontier(boundary: BoundaryPolicy) -> Frontier {
        Frontier::new(boundary, 100)
    }

    #[test]
    fn test_normalize_strips_fragment() {
        assert_eq!(
            normalize_page_url("https://x.com/a#section"),
            Some("https://x.com/a".to_string())
        );
    }

    #[test]
    fn test_normalize_rejects_non_http() {
        assert_eq!(normalize_page_url("mailto:someone@x.com"), None);
        assert_eq!(normalize_page_url("javascript:void(0)"), None);
        assert_eq!(normalize_page_url("/relative"), None);
    }

    #[test]
    fn test_dequeue_is_fifo() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        frontier.enqueue_seed(BASE);
        frontier.offer_link("https://x.com/docs/a", BASE);
        frontier.offer_link("https://x.com/docs/b", BASE);

        assert_eq!(frontier.dequeue().as_deref(), Some(BASE));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/a"));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/b"));
        assert_eq!(frontier.dequeue(), None);
    }

    #[test]
    fn test_mark_visited_is_the_dedup_gate() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        assert!(frontier.mark_visited("https://x.com/docs/a"));
        assert!(!frontier.mark_visited("https://x.com/docs/a"));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_offer_link_does_not_check_visited() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        frontier.mark_visited("https://x.com/docs/a");

        assert!(frontier.offer_link("https://x.com/docs/a", BASE));
        assert!(frontier.offer_link("https://x.com/docs/a", BASE));
        assert!(!frontier.has_unvisited());
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/a"));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/a"));
    }

    #[test]
    fn test_offer_link_rejects_other_hosts() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        assert!(!frontier.offer_link("https://evil.com/docs/a", BASE));
        assert!(!frontier.offer_link("https://www.x.com/docs/a", BASE));
        assert_eq!(frontier.dequeue(), None);
    }

    #[test]
    fn test_same_host_policy_allows_other_paths() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        assert!(frontier.offer_link("https://x.com/blog/post", BASE));
    }

    #[test]
    fn test_path_prefix_policy_narrows_to_seed() {
        let mut frontier = frontier(BoundaryPolicy::PathPrefix);
        assert!(frontier.offer_link("https://x.com/docs/guide", BASE));
        assert!(!frontier.offer_link("https://x.com/blog/post", BASE));
        assert!(!frontier.offer_link("http://x.com/docs/guide", BASE));
    }

    #[test]
    fn test_offer_link_strips_fragment() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        frontier.offer_link("https://x.com/docs/a#top", BASE);
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/a"));
    }

    #[test]
    fn test_offer_link_respects_queue_cap() {
        let mut frontier = Frontier::new(BoundaryPolicy::SameHost, 2);
        assert!(frontier.offer_link("https://x.com/docs/1", BASE));
        assert!(frontier.offer_link("https://x.com/docs/2", BASE));
        assert!(!frontier.offer_link("https://x.com/docs/3", BASE));
        assert_eq!(frontier.dropped_count(), 1);
    }

    #[test]
    fn test_full_queue_sheds_visited_and_repeated_entries() {
        let mut frontier = Frontier::new(BoundaryPolicy::SameHost, 3);
        frontier.mark_visited(BASE);
        assert!(frontier.offer_link(BASE, BASE));
        assert!(frontier.offer_link("https://x.com/docs/b", BASE));
        assert!(frontier.offer_link("https://x.com/docs/b", BASE));

        assert!(frontier.offer_link("https://x.com/docs/c", BASE));
        assert_eq!(frontier.dropped_count(), 0);
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/b"));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://x.com/docs/c"));
        assert_eq!(frontier.dequeue(), None);
    }

    #[test]
    fn test_has_unvisited() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        assert!(!frontier.has_unvisited());

        frontier.offer_link("https://x.com/docs/a", BASE);
        assert!(frontier.has_unvisited());

        frontier.mark_visited("https://x.com/docs/a");
        assert!(!frontier.has_unvisited());
    }

    #[test]
    fn test_invalid_seed_is_refused() {
        let mut frontier = frontier(BoundaryPolicy::SameHost);
        assert!(!frontier.enqueue_seed("not a url"));
        assert_eq!(frontier.dequeue(), None);
    }
}
