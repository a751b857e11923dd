// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Sequential crawl loop over the frontier.
//!
//! One page or image fetch is in flight at a time. The cancellation token is
//! checked before every dequeue and during the politeness delay; all records
//! produced up to that point stay in the metadata sink.

use crate::models::crawler::{
    CrawlConfig, CrawlOutcome, CrawlState, CrawlStats, DownloadedImage,
};
use crate::models::image::{DownloadStatus, ImageRecord, ImageRef, SkipReason};
use crate::services::extractor::extract;
use crate::services::fetcher::Fetcher;
use crate::services::frontier::{normalize_page_url, Frontier};
use crate::services::metadata::MetadataSink;
use crate::services::resolver::{Denylist, ImageResolver, ResolvedImage};
use crate::services::upload::{image_destination, Uploader};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upload target used when images are uploaded as soon as they are downloaded
struct InlineUpload {
    uploader: Arc<dyn Uploader>,
    folder: String,
}

enum PageOutcome {
    Done,
    ImageLimit,
}

/// Crawl engine for one invocation. Owns its frontier; never shared.
pub struct CrawlEngine {
    config: CrawlConfig,
    fetcher: Fetcher,
    resolver: ImageResolver,
    denylist: Denylist,
    frontier: Frontier,
    seen_image_names: HashSet<String>,
    download_attempts: usize,
    stats: CrawlStats,
    downloaded: Vec<DownloadedImage>,
    inline_upload: Option<InlineUpload>,
}

impl CrawlEngine {
    pub fn new(config: CrawlConfig, fetcher: Fetcher) -> Self {
        let denylist = Denylist::new(&config.denylist);
        let frontier = Frontier::new(config.boundary, config.max_queue);

        Self {
            config,
            fetcher,
            resolver: ImageResolver::default(),
            denylist,
            frontier,
            seen_image_names: HashSet::new(),
            download_attempts: 0,
            stats: CrawlStats::default(),
            downloaded: Vec::new(),
            inline_upload: None,
        }
    }

    /// Replace the default image resolver
    pub fn with_resolver(mut self, resolver: ImageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Upload each image under `folder` right after it is downloaded and
    /// record the returned reference in the metadata log
    pub fn with_inline_upload(mut self, uploader: Arc<dyn Uploader>, folder: &str) -> Self {
        self.inline_upload = Some(InlineUpload {
            uploader,
            folder: folder.to_string(),
        });
        self
    }

    /// Crawl from the configured seed until the frontier is exhausted, a limit
    /// is hit, or `cancel` fires. Page and image failures never end the crawl.
    pub async fn run(
        mut self,
        sink: &mut dyn MetadataSink,
        cancel: &CancellationToken,
    ) -> CrawlOutcome {
        if let Err(e) = tokio::fs::create_dir_all(&self.config.image_dir).await {
            let message = format!(
                "Cannot create working directory {}: {}",
                self.config.image_dir.display(),
                e
            );
            return self.fail(message);
        }

        let Some(base_url) = normalize_page_url(&self.config.seed_url) else {
            let message = format!("Invalid seed URL: {}", self.config.seed_url);
            return self.fail(message);
        };
        self.frontier.enqueue_seed(&base_url);

        tracing::info!(
            seed = %base_url,
            max_pages = self.config.max_pages,
            max_images = self.config.max_images,
            boundary = %self.config.boundary,
            "Starting crawl"
        );

        let state = self.crawl_loop(&base_url, sink, cancel).await;
        self.finish(state)
    }

    async fn crawl_loop(
        &mut self,
        base_url: &str,
        sink: &mut dyn MetadataSink,
        cancel: &CancellationToken,
    ) -> CrawlState {
        loop {
            if cancel.is_cancelled() {
                tracing::info!("Crawl cancelled");
                return CrawlState::Cancelled;
            }

            if self.frontier.visited_count() >= self.config.max_pages
                && self.frontier.has_unvisited()
            {
                tracing::info!(max_pages = self.config.max_pages, "Page limit reached");
                return CrawlState::LimitReached;
            }

            let Some(page_url) = self.frontier.dequeue() else {
                return self.exhausted_state();
            };
            if !self.frontier.mark_visited(&page_url) {
                continue;
            }

            if self.stats.pages_visited > 0 && !self.config.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.delay) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!(url = %page_url, "Crawl cancelled before fetching page");
                        return CrawlState::Cancelled;
                    }
                }
            }

            if let PageOutcome::ImageLimit = self.process_page(&page_url, base_url, sink).await {
                tracing::info!(max_images = self.config.max_images, "Image limit reached");
                return CrawlState::LimitReached;
            }
        }
    }

    /// Terminal state once the queue runs dry. Links refused by the queue cap
    /// mean the site was not exhausted.
    fn exhausted_state(&self) -> CrawlState {
        let dropped = self.frontier.dropped_count();
        if dropped > 0 {
            tracing::info!(dropped_links = dropped, "Frontier cap dropped links");
            return CrawlState::LimitReached;
        }
        CrawlState::Completed
    }

    async fn process_page(
        &mut self,
        page_url: &str,
        base_url: &str,
        sink: &mut dyn MetadataSink,
    ) -> PageOutcome {
        tracing::debug!(url = %page_url, "Fetching page");
        self.stats.pages_visited += 1;

        let body = match self.fetcher.fetch(page_url, self.config.page_timeout).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %page_url, error = %e, "Page fetch failed");
                self.stats.pages_failed += 1;
                return PageOutcome::Done;
            }
        };

        let Ok(page) = Url::parse(page_url) else {
            return PageOutcome::Done;
        };
        let extracted = extract(page_url, &body);

        for image in &extracted.images {
            if self.download_attempts >= self.config.max_images {
                return PageOutcome::ImageLimit;
            }
            self.process_image(&page, image, sink).await;
        }

        for link in &extracted.links {
            if let Ok(absolute) = page.join(link.href.trim()) {
                self.frontier.offer_link(absolute.as_str(), base_url);
            }
        }

        PageOutcome::Done
    }

    async fn process_image(
        &mut self,
        page: &Url,
        image: &ImageRef,
        sink: &mut dyn MetadataSink,
    ) {
        let resolved = match self.resolver.try_resolve(page, &image.src) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!(src = %image.src, reason = %e, "Image source ignored");
                return;
            }
        };

        let denied_by = self.denylist.matches(resolved.url.as_str()).map(str::to_string);
        let (download_status, sink_reference) = if let Some(entry) = denied_by {
            tracing::debug!(url = %resolved.url, entry = %entry, "Image denylisted");
            (DownloadStatus::Skipped(SkipReason::Denylisted), None)
        } else if self.seen_image_names.contains(&resolved.name) {
            tracing::debug!(url = %resolved.url, "Image name already downloaded");
            (DownloadStatus::Skipped(SkipReason::DuplicateName), None)
        } else {
            self.download(&resolved).await
        };

        match &download_status {
            DownloadStatus::Downloaded => self.stats.images_downloaded += 1,
            DownloadStatus::Failed(_) => self.stats.images_failed += 1,
            DownloadStatus::Skipped(_) => self.stats.images_skipped += 1,
        }

        let record = ImageRecord {
            page_url: page.to_string(),
            image_url: resolved.url.to_string(),
            image_name: resolved.name,
            alt_text: image.alt.clone(),
            download_status,
            sink_reference,
        };

        self.stats.images_found += 1;
        if let Err(e) = sink.record(&record) {
            tracing::error!(
                image = %record.image_url,
                error = %e,
                "Failed to write metadata record"
            );
        }
    }

    async fn download(&mut self, resolved: &ResolvedImage) -> (DownloadStatus, Option<String>) {
        self.download_attempts += 1;

        let bytes = match self
            .fetcher
            .fetch(resolved.url.as_str(), self.config.image_timeout)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %resolved.url, error = %e, "Image download failed");
                return (DownloadStatus::Failed(e.to_string()), None);
            }
        };

        let local_path = self.config.image_dir.join(&resolved.name);
        if let Err(e) = tokio::fs::write(&local_path, &bytes).await {
            tracing::warn!(path = %local_path.display(), error = %e, "Failed to store image");
            return (DownloadStatus::Failed(format!("write failed: {}", e)), None);
        }

        tracing::debug!(url = %resolved.url, bytes = bytes.len(), "Downloaded image");
        self.seen_image_names.insert(resolved.name.clone());
        let reference = self.upload_inline(&resolved.name, &local_path).await;
        self.downloaded.push(DownloadedImage {
            image_name: resolved.name.clone(),
            local_path,
        });

        (DownloadStatus::Downloaded, reference)
    }

    async fn upload_inline(&mut self, image_name: &str, local_path: &Path) -> Option<String> {
        let inline = self.inline_upload.as_ref()?;
        let uploader = Arc::clone(&inline.uploader);
        let destination = image_destination(&inline.folder, image_name);

        match uploader.upload(local_path, &destination).await {
            Ok(reference) => {
                self.stats.images_uploaded += 1;
                Some(reference)
            }
            Err(e) => {
                tracing::warn!(
                    backend = uploader.name(),
                    destination = %destination,
                    error = %e,
                    "Image upload failed"
                );
                self.stats.upload_failures += 1;
                None
            }
        }
    }

    fn finish(mut self, state: CrawlState) -> CrawlOutcome {
        debug_assert!(state.is_terminal());

        tracing::info!(
            state = %state,
            pages_visited = self.stats.pages_visited,
            pages_failed = self.stats.pages_failed,
            images_found = self.stats.images_found,
            images_downloaded = self.stats.images_downloaded,
            dropped_links = self.frontier.dropped_count(),
            "Crawl finished"
        );

        CrawlOutcome {
            state,
            stats: self.stats,
            downloaded: self.downloaded,
            error: None,
        }
    }

    fn fail(self, error: String) -> CrawlOutcome {
        tracing::error!(error = %error, "Crawl aborted");

        CrawlOutcome {
            state: CrawlState::FatalError,
            stats: self.stats,
            downloaded: self.downloaded,
            error: Some(error),
        }
    }
}
