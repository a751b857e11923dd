// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Append-only log of every image reference a crawl encountered.

use crate::models::image::ImageRecord;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed leading columns of the metadata log
pub const COLUMNS: [&str; 6] = [
    "page_url",
    "image_url",
    "image_name",
    "alt_text_present",
    "alt_text",
    "download_status",
];

/// Trailing column present when uploads happen during the crawl
pub const REFERENCE_COLUMN: &str = "sink_reference";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("metadata log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata log write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("metadata log already finalized")]
    Closed,
}

/// Reference to a finalized metadata log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataHandle {
    /// File holding the log, for sinks that persist to disk
    pub path: Option<PathBuf>,
    pub rows: usize,
}

/// Durable, order-preserving destination for image records.
/// Records are never updated or removed once written.
pub trait MetadataSink: Send {
    /// Append one record
    fn record(&mut self, record: &ImageRecord) -> Result<(), SinkError>;

    /// Flush and close the log. Further `record` calls fail with [`SinkError::Closed`].
    fn finalize(&mut self) -> Result<MetadataHandle, SinkError>;
}

/// CSV metadata log with a header row, flushed after every record
pub struct CsvMetadataSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    include_reference: bool,
    rows: usize,
}

impl CsvMetadataSink {
    /// Create (or truncate) the log at `path` and write its header row
    pub fn create(path: &Path, include_reference: bool) -> Result<Self, SinkError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = COLUMNS.to_vec();
        if include_reference {
            header.push(REFERENCE_COLUMN);
        }
        writer.write_record(&header)?;
        writer.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            include_reference,
            rows: 0,
        })
    }
}

impl MetadataSink for CsvMetadataSink {
    fn record(&mut self, record: &ImageRecord) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;

        let mut row = row_fields(record);
        if self.include_reference {
            row.push(record.sink_reference.clone().unwrap_or_default());
        }
        writer.write_record(&row)?;
        writer.flush()?;

        self.rows += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<MetadataHandle, SinkError> {
        let mut writer = self.writer.take().ok_or(SinkError::Closed)?;
        writer.flush()?;

        Ok(MetadataHandle {
            path: Some(self.path.clone()),
            rows: self.rows,
        })
    }
}

/// In-memory sink for callers that consume records directly
#[derive(Debug, Default)]
pub struct MemoryMetadataSink {
    records: Vec<ImageRecord>,
    finalized: bool,
}

impl MemoryMetadataSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }
}

impl MetadataSink for MemoryMetadataSink {
    fn record(&mut self, record: &ImageRecord) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Closed);
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<MetadataHandle, SinkError> {
        if self.finalized {
            return Err(SinkError::Closed);
        }
        self.finalized = true;
        Ok(MetadataHandle {
            path: None,
            rows: self.records.len(),
        })
    }
}

fn row_fields(record: &ImageRecord) -> Vec<String> {
    vec![
        record.page_url.clone(),
        record.image_url.clone(),
        record.image_name.clone(),
        if record.alt_text_present() { "Yes" } else { "No" }.to_string(),
        record.alt_text.clone(),
        record.download_status.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::{DownloadStatus, SkipReason};

    fn record(name: &str, alt: &str, status: DownloadStatus) -> ImageRecord {
        ImageRecord {
            page_url: "https://x.com/".to_string(),
            image_url: format!("https://x.com/{}", name),
            image_name: name.to_string(),
            alt_text: alt.to_string(),
            download_status: status,
            sink_reference: None,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header_written_even_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_metadata.csv");

        let mut sink = CsvMetadataSink::create(&path, false).unwrap();
        let handle = sink.finalize().unwrap();

        assert_eq!(handle.rows, 0);
        assert_eq!(handle.path.as_deref(), Some(path.as_path()));
        assert_eq!(read_rows(&path), vec![COLUMNS.map(str::to_string).to_vec()]);
    }

    #[test]
    fn test_rows_preserve_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_metadata.csv");

        let mut sink = CsvMetadataSink::create(&path, false).unwrap();
        sink.record(&record("b.png", "Bee", DownloadStatus::Downloaded))
            .unwrap();
        sink.record(&record(
            "a.png",
            "",
            DownloadStatus::Failed("HTTP status 404".to_string()),
        ))
        .unwrap();
        sink.finalize().unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            vec![
                "https://x.com/",
                "https://x.com/b.png",
                "b.png",
                "Yes",
                "Bee",
                "downloaded"
            ]
        );
        assert_eq!(rows[2][2], "a.png");
        assert_eq!(rows[2][3], "No");
        assert_eq!(rows[2][5], "failed (HTTP status 404)");
    }

    #[test]
    fn test_reference_column_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_metadata.csv");

        let mut sink = CsvMetadataSink::create(&path, true).unwrap();
        let mut uploaded = record("a.png", "", DownloadStatus::Downloaded);
        uploaded.sink_reference = Some("file:///out/images/a.png".to_string());
        sink.record(&uploaded).unwrap();
        sink.record(&record(
            "logo.png",
            "",
            DownloadStatus::Skipped(SkipReason::Denylisted),
        ))
        .unwrap();
        sink.finalize().unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0].last().map(String::as_str), Some(REFERENCE_COLUMN));
        assert_eq!(rows[1][6], "file:///out/images/a.png");
        assert_eq!(rows[2][6], "");
    }

    #[test]
    fn test_alt_text_with_commas_and_quotes_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_metadata.csv");

        let mut sink = CsvMetadataSink::create(&path, false).unwrap();
        sink.record(&record(
            "a.png",
            "A \"quoted\", comma",
            DownloadStatus::Downloaded,
        ))
        .unwrap();
        sink.finalize().unwrap();

        assert_eq!(read_rows(&path)[1][4], "A \"quoted\", comma");
    }

    #[test]
    fn test_record_after_finalize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_metadata.csv");

        let mut sink = CsvMetadataSink::create(&path, false).unwrap();
        sink.finalize().unwrap();

        let result = sink.record(&record("a.png", "", DownloadStatus::Downloaded));
        assert!(matches!(result, Err(SinkError::Closed)));
        assert!(matches!(sink.finalize(), Err(SinkError::Closed)));
    }

    #[test]
    fn test_memory_sink_keeps_records() {
        let mut sink = MemoryMetadataSink::new();
        sink.record(&record("a.png", "", DownloadStatus::Downloaded))
            .unwrap();

        let handle = sink.finalize().unwrap();
        assert_eq!(handle, MetadataHandle { path: None, rows: 1 });
        assert!(matches!(sink.finalize(), Err(SinkError::Closed)));
        assert_eq!(sink.records()[0].image_name, "a.png");
    }
}
