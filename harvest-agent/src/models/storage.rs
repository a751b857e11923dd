// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

/// Storage backend receiving the harvested files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Local (or mounted shared) filesystem
    Local,
    /// S3-compatible object store
    S3,
    /// Dropbox cloud drive
    Dropbox,
}

impl StorageBackend {
    /// Parse from the STORAGE_BACKEND value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(StorageBackend::Local),
            "s3" => Some(StorageBackend::S3),
            "dropbox" => Some(StorageBackend::Dropbox),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Dropbox => write!(f, "dropbox"),
        }
    }
}

/// Content type header for an uploaded file, derived from its extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("local"), Some(StorageBackend::Local));
        assert_eq!(StorageBackend::parse("s3"), Some(StorageBackend::S3));
        assert_eq!(
            StorageBackend::parse("dropbox"),
            Some(StorageBackend::Dropbox)
        );
        assert_eq!(StorageBackend::parse("ftp"), None);
    }

    #[test]
    fn test_storage_backend_display_roundtrip() {
        for backend in [
            StorageBackend::Local,
            StorageBackend::S3,
            StorageBackend::Dropbox,
        ] {
            assert_eq!(StorageBackend::parse(&backend.to_string()), Some(backend));
        }
    }

    #[test]
    fn test_content_type_for_images() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("vector.svg"), "image/svg+xml");
    }

    #[test]
    fn test_content_type_for_metadata_and_unknown() {
        assert_eq!(content_type_for("image_metadata.csv"), "text/csv");
        assert_eq!(content_type_for("download"), "application/octet-stream");
    }
}
