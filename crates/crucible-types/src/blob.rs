//! Blob references and the MIME-to-extension mapping used for blob paths.

use serde::{Deserialize, Serialize};

/// Immutable reference to content-addressed bytes: hash, size, and MIME type.
/// Never carries inline bytes — those live only in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub hash: String,
    pub size: u64,
    pub mime: String,
}

impl BlobRef {
    pub fn new(hash: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            size,
            mime: mime.into(),
        }
    }

    /// The file extension this blob should be stored under, derived from MIME.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }

    /// Blob path relative to the movie root: `blobs/<hh>/<hash>.<ext>`.
    pub fn relative_path(&self) -> String {
        let prefix = &self.hash[..self.hash.len().min(2)];
        format!("blobs/{prefix}/{}.{}", self.hash, self.extension())
    }
}

/// Maps a MIME type to a file extension for blob storage paths. Unknown
/// MIMEs fall back to `bin`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "application/json" => "json",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "video/mp4" => "mp4",
        "application/octet-stream" => "bin",
        "text/plain" => "txt",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mime_maps_to_extension() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
    }

    #[test]
    fn unknown_mime_falls_back_to_bin() {
        assert_eq!(extension_for_mime("application/x-whatever"), "bin");
    }

    #[test]
    fn relative_path_shards_by_first_two_hex_chars() {
        let blob = BlobRef::new("abcdef0123", 10, "image/png");
        assert_eq!(blob.relative_path(), "blobs/ab/abcdef0123.png");
    }
}
