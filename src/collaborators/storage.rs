use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;

/// Persists extracted page text to disk. Returns `None` on empty input
/// rather than writing a zero-byte file (spec §6: "Returns `None` on empty
/// input").
#[async_trait]
pub trait ContentWriter: Send + Sync {
    async fn save(&self, url_sha256: &str, text: &str) -> Result<Option<PathBuf>, std::io::Error>;
}

/// Default [`ContentWriter`]: one UTF-8 text file per fetched page at
/// `<data_dir>/content/<url-sha256>.txt`, grounded in the teacher's
/// `output` module's convention of one file-writing handler per output
/// format (here there is exactly one format: raw extracted text).
pub struct FsContentWriter {
    data_dir: PathBuf,
}

impl FsContentWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, url_sha256: &str) -> PathBuf {
        self.data_dir.join("content").join(format!("{url_sha256}.txt"))
    }
}

#[async_trait]
impl ContentWriter for FsContentWriter {
    async fn save(&self, url_sha256: &str, text: &str) -> Result<Option<PathBuf>, std::io::Error> {
        if text.is_empty() {
            return Ok(None);
        }
        let path = self.path_for(url_sha256);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, text.as_bytes()).await?;
        Ok(Some(path))
    }
}

/// SHA-256 hex digest of a URL, used both as the visited-record key prefix
/// and as the content file's stem.
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn saving_empty_text_writes_nothing() {
        let dir = tempdir().unwrap();
        let writer = FsContentWriter::new(dir.path());
        let result = writer.save("abc123", "").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn saving_text_creates_the_content_directory_and_file() {
        let dir = tempdir().unwrap();
        let writer = FsContentWriter::new(dir.path());
        let path = writer.save("abc123", "hello world").await.unwrap().unwrap();
        assert_eq!(path, dir.path().join("content/abc123.txt"));
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "hello world");
    }

    #[test]
    fn sha256_hex_is_deterministic_and_64_chars() {
        let a = sha256_hex("http://example.com/a");
        let b = sha256_hex("http://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn sha256_hex_differs_for_different_inputs() {
        let a = sha256_hex("http://example.com/a");
        let b = sha256_hex("http://example.com/b");
        assert_ne!(a, b);
    }
}
