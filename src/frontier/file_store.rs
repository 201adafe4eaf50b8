use super::types::{FrontierError, UrlRecord};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};

/// A guard against corrupt frontier files: a single line is never read past
/// this many bytes without finding a `\n`.
const MAX_LINE_SCAN_BYTES: usize = 64 * 1024;

/// Durable per-domain append log with cheap random read by offset.
///
/// Path scheme: `<data_dir>/frontiers/<first 2 hex chars of SHA-256(domain)>/
/// <domain>.frontier` — a 2-level fan-out so a crawl touching millions of
/// domains never puts millions of files in one directory.
#[derive(Debug, Clone)]
pub struct FrontierFileStore {
    data_dir: PathBuf,
}

impl FrontierFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path for a domain's frontier file, relative to `data_dir`.
    pub fn relative_path(domain: &str) -> String {
        let prefix = domain_hex_prefix(domain);
        format!("frontiers/{prefix}/{domain}.frontier")
    }

    pub fn absolute_path(&self, domain: &str) -> PathBuf {
        self.data_dir.join(Self::relative_path(domain))
    }

    /// Appends a batch of already-normalized records to `domain`'s frontier
    /// file, creating the file and its fan-out directory if needed. Returns
    /// the number of bytes written.
    pub async fn append_batch(
        &self,
        domain: &str,
        records: &[UrlRecord],
    ) -> Result<u64, FrontierError> {
        if records.is_empty() {
            return Ok(0);
        }
        let path = self.absolute_path(domain);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FrontierError::Io {
                    domain: domain.to_string(),
                    source,
                })?;
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&record.to_line());
        }
        let bytes = buf.into_bytes();
        let len = bytes.len() as u64;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| FrontierError::Io {
                domain: domain.to_string(),
                source,
            })?;
        file.write_all(&bytes)
            .await
            .map_err(|source| FrontierError::Io {
                domain: domain.to_string(),
                source,
            })?;
        file.flush().await.map_err(|source| FrontierError::Io {
            domain: domain.to_string(),
            source,
        })?;

        Ok(len)
    }

    /// Reads one `url|depth` line starting at `offset`, returning the parsed
    /// record (or `None` if the line was malformed) and the new offset
    /// (`offset + bytes consumed, including the trailing newline`).
    ///
    /// Returns [`FrontierError::FileMissing`] if the file doesn't exist,
    /// which callers treat the same as an exhausted domain.
    pub async fn read_line_at(
        &self,
        domain: &str,
        offset: u64,
    ) -> Result<(Option<UrlRecord>, u64), FrontierError> {
        let path = self.absolute_path(domain);
        let mut file = fs::File::open(&path)
            .await
            .map_err(|_| FrontierError::FileMissing(domain.to_string()))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| FrontierError::Io {
                domain: domain.to_string(),
                source,
            })?;

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = file
                .read(&mut byte)
                .await
                .map_err(|source| FrontierError::Io {
                    domain: domain.to_string(),
                    source,
                })?;
            if n == 0 {
                // EOF before a newline: treat whatever was read as the tail
                // of an in-flight append and do not advance past it.
                if line.is_empty() {
                    return Ok((None, offset));
                }
                return Ok((None, offset));
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
            if line.len() >= MAX_LINE_SCAN_BYTES {
                // Corrupt or missing newline; advance past the garbage so we
                // don't spin on the same offset forever.
                let new_offset = offset + line.len() as u64;
                return Ok((None, new_offset));
            }
        }

        let new_offset = offset + line.len() as u64;
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim_end_matches('\n');
        Ok((UrlRecord::parse_line(trimmed), new_offset))
    }

    /// Total size in bytes of a domain's frontier file (0 if it doesn't
    /// exist yet).
    pub async fn size(&self, domain: &str) -> Result<u64, FrontierError> {
        let path = self.absolute_path(domain);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(FrontierError::Io {
                domain: domain.to_string(),
                source,
            }),
        }
    }

    /// Overwrites a domain's frontier file wholesale with normalized
    /// records, used by the frontier normalizer maintenance tool. Returns
    /// the new file size.
    pub async fn rewrite(
        &self,
        domain: &str,
        records: &[UrlRecord],
    ) -> Result<u64, FrontierError> {
        let path = self.absolute_path(domain);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FrontierError::Io {
                    domain: domain.to_string(),
                    source,
                })?;
        }
        let mut buf = String::new();
        for record in records {
            buf.push_str(&record.to_line());
        }
        let bytes = buf.into_bytes();
        let len = bytes.len() as u64;
        fs::write(&path, &bytes)
            .await
            .map_err(|source| FrontierError::Io {
                domain: domain.to_string(),
                source,
            })?;
        Ok(len)
    }
}

fn domain_hex_prefix(domain: &str) -> String {
    let digest = Sha256::digest(domain.as_bytes());
    hex::encode(&digest[..1])
}

/// Used by [`FrontierFileStore::absolute_path`] callers that only need the
/// directory shape without a store instance (e.g. maintenance tools scanning
/// `data_dir/frontiers` directly).
pub fn fan_out_dir(data_dir: &Path, domain: &str) -> PathBuf {
    data_dir.join("frontiers").join(domain_hex_prefix(domain))
}
