//! Input resolution: normalise a user-supplied path or URL to a local PDF.
//!
//! Splitting needs a file on disk, so URL inputs are downloaded into a
//! `TempDir` that lives as long as the [`SourceDocument`] — cleanup happens
//! automatically on drop, even on panic. The `%PDF` magic bytes are
//! validated up front so a mislabelled file fails with a precise error
//! instead of a parser backtrace three stages later.

use crate::error::ScanpressError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A source PDF resolved to a local path.
#[derive(Debug)]
pub enum SourceDocument {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory that is removed
    /// when this value is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl SourceDocument {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            SourceDocument::Local(p) => p,
            SourceDocument::Downloaded { path, .. } => path,
        }
    }
}

/// Whether the input string names a URL rather than a file path.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF, downloading if necessary.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<SourceDocument, ScanpressError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<SourceDocument, ScanpressError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(ScanpressError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScanpressError::PermissionDenied { path });
        }
        Err(_) => return Err(ScanpressError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(ScanpressError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(SourceDocument::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, ScanpressError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScanpressError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScanpressError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScanpressError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScanpressError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanpressError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| ScanpressError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(url_filename(url));

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(ScanpressError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ScanpressError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded to: {}", file_path.display());
    Ok(SourceDocument::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment when it looks like a file name, else a default.
fn url_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|last| !last.is_empty() && last.contains('.') && !last.contains('?'))
        .map(str::to_owned)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_urls() {
        assert!(is_url("https://example.com/guide.pdf"));
        assert!(is_url("http://example.com/guide.pdf"));
        assert!(!is_url("/tmp/guide.pdf"));
        assert!(!is_url("guide.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_filename_picks_last_segment() {
        assert_eq!(url_filename("https://x.test/a/guide.pdf"), "guide.pdf");
        assert_eq!(url_filename("https://x.test/a/"), "downloaded.pdf");
        assert_eq!(url_filename("https://x.test/download"), "downloaded.pdf");
        assert_eq!(url_filename("https://x.test/f.pdf?sig=abc"), "downloaded.pdf");
    }

    #[test]
    fn rejects_non_pdf_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_pdf.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello world").unwrap();

        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ScanpressError::NotAPdf { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, ScanpressError::FileNotFound { .. }));
    }

    #[test]
    fn accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.5\n...").unwrap();
        let doc = resolve_local(path.to_str().unwrap()).unwrap();
        assert_eq!(doc.path(), path);
    }
}
