use crate::output::traits::{FrontierBatch, OutputResult, PageContent, PageSink};
use crate::url::host_of;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Longest filename the filesystem will take
const MAX_FILENAME_LEN: usize = 255;

/// Writes each kept page to a file under `<dir>/<site host>/`
///
/// The file name is the page URL with characters a filesystem rejects
/// mapped to rare ones, or the base64-encoded URL when configured. Names
/// exceeding the filesystem limit are replaced by a content-stable hash.
pub struct FileSink {
    base_dir: PathBuf,
    b64_names: bool,
}

impl FileSink {
    pub fn new(base_dir: &Path, b64_names: bool) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            b64_names,
        }
    }

    fn file_name(&self, url: &str) -> String {
        let name = if self.b64_names {
            base64::engine::general_purpose::STANDARD.encode(url.as_bytes())
        } else {
            url.replace('/', "{")
                .replace(':', "}")
                .replace('*', "[")
                .replace('?', "^")
        };
        if name.len() > MAX_FILENAME_LEN {
            let mut hasher = Sha256::new();
            hasher.update(name.as_bytes());
            hex::encode(hasher.finalize())
        } else {
            name
        }
    }
}

impl PageSink for FileSink {
    fn handle(&self, batch: &FrontierBatch) -> OutputResult<()> {
        let host = host_of(&batch.task, false, false).unwrap_or_else(|| "unknown".to_string());
        let site_dir = self.base_dir.join(&host);
        std::fs::create_dir_all(&site_dir)?;

        for (url, content) in &batch.results {
            if content.is_empty() {
                continue;
            }
            let output = site_dir.join(self.file_name(url));
            match content {
                PageContent::Text(text) => std::fs::write(&output, text)?,
                PageContent::Bytes(bytes) => std::fs::write(&output, bytes)?,
            }
            tracing::debug!("Saved page {} to {}", url, output.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(dir: &Path) -> FileSink {
        FileSink::new(dir, false)
    }

    #[test]
    fn test_writes_pages_under_host_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = FrontierBatch::new("http://www.test.com");
        batch.results.insert(
            "http://www.test.com/page".to_string(),
            PageContent::Text("<html>hi</html>".to_string()),
        );

        sink(dir.path()).handle(&batch).unwrap();

        let expected = dir
            .path()
            .join("www.test.com")
            .join("http}{{www.test.com{page");
        assert_eq!(
            std::fs::read_to_string(expected).unwrap(),
            "<html>hi</html>"
        );
    }

    #[test]
    fn test_skips_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = FrontierBatch::new("http://www.test.com");
        batch.results.insert(
            "http://www.test.com/empty".to_string(),
            PageContent::Text(String::new()),
        );

        sink(dir.path()).handle(&batch).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("www.test.com"))
            .unwrap()
            .collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_long_name_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let long_url = format!("http://www.test.com/{}", "a".repeat(300));
        let mut batch = FrontierBatch::new("http://www.test.com");
        batch
            .results
            .insert(long_url, PageContent::Text("x".to_string()));

        sink(dir.path()).handle(&batch).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("www.test.com"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].len(), 64);
    }

    #[test]
    fn test_b64_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = FrontierBatch::new("http://www.test.com");
        batch.results.insert(
            "http://www.test.com/x".to_string(),
            PageContent::Text("x".to_string()),
        );

        FileSink::new(dir.path(), true).handle(&batch).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("www.test.com"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&entries[0])
            .unwrap();
        assert_eq!(decoded, b"http://www.test.com/x");
    }

    #[test]
    fn test_bytes_written_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = FrontierBatch::new("http://www.test.com");
        batch.results.insert(
            "http://www.test.com/raw".to_string(),
            PageContent::Bytes(vec![0xde, 0xad]),
        );

        sink(dir.path()).handle(&batch).unwrap();

        let expected = dir
            .path()
            .join("www.test.com")
            .join("http}{{www.test.com{raw");
        assert_eq!(std::fs::read(expected).unwrap(), vec![0xde, 0xad]);
    }
}
