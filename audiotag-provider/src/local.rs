use std::io::SeekFrom;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use audiotag::reader::{FileProvider, FileStat};
use audiotag::TagError;

/// Reads files directly off the local filesystem via `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileProvider;

impl LocalFileProvider {
    pub fn new() -> Self {
        LocalFileProvider
    }
}

#[async_trait]
impl FileProvider for LocalFileProvider {
    async fn stat(&self, uri: &str) -> Result<FileStat, TagError> {
        match tokio::fs::metadata(uri).await {
            Ok(meta) => Ok(FileStat { exists: true, size: meta.len() }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(FileStat { exists: false, size: 0 })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns fewer than `length` bytes if the file ends first, never an
    /// error for an ordinary short read at EOF.
    async fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>, TagError> {
        let mut file = File::open(uri).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                TagError::FileMissing(uri.to_string())
            } else {
                TagError::from(err)
            }
        })?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; length as usize];
        let mut read_total = 0usize;
        while read_total < buf.len() {
            let n = file.read(&mut buf[read_total..]).await?;
            if n == 0 {
                break;
            }
            read_total += n;
        }
        buf.truncate(read_total);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn stat_reports_nonexistence_without_an_error() {
        let provider = LocalFileProvider::new();
        let stat = provider.stat("/no/such/path/audiotag-test").await.unwrap();
        assert!(!stat.exists);
        assert_eq!(stat.size, 0);
    }

    #[tokio::test]
    async fn stat_reports_size_of_an_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        let provider = LocalFileProvider::new();
        let stat = provider.stat(file.path().to_str().unwrap()).await.unwrap();
        assert!(stat.exists);
        assert_eq!(stat.size, 11);
    }

    #[tokio::test]
    async fn read_returns_a_sub_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let provider = LocalFileProvider::new();
        let bytes = provider
            .read(file.path().to_str().unwrap(), 4, 3)
            .await
            .unwrap();
        assert_eq!(bytes, b"3456");
    }

    #[tokio::test]
    async fn read_past_eof_returns_a_short_read_not_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"short").unwrap();

        let provider = LocalFileProvider::new();
        let bytes = provider
            .read(file.path().to_str().unwrap(), 100, 2)
            .await
            .unwrap();
        assert_eq!(bytes, b"ort");
    }

    #[tokio::test]
    async fn read_of_missing_file_is_file_missing() {
        let provider = LocalFileProvider::new();
        let err = provider
            .read("/no/such/path/audiotag-test", 4, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::FileMissing(_)));
    }
}
