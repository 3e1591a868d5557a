//! A minimal in-memory [`FileProvider`], useful for unit tests and for
//! exercising the core without wiring up a real filesystem.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TagError;
use crate::reader::{FileProvider, FileStat};

#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(uri.into(), bytes);
        self
    }
}

#[async_trait]
impl FileProvider for InMemoryProvider {
    async fn stat(&self, uri: &str) -> Result<FileStat, TagError> {
        match self.files.get(uri) {
            Some(bytes) => Ok(FileStat { exists: true, size: bytes.len() as u64 }),
            None => Ok(FileStat { exists: false, size: 0 }),
        }
    }

    async fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>, TagError> {
        let bytes = self
            .files
            .get(uri)
            .ok_or_else(|| TagError::FileMissing(uri.to_string()))?;
        let offset = offset as usize;
        if offset >= bytes.len() {
            return Ok(Vec::new());
        }
        let end = (offset + length as usize).min(bytes.len());
        Ok(bytes[offset..end].to_vec())
    }
}
