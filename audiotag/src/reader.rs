//! The streaming buffered reader: a cursor over an in-memory byte window
//! loaded from the file provider on demand, bounding peak memory to the
//! largest region any one parser needs at a time.

use crate::error::TagError;

/// Result of probing a URI for existence and size.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub exists: bool,
    pub size: u64,
}

/// The external capability every parser depends on for bytes. Implementors
/// may wrap any positioned reader (local disk, network, in-memory fixture);
/// the core never assumes anything about the underlying storage.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait FileProvider: Send + Sync {
    async fn stat(&self, uri: &str) -> Result<FileStat, TagError>;

    /// Returns exactly `length` bytes from `offset`, or fewer if the file
    /// ends first.
    async fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>, TagError>;
}

/// A cursor over a loaded byte window. Pure and synchronous: how the window
/// gets filled is the concern of [`Reader`], not of this type.
#[derive(Debug, Default)]
pub struct Window {
    bytes: Vec<u8>,
    cursor: usize,
    finished: bool,
}

impl Window {
    pub fn new() -> Self {
        Window { bytes: Vec::new(), cursor: 0, finished: false }
    }

    /// Replaces the window with `bytes`, resetting the cursor and `finished`.
    pub fn load(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.cursor = 0;
        self.finished = false;
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns up to `n` bytes from the cursor, advancing it. Sets
    /// `finished` once fewer than `n` bytes remain.
    pub fn read_n(&mut self, n: usize) -> &[u8] {
        let take = n.min(self.remaining());
        let start = self.cursor;
        self.cursor += take;
        if take < n {
            self.finished = true;
        }
        &self.bytes[start..start + take]
    }

    /// Returns bytes up to and including the first zero byte, advancing the
    /// cursor past it. Sets `finished` if the window ends first.
    pub fn read_until_nul(&mut self) -> &[u8] {
        let start = self.cursor;
        match self.bytes[start..].iter().position(|&b| b == 0) {
            Some(offset) => {
                let end = start + offset + 1;
                self.cursor = end;
                &self.bytes[start..end]
            }
            None => {
                self.cursor = self.bytes.len();
                self.finished = true;
                &self.bytes[start..]
            }
        }
    }

    /// Advances the cursor by `min(n, remaining)`, returning the amount
    /// actually skipped.
    pub fn skip_n(&mut self, n: usize) -> usize {
        let take = n.min(self.remaining());
        self.cursor += take;
        if take < n {
            self.finished = true;
        }
        take
    }

    /// Removes every `0x00` that immediately follows a `0xFF` within
    /// `[offset, offset + length)`, leaving the prefix and suffix untouched.
    /// Returns the new length of that region.
    pub fn unsynchronise(&mut self, offset: usize, length: usize) -> usize {
        let end = (offset + length).min(self.bytes.len());
        if offset >= end {
            return 0;
        }
        let mut reversed = Vec::with_capacity(end - offset);
        let mut prev_was_ff = false;
        for &b in &self.bytes[offset..end] {
            if prev_was_ff && b == 0x00 {
                prev_was_ff = false;
                continue;
            }
            prev_was_ff = b == 0xFF;
            reversed.push(b);
        }
        let new_len = reversed.len();
        self.bytes.splice(offset..end, reversed);
        new_len
    }
}

/// Binds a [`Window`] to a single file URI and a file provider, handling the
/// positioned loads the window itself knows nothing about.
#[cfg(feature = "async")]
pub struct Reader<'p> {
    provider: &'p dyn FileProvider,
    uri: String,
    window: Window,
}

#[cfg(feature = "async")]
impl<'p> Reader<'p> {
    pub fn new(provider: &'p dyn FileProvider, uri: impl Into<String>) -> Self {
        Reader { provider, uri: uri.into(), window: Window::new() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    pub async fn stat(&self) -> Result<FileStat, TagError> {
        self.provider.stat(&self.uri).await
    }

    /// Loads exactly `size` bytes starting at `offset`, replacing the
    /// window and resetting the cursor.
    pub async fn load(&mut self, offset: u64, size: u64) -> Result<(), TagError> {
        log::trace!(target: "audiotag::reader", "loading {size} bytes at offset {offset} of {}", self.uri);
        let bytes = self.provider.read(&self.uri, size, offset).await?;
        self.window.load(bytes);
        Ok(())
    }

    pub fn read_n(&mut self, n: usize) -> Vec<u8> {
        self.window.read_n(n).to_vec()
    }

    pub fn read_until_nul(&mut self) -> Vec<u8> {
        self.window.read_until_nul().to_vec()
    }

    pub fn skip_n(&mut self, n: usize) -> usize {
        self.window.skip_n(n)
    }

    pub fn unsynchronise(&mut self, offset: usize, length: usize) -> usize {
        self.window.unsynchronise(offset, length)
    }

    pub fn remaining(&self) -> usize {
        self.window.remaining()
    }

    pub fn finished(&self) -> bool {
        self.window.finished()
    }
}
