//! The public entry point: resolves a URI against a [`FileProvider`], then
//! hands off to the [`crate::dispatch`] dispatcher.

use crate::error::TagError;
use crate::model::{RequestedTags, TaggedFile};
use crate::reader::{FileProvider, Reader};

/// Extracts `requestedTags` from `uri`, using `provider` for all bytes.
///
/// Fails with [`TagError::FileMissing`] if the provider reports the URI does
/// not exist; every other failure mode is a parser or dispatcher error.
pub async fn extract(
    provider: &dyn FileProvider,
    uri: &str,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    let stat = provider.stat(uri).await?;
    if !stat.exists {
        return Err(TagError::FileMissing(uri.to_string()));
    }

    let mut reader = Reader::new(provider, uri);
    crate::dispatch::dispatch(&mut reader, requested).await
}
