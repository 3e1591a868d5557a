//! Binary-format tag parsers for FLAC, MP3 (ID3v1/ID3v2) and MP4/M4A
//! containers, sharing one streaming buffered reader and one tag data model.
//!
//! The crate has no opinion on where bytes come from: callers supply a
//! [`reader::FileProvider`] and get back a normalised [`model::TaggedFile`].
//! With the default `async` feature disabled, only the pure byte-level
//! utilities and the synchronous [`reader::Window`] are compiled in.

pub mod bytes;
pub mod error;
pub mod model;
pub mod reader;

#[cfg(feature = "async")]
pub mod flac;
#[cfg(feature = "async")]
pub mod id3v1;
#[cfg(feature = "async")]
pub mod id3v2;
#[cfg(feature = "async")]
pub mod mp4;

#[cfg(feature = "async")]
pub mod dispatch;
#[cfg(feature = "async")]
pub mod extract;

#[cfg(feature = "async")]
pub mod testing;

pub use error::TagError;
pub use model::{RequestedTags, TagKey, TagValue, TaggedFile};

#[cfg(feature = "async")]
pub use extract::extract;
#[cfg(feature = "async")]
pub use reader::FileProvider;
