//! A local-filesystem [`audiotag::FileProvider`], so a caller can point the
//! core at real files without writing their own capability glue.

mod local;

pub use local::LocalFileProvider;
