//! snipstash - a local-first snippet store.
//!
//! Each snippet is one plain-text record file: a YAML metadata block between
//! `---` markers followed by the body. [`SnippetStore`] keeps an in-memory
//! index of those files and offers lookup, upsert, delete and ranked search.

pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use models::{FileStore, FsFileStore, Snippet};
pub use search::{SearchOptions, SearchResult};
pub use store::{LoadReport, SkippedFile, SnippetStore, TagCount};
