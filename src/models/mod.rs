pub mod codec;
pub mod snippet;
pub mod storage;

pub use codec::{decode, decode_bytes, encode};
pub use snippet::{Snippet, sanitize_title};
pub use storage::{FileStore, FsFileStore};
