//! Per-user icon storage and content-addressed icon versions
//!
//! Every icon is identified by the lowercase hex SHA-256 of its bytes. The
//! same [`IconHash`] is embedded in user profiles and served as the HTTP
//! entity tag, so identical bytes always yield an identical version token.
//! Users without a custom icon share the hash of a single fallback image,
//! computed once per process by the [`IconHashResolver`].

pub mod hash;
pub mod resolver;
pub mod store;

pub use hash::{content_hash, IconHash};
pub use resolver::{FallbackSource, IconFetch, IconHashResolver};
pub use store::{is_valid_icon_key, FsIconStore, IconStore, StoredIcon};
