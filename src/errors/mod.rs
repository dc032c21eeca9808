//! Centralized error handling for the user profile service
//!
//! Errors are layered the same way the data flows:
//!
//! - **Repository Errors**: SQLite access through the transactional store
//! - **Icon Store Errors**: filesystem blob store failures
//! - **Profile Errors**: what the cache and aggregator surface to callers
//! - **App Errors**: startup and CLI level failures
//!
//! # Usage
//!
//! ```rust
//! use user_profiles::errors::{ProfileError, ProfileResult};
//!
//! fn example() -> ProfileResult<()> {
//!     Err(ProfileError::not_found("user", "42"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for icon blob store Results
pub type IconStoreResult<T> = Result<T, IconStoreError>;

/// Convenience type alias for profile assembly and cache Results
pub type ProfileResult<T> = Result<T, ProfileError>;
