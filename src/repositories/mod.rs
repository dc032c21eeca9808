//! Repository contracts for data access
//!
//! The profile layer never issues SQL itself. It talks to a [`UserStore`],
//! which the database module implements on top of a caller-owned sqlx
//! transaction and which tests replace with in-memory fakes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use user_profiles::repositories::UserStore;
//!
//! async fn example(store: &mut impl UserStore) {
//!     let user = store.find_user_by_id(1).await?;
//! }
//! ```

pub mod traits;

pub use traits::*;
