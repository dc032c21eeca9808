//! Service layer: profile aggregation, the profile cache and the operations
//! request handlers call.

pub mod profile;
pub mod profile_cache;
pub mod profile_service;

pub use profile::ProfileAggregator;
pub use profile_cache::{CacheStats, ProfileCache};
pub use profile_service::ProfileService;
