/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./user-profiles.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Storage defaults
pub const DEFAULT_ICON_PATH: &str = "./data/icons";
pub const DEFAULT_FALLBACK_ICON_PATH: &str = "./img/NoImage.jpg";
