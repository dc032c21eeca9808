pub mod assets;
pub mod config;
pub mod database;
pub mod errors;
pub mod icons;
pub mod models;
pub mod repositories;
pub mod services;
