//! # FarmQuest Common Library
//!
//! Shared code for the FarmQuest services including:
//! - Database initialization, schema migrations and the settings table
//! - Event types (FqEvent enum) and the EventBus
//! - Root folder and TOML bootstrap configuration
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
