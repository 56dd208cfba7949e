//! zotkeeper core — record model, library gateway, write wrapper, config.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;

pub use config::{DateFormat, ReconcileConfig};
pub use error::{GatewayError, Result};
pub use gateway::{LibraryGateway, MemoryGateway, RecordFilter, WriteOutcome, commit_patch};
pub use models::*;
