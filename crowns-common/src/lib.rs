//! # Crowns Common Library
//!
//! Shared code for the crown tracker including:
//! - Record model and collection invariants
//! - CSV import/export codec
//! - Merge-by-name reconciliation of imports
//! - Progress summaries, filtering and carousel navigation
//! - Slug derivation for monster artwork
//! - Versioned document schema and the store adapter
//! - Configuration loading

pub mod config;
pub mod csv_codec;
pub mod error;
pub mod identity;
pub mod progress;
pub mod reconcile;
pub mod record;
pub mod slug;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use identity::Identity;
pub use record::{Collection, Crown, Record};
