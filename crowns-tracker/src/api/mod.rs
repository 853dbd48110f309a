//! HTTP API handlers for crowns-tracker

pub mod buildinfo;
pub mod carousel;
pub mod collection;
pub mod error;
pub mod friends;
pub mod health;
pub mod identity;
pub mod profile;
pub mod views;

pub use buildinfo::get_build_info;
pub use carousel::get_carousel;
pub use collection::{export_collection, get_collection, import_collection, toggle_record};
pub use error::ApiError;
pub use friends::{get_friend, list_friends};
pub use health::health_routes;
pub use identity::identity_middleware;
pub use profile::set_public;
