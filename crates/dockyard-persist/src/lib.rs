//! dockyard-persist: on-disk machine registry
//!
//! Stores one JSON document per machine under
//! `<root>/machines/<name>/config.json`. A machine exists exactly when its
//! directory exists.

pub mod error;
pub mod filestore;
pub mod traits;

pub use error::StoreError;
pub use filestore::Filestore;
pub use traits::HostStore;
