//! Record store (system of record for users and listings).

pub mod store;

pub use store::{NewListing, RecordStore};
