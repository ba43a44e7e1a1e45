pub mod cache;
pub mod gateway;
pub mod grid;
pub mod postgrest;
pub mod refresher;
pub mod selection;
pub mod severity;
pub mod store;
pub mod summary;
pub mod timezone;
