mod entries;
mod feeds;
mod schema;
mod store;
mod types;

pub use schema::{Database, DEFAULT_MAX_CONNECTIONS};
pub use store::FeedStore;
pub use types::DatabaseError;
