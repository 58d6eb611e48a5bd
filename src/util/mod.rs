//! Identifier generation for feeds and entries.
//!
//! ```
//! use atompub::util::{new_id, URN_UUID_PREFIX};
//!
//! let id = new_id();
//! assert!(id.starts_with(URN_UUID_PREFIX));
//! ```

mod id;

pub use id::{new_id, URN_UUID_PREFIX};
