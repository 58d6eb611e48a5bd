//! Feed domain model and the Atom wire format.
//!
//! - [`model`] - `Feed`, `Entry` and the `Text` construct they share
//! - [`atom`] - decoding inbound `<entry>` documents and encoding feeds and
//!   entries with quick-xml
//!
//! # Example
//!
//! ```
//! use atompub::feed::{decode_entry, encode_entry};
//!
//! let entry = decode_entry(b"<entry><title>Hello</title><content>World</content></entry>").unwrap();
//! assert_eq!(entry.title.kind, "text");
//!
//! let xml = encode_entry(&entry).unwrap();
//! assert!(String::from_utf8(xml).unwrap().contains("<title type=\"text\">Hello</title>"));
//! ```

mod atom;
mod model;

pub use atom::{decode_entry, encode_entry, encode_feed, DecodeError, EncodeError, ATOM_NAMESPACE};
pub use model::{Entry, Feed, Text, DEFAULT_TEXT_TYPE};
