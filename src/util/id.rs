use uuid::Uuid;

/// Prefix shared by every feed and entry identifier.
pub const URN_UUID_PREFIX: &str = "urn:uuid:";

/// Generate a fresh resource identifier of the form `urn:uuid:<v4-uuid>`.
pub fn new_id() -> String {
    format!("{}{}", URN_UUID_PREFIX, Uuid::new_v4().hyphenated())
}
