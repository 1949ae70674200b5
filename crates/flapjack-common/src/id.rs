use sha1::{Digest, Sha1};

/// Generates a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Stable short acknowledgement token for a check: the first 8 hex chars of
/// the SHA-1 of its id. Derived from the id, never the name, so it survives
/// renames.
pub fn ack_hash(check_id: &str) -> String {
    let digest = Sha1::digest(check_id.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..8].to_string()
}
