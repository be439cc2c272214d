//! Session identifiers: `S-YYYYMMDD-XXXX`

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref RE_SESSION_ID: Regex = Regex::new(r"^S-[0-9]{8}-[A-Z0-9]{4}$").unwrap();
}

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// New session id stamped with the UTC date of `now`
pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let digest = hasher.finalize();

    let token: String = digest[..4]
        .iter()
        .map(|b| TOKEN_ALPHABET[*b as usize % TOKEN_ALPHABET.len()] as char)
        .collect();
    format!("S-{}-{}", now.format("%Y%m%d"), token)
}

pub fn is_valid_session_id(id: &str) -> bool {
    RE_SESSION_ID.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_ids_validate() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let id = generate_session_id(now);
        assert!(id.starts_with("S-20261019-"), "got {}", id);
        assert!(is_valid_session_id(&id));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!(!is_valid_session_id("S-2026101-ABCD"));
        assert!(!is_valid_session_id("S-20261019-abcd"));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id("S-20261019-ABCD/x"));
    }
}
