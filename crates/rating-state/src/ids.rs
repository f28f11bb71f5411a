//! Opaque identifiers for sessions and evaluations.
//!
//! Format: `{prefix}_{base36 unix millis}_{6 random base36 chars}`, e.g.
//! `session_lq2k9x1c_4f9a0z`. Short enough to share in a link, unlikely to
//! collide at classroom scale. These ids are not secrets.

use chrono::Utc;
use uuid::Uuid;

pub const SESSION_ID_PREFIX: &str = "session";
pub const EVALUATION_ID_PREFIX: &str = "eval";

const RANDOM_SUFFIX_LEN: usize = 6;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a new id with the given type prefix.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let time = to_base36(millis);

    let random = Uuid::new_v4().as_u128() % 36u128.pow(RANDOM_SUFFIX_LEN as u32);
    let random = to_base36(random);

    format!("{prefix}_{time}_{random:0>width$}", width = RANDOM_SUFFIX_LEN)
}

/// Encode an unsigned integer in lowercase base 36.
pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // ALPHABET is ASCII
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "zz");
    }

    #[test]
    fn id_has_prefix_time_and_suffix() {
        let id = generate_id(SESSION_ID_PREFIX);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2].len(), RANDOM_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1_000).map(|_| generate_id(EVALUATION_ID_PREFIX)).collect();
        assert_eq!(ids.len(), 1_000);
    }
}
