//! Initial key and energy extraction from Mixed In Key comments

use once_cell::sync::Lazy;
use regex::Regex;

static INITIAL_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,2}[A-G]$").unwrap());
static ENERGY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Energy ([0-9]{1,2})").unwrap());

/// The first whitespace-delimited token, if it is a key like `5A` or `11B`
pub fn parse_initial_key(comment: &str) -> Option<&str> {
    comment
        .split_whitespace()
        .next()
        .filter(|token| INITIAL_KEY.is_match(token))
}

/// The level of the first `Energy N` anywhere in the comment
pub fn parse_energy(comment: &str) -> Option<u8> {
    ENERGY
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_mik_comment() {
        assert_eq!(parse_initial_key("5A - Energy 6 old note"), Some("5A"));
        assert_eq!(parse_initial_key("  11B Energy 7"), Some("11B"));
    }

    #[test]
    fn test_key_rejects_other_tokens() {
        assert_eq!(parse_initial_key(""), None);
        assert_eq!(parse_initial_key("Energy 6"), None);
        assert_eq!(parse_initial_key("123A"), None);
        assert_eq!(parse_initial_key("5H"), None);
        assert_eq!(parse_initial_key("5a"), None);
        assert_eq!(parse_initial_key("5A- Energy 6"), None);
    }

    #[test]
    fn test_energy_anywhere() {
        assert_eq!(parse_energy("5A - Energy 6 old note"), Some(6));
        assert_eq!(parse_energy("bought 2019 / 8B - Energy 10"), Some(10));
        assert_eq!(parse_energy("Energy 3 then Energy 9"), Some(3));
    }

    #[test]
    fn test_energy_missing() {
        assert_eq!(parse_energy("5A"), None);
        assert_eq!(parse_energy("energy 6"), None);
        assert_eq!(parse_energy("Energy x"), None);
    }

    #[test]
    fn test_key_and_energy_independent() {
        let comment = "Energy 4 only";
        assert_eq!(parse_initial_key(comment), None);
        assert_eq!(parse_energy(comment), Some(4));
    }
}
