use regex::Regex;
use std::sync::OnceLock;

/// Validates a user name before it goes anywhere near the store.
///
/// Rules:
/// 1. Between 1 and 64 characters
/// 2. No whitespace or control characters anywhere
///
/// Case is preserved and significant: "Alice" and "alice" are two accounts.
pub fn validate_user_name(name: &str) -> Result<(), String> {
    // 1. Length check (in characters, not bytes, so non-ASCII names aren't punished)
    let len = name.chars().count();
    if len == 0 {
        return Err("User name is required".to_string());
    }
    if len > 64 {
        return Err("User name must be at most 64 characters long".to_string());
    }

    // 2. Format check
    // Spaces in user names make the login form a guessing game. Ban them outright.
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("static regex is valid"));

    if !re.is_match(name) {
        return Err("User name cannot contain whitespace or control characters".to_string());
    }

    Ok(())
}

/// Collection item ids come straight from the URL path. Same idea, looser limit.
pub fn validate_item_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("Item id is required".to_string());
    }
    if id.chars().count() > 256 {
        return Err("Item id must be at most 256 characters long".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice")]
    #[case("Alice_99")]
    #[case("jöran")]
    #[case("a")]
    fn accepts_reasonable_names(#[case] name: &str) {
        assert!(validate_user_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    #[case("tab\there")]
    #[case(" leading")]
    fn rejects_bad_names(#[case] name: &str) {
        assert!(validate_user_name(name).is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "x".repeat(65);
        assert!(validate_user_name(&name).is_err());
        assert!(validate_user_name(&name[..64]).is_ok());
    }

    #[test]
    fn item_ids_must_not_be_blank() {
        assert!(validate_item_id("42").is_ok());
        assert!(validate_item_id("  ").is_err());
    }
}
