/// Normalize a username for validation, lookup and uniqueness checks.
pub(super) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_username_trims_and_lowercases() {
        assert_eq!(normalize_username("  Alice.B "), "alice.b");
        assert_eq!(normalize_username(""), "");
    }
}
