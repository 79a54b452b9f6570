//! Identifier safety for names that end up in generated SQL
//!
//! Table and column names cannot be bound as parameters, so every name a
//! relation is configured with goes through [`validate_identifier`] before it
//! reaches a query.

use crate::error::ModelError;

/// Characters allowed in SQL identifiers (alphanumeric, underscore, dollar)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// Keywords rejected as bare identifiers
static SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "UNION", "DROP", "CREATE",
    "ALTER", "GRANT", "REVOKE", "TRUNCATE", "EXEC", "EXECUTE", "DECLARE", "CAST", "TABLE",
    "USER", "SESSION_USER", "CURRENT_USER", "AND", "OR", "NOT", "IN", "AS", "ON",
];

/// Validate that an identifier is safe to place in SQL unquoted
///
/// ```
/// use elif_relations::security::validate_identifier;
///
/// assert!(validate_identifier("posts_tags").is_ok());
/// assert!(validate_identifier("posts_tags; --").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<(), ModelError> {
    let Some(first) = identifier.chars().next() else {
        return Err(ModelError::Validation("Identifier cannot be empty".to_string()));
    };

    // PostgreSQL truncates identifiers past 63 bytes
    if identifier.len() > 63 {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is too long (max 63 characters)",
            identifier
        )));
    }

    if let Some(c) = identifier.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if first.is_ascii_digit() {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' cannot start with a number",
            identifier
        )));
    }

    if SQL_KEYWORDS.contains(&identifier.to_uppercase().as_str()) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is a reserved SQL keyword",
            identifier
        )));
    }

    Ok(())
}

/// Validate each name in turn, stopping at the first failure
pub fn validate_identifiers<'a, I>(identifiers: I) -> Result<(), ModelError>
where
    I: IntoIterator<Item = &'a str>,
{
    identifiers.into_iter().try_for_each(validate_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("posts_tags").is_ok());
        assert!(validate_identifier("post_id").is_ok());
        assert!(validate_identifier("$tmp").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1posts").is_err());
        assert!(validate_identifier("posts; DROP TABLE users").is_err());
        assert!(validate_identifier("posts.tags").is_err());
        assert!(validate_identifier("select").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_identifiers_reports_first_failure() {
        let result = validate_identifiers(["posts_tags", "bad-name", "1x"]);
        assert!(matches!(result, Err(ModelError::Validation(msg)) if msg.contains("bad-name")));
    }
}
