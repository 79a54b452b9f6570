//! Naming conventions for keys and junction tables
//!
//! Pure functions: the defaults a relation falls back to when no override is
//! given. Table names are expected in plural snake_case (`posts`, `categories`).

/// Singular form of a plural snake_case table name.
///
/// Only the last underscore-separated segment is inflected, so
/// `blog_categories` becomes `blog_category`.
pub fn singularize(table: &str) -> String {
    let (prefix, word) = match table.rfind('_') {
        Some(index) => table.split_at(index + 1),
        None => ("", table),
    };

    let singular = if let Some(stem) = word.strip_suffix("ies") {
        format!("{}y", stem)
    } else if ["sses", "shes", "ches", "xes"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    };

    format!("{}{}", prefix, singular)
}

/// Conventional foreign key column referencing `table`: `<singular>_id`
pub fn foreign_key_for(table: &str) -> String {
    format!("{}_id", singularize(table))
}

/// Conventional junction table for two tables.
///
/// The names are sorted before joining so both sides of the association
/// resolve to the same table.
pub fn junction_table_name(first: &str, second: &str) -> String {
    let mut tables = [first, second];
    tables.sort_unstable();
    tables.join("_")
}
