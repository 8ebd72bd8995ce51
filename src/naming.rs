//! Naming helpers used to derive default storage names for navigations
//!
//! Pluralization is a small rule set, not a dictionary. Anything it gets
//! wrong can be overridden on the declaration.

use convert_case::{Case, Casing};

/// Convert a type or field name to lower camel case.
///
/// # Example
/// ```
/// use graphql_navigation::naming::lower_camel;
///
/// assert_eq!(lower_camel("UserRole"), "userRole");
/// assert_eq!(lower_camel("user_claim"), "userClaim");
/// ```
pub fn lower_camel(name: &str) -> String {
    name.to_case(Case::Camel)
}

/// Pluralize an English word using a handful of suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{}es", word);
    }

    if let Some(stem) = word.strip_suffix(['y', 'Y']) {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u') | None) {
            return format!("{}ies", stem);
        }
    }

    format!("{}s", word)
}

/// Lower camel case plural, e.g. `UserRole` -> `userRoles`.
pub fn plural_camel(name: &str) -> String {
    pluralize(&lower_camel(name))
}
