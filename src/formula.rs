//! Professional-search formula helpers.
//!
//! CNKI's professional search takes field-qualified expressions such as
//! `AU='张三' AND AF='北京大学'`.

use crate::error::{CnkiError, Result};

/// Build a formula from an author and/or an affiliation, joined with `AND`.
///
/// # Errors
///
/// Returns a validation error if neither part is given.
pub fn build(author: Option<&str>, affiliation: Option<&str>) -> Result<String> {
    let parts: Vec<String> = [("AU", author), ("AF", affiliation)]
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| format!("{}='{}'", field, value))
        })
        .collect();

    if parts.is_empty() {
        return Err(CnkiError::Validation(
            "Provide a search formula, an author or an affiliation".to_string(),
        ));
    }
    Ok(parts.join(" AND "))
}

/// Use `query` when non-empty, otherwise [`build`] from the named parts.
pub fn resolve(
    query: Option<&str>,
    author: Option<&str>,
    affiliation: Option<&str>,
) -> Result<String> {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => Ok(query.to_string()),
        None => build(author, affiliation),
    }
}
