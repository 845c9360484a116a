//! Name/label validators enforced at the persistence boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use tansive_core::CatalogError;

/// Pattern shared by catalog/variant/namespace resource names.
static RESOURCE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// View labels use the same character class as resource names (see spec: `[A-Za-z0-9_-]+`).
static VIEW_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

pub fn validate_resource_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() || !RESOURCE_NAME_RE.is_match(name) {
        return Err(CatalogError::InvalidName {
            name: name.to_string(),
            reason: "must be non-empty and match [A-Za-z0-9_-]+".to_string(),
        });
    }
    Ok(())
}

pub fn validate_view_label(label: &str) -> Result<(), CatalogError> {
    if label.is_empty() || !VIEW_LABEL_RE.is_match(label) {
        return Err(CatalogError::InvalidName {
            name: label.to_string(),
            reason: "must be non-empty and match [A-Za-z0-9_-]+".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        assert!(validate_resource_name("valid-catalog").is_ok());
        assert!(validate_view_label("_default-admin-view").is_ok());
    }

    #[test]
    fn names_with_slashes_are_rejected() {
        assert!(validate_resource_name("bad/name").is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(validate_resource_name("").is_err());
        assert!(validate_view_label("").is_err());
    }
}
