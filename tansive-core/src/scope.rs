//! Scope — the (catalog, variant, namespace) triple a view or session is bound to.

use crate::identity::{CatalogId, VariantId};
use serde::{Deserialize, Serialize};

/// Implicit default namespace name when none is specified.
pub const ROOT_NAMESPACE: &str = "--root--";

/// A scope narrows a view (or session) to a catalog and, optionally, a variant and namespace
/// within it. `variant`/`namespace` being `None` means "all within the outer scope".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub catalog: CatalogId,
    pub catalog_name: String,
    pub variant: Option<VariantId>,
    pub variant_name: Option<String>,
    pub namespace: Option<String>,
}

impl Scope {
    pub fn catalog_only(catalog: CatalogId, catalog_name: impl Into<String>) -> Self {
        Self {
            catalog,
            catalog_name: catalog_name.into(),
            variant: None,
            variant_name: None,
            namespace: None,
        }
    }

    /// The effective namespace name, defaulting to the implicit root namespace.
    pub fn namespace_or_root(&self) -> &str {
        self.namespace.as_deref().unwrap_or(ROOT_NAMESPACE)
    }

    pub fn with_variant(mut self, variant: VariantId, variant_name: impl Into<String>) -> Self {
        self.variant = Some(variant);
        self.variant_name = Some(variant_name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityIdType;

    #[test]
    fn namespace_defaults_to_root() {
        let scope = Scope::catalog_only(CatalogId::new_v4(), "cat");
        assert_eq!(scope.namespace_or_root(), ROOT_NAMESPACE);
    }

    #[test]
    fn explicit_namespace_overrides_default() {
        let scope = Scope::catalog_only(CatalogId::new_v4(), "cat").with_namespace("ns1");
        assert_eq!(scope.namespace_or_root(), "ns1");
    }
}
