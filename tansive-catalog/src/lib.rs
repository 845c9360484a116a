//! Repository contracts and row types for catalogs, variants, namespaces, views, schema
//! directories, catalog objects, sessions, and tangents, plus an in-memory reference
//! implementation backing the catalog server's default deployment mode.

mod memory;
mod models;
mod skillset;
mod traits;
mod validation;

pub use memory::InMemoryCatalog;
pub use models::*;
pub use skillset::{ContextEntry, SkillDef, SkillSource, Skillset, SkillsetMetadata};
pub use traits::{
    CatalogObjectRepository, CatalogRepository, NamespaceRepository, SchemaDirectoryRepository, SessionRepository,
    TangentRepository, TenantRepository, VariantRepository, ViewRepository, DEFAULT_ADMIN_VIEW_LABEL,
};
pub use validation::{validate_resource_name, validate_view_label};
