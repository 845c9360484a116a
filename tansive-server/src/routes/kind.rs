//! Generic `/{kind}` and `/{kind}/*name` CRUD dispatch: catalogs, variants,
//! namespaces, views, resources, and skillsets share one route pair, keyed by the `kind` path
//! segment at runtime rather than by a type parameter, since axum gives every kind the same
//! two routes and dispatches them through one handler.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tansive_catalog::{
    validate_resource_name, validate_view_label, Catalog, CatalogObject, CatalogObjectRepository, CatalogRepository,
    DirectoryId, Namespace, NamespaceRepository, ObjectKind, ObjectRef, SchemaDirectoryRepository, Skillset, Variant,
    VariantRepository, View, ViewRepository, DEFAULT_ADMIN_VIEW_LABEL,
};
use tansive_core::{compute_content_hash, ActionToken, CatalogError, EntityIdType, ResourcePath, Scope};
use tansive_policy::{Intent, Rule, ViewDef};

use crate::auth::AuthExtractor;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;

/// Scoping query parameters accepted by the kind-generic routes. Which ones are required depends
/// on `kind`: variants/views/resources/skillsets require `catalog`; namespaces/resources/skillsets
/// also require `variant`.
#[derive(Debug, Deserialize, Default)]
pub struct ScopeQuery {
    pub catalog: Option<String>,
    pub variant: Option<String>,
}

fn require<'a>(field: &'a Option<String>, name: &str) -> ApiResult<&'a str> {
    field.as_deref().ok_or_else(|| ApiError::invalid_request(format!("missing ?{name}= query parameter")))
}

/// Parse a JSON or YAML request body based on `Content-Type` (default JSON), since the CLI posts
/// YAML manifests straight through without client-side translation.
fn parse_body<T: serde::de::DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> ApiResult<T> {
    let is_yaml = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("yaml"))
        .unwrap_or(false);
    if is_yaml { Ok(serde_yaml::from_slice(body)?) } else { Ok(serde_json::from_slice(body)?) }
}

fn resource_path(kind: &str, segments: &[&str]) -> ApiResult<ResourcePath> {
    ResourcePath::parse(&format!("res://{kind}/{}", segments.join("/"))).map_err(|e| ApiError::invalid_request(e.to_string()))
}

fn check_policy(state: &AppState, view: &ViewDef, resource: &ResourcePath, action: &str) -> ApiResult<()> {
    let action: ActionToken = action.into();
    if state.policy.is_allowed(view, resource, &action) {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::DisallowedByPolicy, format!("{action} on {resource} is denied by policy")))
    }
}

/// `POST /{kind}` — the object's own name/label/path lives in the body, since the URL carries no
/// name segment here.
pub async fn create(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(scope): Query<ScopeQuery>,
    AuthExtractor(ctx): AuthExtractor,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ApiResult<impl IntoResponse> {
    match kind.as_str() {
        "catalogs" => create_catalog(&state, &ctx.view, &headers, &body).await,
        "variants" => create_variant(&state, &ctx.view, &scope, &headers, &body).await,
        "namespaces" => create_namespace(&state, &ctx.view, &scope, &headers, &body).await,
        "views" => create_view(&state, &ctx.view, &scope, &headers, &body).await,
        "resources" => create_object(&state, &ctx.view, &scope, ObjectKind::Resource, &headers, &body).await,
        "skillsets" => create_object(&state, &ctx.view, &scope, ObjectKind::Skillset, &headers, &body).await,
        other => Err(ApiError::invalid_request(format!("unknown kind '{other}'"))),
    }
}

pub async fn get(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(scope): Query<ScopeQuery>,
    AuthExtractor(ctx): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    match kind.as_str() {
        "catalogs" => {
            check_policy(&state, &ctx.view, &resource_path("catalogs", &[&name])?, "system.catalog.read")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, &name).await?;
            Ok(Json(serde_json::to_value(catalog)?))
        }
        "variants" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("variants", &[catalog_name, &name])?, "system.variant.read")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, &name).await?;
            Ok(Json(serde_json::to_value(variant)?))
        }
        "namespaces" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let variant_name = require(&scope.variant, "variant")?;
            check_policy(
                &state,
                &ctx.view,
                &resource_path("namespaces", &[catalog_name, variant_name, &name])?,
                "system.namespace.read",
            )?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, variant_name).await?;
            let ns = state.store.get_namespace(variant.id, &name).await?;
            Ok(Json(serde_json::to_value(ns)?))
        }
        "views" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("views", &[catalog_name, &name])?, "system.view.read")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let view = state.store.get_view(catalog.id, &name).await?;
            Ok(Json(serde_json::to_value(view.def)?))
        }
        "resources" => get_object(&state, &ctx.view, &scope, ObjectKind::Resource, &name).await,
        "skillsets" => get_object(&state, &ctx.view, &scope, ObjectKind::Skillset, &name).await,
        other => Err(ApiError::invalid_request(format!("unknown kind '{other}'"))),
    }
}

/// `GET /{kind}?catalog=&variant=&prefix=` — list the items visible to the caller's view under
/// the given scope, filtering out any the caller's policy would deny a read of rather than
/// failing the whole listing. Backs both the CLI's `list` and `tree` surfaces; `tree` layers
/// path-prefix grouping over this same filtered enumeration.
pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(scope): Query<ScopeQuery>,
    AuthExtractor(ctx): AuthExtractor,
) -> ApiResult<Json<serde_json::Value>> {
    match kind.as_str() {
        "catalogs" => {
            let catalogs = state.store.list_catalogs(ctx.tenant_id, state.project_id).await?;
            let visible: Vec<_> = catalogs
                .into_iter()
                .filter(|c| check_policy(&state, &ctx.view, &resource_path("catalogs", &[&c.name]).unwrap(), "system.catalog.read").is_ok())
                .collect();
            Ok(Json(serde_json::to_value(visible)?))
        }
        "variants" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variants = state.store.list_variants(catalog.id).await?;
            let visible: Vec<_> = variants
                .into_iter()
                .filter(|v| {
                    check_policy(&state, &ctx.view, &resource_path("variants", &[catalog_name, &v.name]).unwrap(), "system.variant.read").is_ok()
                })
                .collect();
            Ok(Json(serde_json::to_value(visible)?))
        }
        "namespaces" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let variant_name = require(&scope.variant, "variant")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, variant_name).await?;
            let namespaces = state.store.list_namespaces(variant.id).await?;
            let visible: Vec<_> = namespaces
                .into_iter()
                .filter(|n| {
                    check_policy(&state, &ctx.view, &resource_path("namespaces", &[catalog_name, variant_name, &n.name]).unwrap(), "system.namespace.read")
                        .is_ok()
                })
                .collect();
            Ok(Json(serde_json::to_value(visible)?))
        }
        "views" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let views = state.store.list_views(catalog.id).await?;
            let visible: Vec<_> = views
                .into_iter()
                .filter(|v| check_policy(&state, &ctx.view, &resource_path("views", &[catalog_name, &v.label]).unwrap(), "system.view.read").is_ok())
                .map(|v| v.label)
                .collect();
            Ok(Json(serde_json::to_value(visible)?))
        }
        "resources" => list_objects(&state, &ctx.view, &scope, ObjectKind::Resource).await,
        "skillsets" => list_objects(&state, &ctx.view, &scope, ObjectKind::Skillset).await,
        other => Err(ApiError::invalid_request(format!("unknown kind '{other}'"))),
    }
}

async fn list_objects(state: &AppState, view: &ViewDef, scope: &ScopeQuery, kind: ObjectKind) -> ApiResult<Json<serde_json::Value>> {
    let variant = resolve_variant(state, scope).await?;
    let directory = directory_for(kind, &variant);
    let refs = state.store.list_by_prefix(directory, "/").await?;
    let action = format!("system.{}.read", kind_segment(kind).trim_end_matches('s'));
    let visible: Vec<String> = refs
        .into_iter()
        .map(|(path, _)| path)
        .filter(|path| {
            let addressed = path.strip_prefix(DEFINITION_PREFIX).unwrap_or(path);
            check_policy(state, view, &resource_path(kind_segment(kind), &[addressed]).unwrap(), &action).is_ok()
        })
        .collect();
    Ok(Json(serde_json::to_value(visible)?))
}

pub async fn put(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(scope): Query<ScopeQuery>,
    AuthExtractor(ctx): AuthExtractor,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ApiResult<impl IntoResponse> {
    match kind.as_str() {
        "catalogs" => {
            check_policy(&state, &ctx.view, &resource_path("catalogs", &[&name])?, "system.catalog.write")?;
            let update: CatalogUpdate = parse_body(&headers, &body)?;
            let mut catalog = state.store.get_catalog(ctx.tenant_id, &name).await?;
            if let Some(description) = update.description {
                catalog.description = description;
            }
            if let Some(info) = update.info {
                catalog.info = info;
            }
            state.store.update_catalog(catalog.clone()).await?;
            Ok((StatusCode::OK, Json(serde_json::to_value(catalog)?)))
        }
        "views" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("views", &[catalog_name, &name])?, "system.view.write")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let existing = state.store.get_view(catalog.id, &name).await?;
            let def: ViewDef = parse_body(&headers, &body)?;
            let view = View { id: existing.id, catalog_id: catalog.id, label: name, def };
            state.store.update_view(view.clone()).await?;
            Ok((StatusCode::OK, Json(serde_json::to_value(view.def)?)))
        }
        // Variants and namespaces have no mutable fields beyond their identity; PUT is an
        // existence check only (idempotent re-apply of an unchanged manifest).
        "variants" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("variants", &[catalog_name, &name])?, "system.variant.write")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, &name).await?;
            Ok((StatusCode::OK, Json(serde_json::to_value(variant)?)))
        }
        "namespaces" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let variant_name = require(&scope.variant, "variant")?;
            check_policy(
                &state,
                &ctx.view,
                &resource_path("namespaces", &[catalog_name, variant_name, &name])?,
                "system.namespace.write",
            )?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, variant_name).await?;
            let ns = state.store.get_namespace(variant.id, &name).await?;
            Ok((StatusCode::OK, Json(serde_json::to_value(ns)?)))
        }
        "resources" => put_object(&state, &ctx.view, &scope, ObjectKind::Resource, &name, &headers, &body).await,
        "skillsets" => put_object(&state, &ctx.view, &scope, ObjectKind::Skillset, &name, &headers, &body).await,
        other => Err(ApiError::invalid_request(format!("unknown kind '{other}'"))),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(scope): Query<ScopeQuery>,
    AuthExtractor(ctx): AuthExtractor,
) -> ApiResult<StatusCode> {
    match kind.as_str() {
        "catalogs" => {
            check_policy(&state, &ctx.view, &resource_path("catalogs", &[&name])?, "system.catalog.write")?;
            state.store.delete_catalog(ctx.tenant_id, &name).await?;
        }
        "variants" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("variants", &[catalog_name, &name])?, "system.variant.write")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            state.store.delete_variant(catalog.id, &name).await?;
        }
        "namespaces" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            let variant_name = require(&scope.variant, "variant")?;
            check_policy(
                &state,
                &ctx.view,
                &resource_path("namespaces", &[catalog_name, variant_name, &name])?,
                "system.namespace.write",
            )?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            let variant = state.store.get_variant(catalog.id, variant_name).await?;
            state.store.delete_namespace(variant.id, &name).await?;
        }
        "views" => {
            let catalog_name = require(&scope.catalog, "catalog")?;
            check_policy(&state, &ctx.view, &resource_path("views", &[catalog_name, &name])?, "system.view.write")?;
            let catalog = state.store.get_catalog(ctx.tenant_id, catalog_name).await?;
            state.store.delete_view(catalog.id, &name).await?;
        }
        "resources" => return delete_object(&state, &ctx.view, &scope, ObjectKind::Resource, &name).await,
        "skillsets" => return delete_object(&state, &ctx.view, &scope, ObjectKind::Skillset, &name).await,
        other => return Err(ApiError::invalid_request(format!("unknown kind '{other}'"))),
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------------------------
// catalogs
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogCreateBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    info: serde_json::Value,
}

#[derive(Debug, Deserialize, Default)]
struct CatalogUpdate {
    description: Option<String>,
    info: Option<serde_json::Value>,
}

async fn create_catalog(state: &AppState, view: &ViewDef, headers: &HeaderMap, body: &[u8]) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let req: CatalogCreateBody = parse_body(headers, body)?;
    validate_resource_name(&req.name).map_err(ApiError::from)?;
    check_policy(state, view, &resource_path("catalogs", &[&req.name])?, "system.catalog.write")?;

    let catalog = Catalog {
        id: tansive_core::CatalogId::now_v7(),
        tenant_id: state.tenant_id,
        project_id: state.project_id,
        name: req.name.clone(),
        description: req.description,
        info: req.info,
    };
    state.store.create_catalog(catalog.clone()).await?;

    // Every catalog gets an implicit `_default-admin-view` over itself so the creator can
    // immediately manage the catalog's contents.
    let admin_view = View {
        id: tansive_core::ViewId::now_v7(),
        catalog_id: catalog.id,
        label: DEFAULT_ADMIN_VIEW_LABEL.to_string(),
        def: ViewDef::new(
            DEFAULT_ADMIN_VIEW_LABEL,
            Scope::catalog_only(catalog.id, &catalog.name),
            vec![
                Rule::new(
                    Intent::Allow,
                    vec!["system.catalog.admin".into()],
                    vec![resource_path("catalogs", &[&catalog.name])?],
                ),
                Rule::new(
                    Intent::Allow,
                    vec!["system.variant.admin".into()],
                    vec![resource_path("variants", &[&catalog.name, "*"])?],
                ),
                // Namespace admin can't be wildcarded across every variant in one target (a
                // target pattern consumes exactly one wildcard segment), so it is granted
                // per-variant once a variant exists rather than blanket at catalog creation.
            ],
        ),
    };
    state.store.create_view(admin_view).await?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(catalog)?)))
}

// ---------------------------------------------------------------------------------------------
// variants
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VariantCreateBody {
    name: String,
}

async fn create_variant(
    state: &AppState,
    view: &ViewDef,
    scope: &ScopeQuery,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let catalog_name = require(&scope.catalog, "catalog")?;
    let req: VariantCreateBody = parse_body(headers, body)?;
    validate_resource_name(&req.name).map_err(ApiError::from)?;
    check_policy(state, view, &resource_path("variants", &[catalog_name, &req.name])?, "system.variant.write")?;

    let catalog = state.store.get_catalog(state.tenant_id, catalog_name).await?;
    let variant = Variant {
        id: tansive_core::VariantId::now_v7(),
        catalog_id: catalog.id,
        name: req.name,
        resource_directory_id: uuid::Uuid::new_v4(),
        skillset_directory_id: uuid::Uuid::new_v4(),
    };
    state.store.create_variant(variant.clone()).await?;

    // Extend the catalog's default admin view with a namespace-admin rule scoped to this variant:
    // the admin shortcut can't wildcard across variants that don't exist yet (see the comment in
    // `create_catalog`), so each variant grants its own slice once it's created.
    if let Ok(mut admin_view) = state.store.get_view(catalog.id, DEFAULT_ADMIN_VIEW_LABEL).await {
        admin_view.def.rules.push(Rule::new(
            Intent::Allow,
            vec!["system.namespace.admin".into()],
            vec![resource_path("namespaces", &[catalog_name, &variant.name, "*"])?],
        ));
        state.store.update_view(admin_view).await?;
    }

    Ok((StatusCode::CREATED, Json(serde_json::to_value(variant)?)))
}

// ---------------------------------------------------------------------------------------------
// namespaces
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NamespaceCreateBody {
    name: String,
    #[serde(default)]
    description: String,
}

async fn create_namespace(
    state: &AppState,
    view: &ViewDef,
    scope: &ScopeQuery,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let catalog_name = require(&scope.catalog, "catalog")?;
    let variant_name = require(&scope.variant, "variant")?;
    let req: NamespaceCreateBody = parse_body(headers, body)?;
    validate_resource_name(&req.name).map_err(ApiError::from)?;
    check_policy(
        state,
        view,
        &resource_path("namespaces", &[catalog_name, variant_name, &req.name])?,
        "system.namespace.write",
    )?;

    let catalog = state.store.get_catalog(state.tenant_id, catalog_name).await?;
    let variant = state.store.get_variant(catalog.id, variant_name).await?;
    let ns = Namespace { variant_id: variant.id, name: req.name, description: req.description };
    state.store.create_namespace(ns.clone()).await?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(ns)?)))
}

// ---------------------------------------------------------------------------------------------
// views
// ---------------------------------------------------------------------------------------------

async fn create_view(
    state: &AppState,
    view: &ViewDef,
    scope: &ScopeQuery,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let catalog_name = require(&scope.catalog, "catalog")?;
    let def: ViewDef = parse_body(headers, body)?;
    validate_view_label(&def.label).map_err(ApiError::from)?;
    check_policy(state, view, &resource_path("views", &[catalog_name, &def.label])?, "system.view.write")?;

    let catalog = state.store.get_catalog(state.tenant_id, catalog_name).await?;
    let new_view = View { id: tansive_core::ViewId::now_v7(), catalog_id: catalog.id, label: def.label.clone(), def };
    state.store.create_view(new_view.clone()).await?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(new_view.def)?)))
}

// ---------------------------------------------------------------------------------------------
// resources / skillsets: content-addressed objects in a variant's schema directories
// ---------------------------------------------------------------------------------------------

/// `resources` paths starting with this prefix address the resource's JSON Schema definition
/// rather than its value, disambiguating `GET /resources/definition/<path>` from
/// `GET /resources/<path>` at the storage layer.
const DEFINITION_PREFIX: &str = "definition/";

fn directory_for(kind: ObjectKind, variant: &Variant) -> DirectoryId {
    match kind {
        ObjectKind::Resource => variant.resource_directory_id,
        ObjectKind::Skillset => variant.skillset_directory_id,
    }
}

fn kind_segment(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Resource => "resources",
        ObjectKind::Skillset => "skillsets",
    }
}

#[derive(Debug, Deserialize)]
struct ObjectCreateBody {
    path: String,
    #[serde(default)]
    is_definition: bool,
    value: serde_json::Value,
}

async fn resolve_variant(state: &AppState, scope: &ScopeQuery) -> ApiResult<Variant> {
    let catalog_name = require(&scope.catalog, "catalog")?;
    let variant_name = require(&scope.variant, "variant")?;
    let catalog = state.store.get_catalog(state.tenant_id, catalog_name).await?;
    Ok(state.store.get_variant(catalog.id, variant_name).await?)
}

async fn insert_and_ref(state: &AppState, kind: ObjectKind, directory: DirectoryId, directory_path: &str, value: &serde_json::Value) -> ApiResult<()> {
    let payload = serde_json::to_vec(value)?;
    let hash = compute_content_hash(&payload);
    let hash_hex = hex::encode(hash);
    let hash_id = CatalogObject::hash_id_for(&hash_hex);
    let compressed = snap::raw::Encoder::new()
        .compress_vec(&payload)
        .map_err(|e| ApiError::new(ErrorCode::InternalError, format!("compression failed: {e}")))?;

    state
        .store
        .insert_object(CatalogObject {
            hash_id: hash_id.clone(),
            hash: hash_hex.clone(),
            object_type: kind,
            version: 1,
            tenant_id: state.tenant_id,
            compressed_payload: compressed,
        })
        .await?;

    state
        .store
        .put_ref(
            directory,
            directory_path,
            ObjectRef { hash: hash_hex, content_type: kind, references: None, metadata: serde_json::Value::Null, updated_at: chrono::Utc::now() },
        )
        .await?;
    Ok(())
}

async fn create_object(
    state: &AppState,
    view: &ViewDef,
    scope: &ScopeQuery,
    kind: ObjectKind,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let variant = resolve_variant(state, scope).await?;

    if kind == ObjectKind::Skillset {
        let skillset: Skillset = parse_body(headers, body)?;
        check_policy(state, view, &resource_path("skillsets", &[&skillset.path])?, "system.skillset.write")?;
        let value = serde_json::to_value(&skillset)?;
        insert_and_ref(state, kind, variant.skillset_directory_id, &skillset.path, &value).await?;
        return Ok((StatusCode::CREATED, Json(value)));
    }

    let req: ObjectCreateBody = parse_body(headers, body)?;
    check_policy(state, view, &resource_path("resources", &[&req.path])?, "system.resource.write")?;
    let directory_path = if req.is_definition { format!("{DEFINITION_PREFIX}{}", req.path) } else { req.path.clone() };
    insert_and_ref(state, kind, variant.resource_directory_id, &directory_path, &req.value).await?;
    Ok((StatusCode::CREATED, Json(req.value)))
}

async fn put_object(
    state: &AppState,
    view: &ViewDef,
    scope: &ScopeQuery,
    kind: ObjectKind,
    name: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let variant = resolve_variant(state, scope).await?;
    let action = format!("system.{}.write", kind_segment(kind).trim_end_matches('s'));
    check_policy(state, view, &resource_path(kind_segment(kind), &[name])?, &action)?;

    let (directory, directory_path, value) = if kind == ObjectKind::Skillset {
        let skillset: Skillset = parse_body(headers, body)?;
        if skillset.path != name {
            return Err(ApiError::invalid_request("skillset path in body does not match the URL"));
        }
        (variant.skillset_directory_id, name.to_string(), serde_json::to_value(&skillset)?)
    } else {
        let req: ObjectCreateBody = parse_body(headers, body)?;
        let directory_path = if req.is_definition { format!("{DEFINITION_PREFIX}{name}") } else { name.to_string() };
        (variant.resource_directory_id, directory_path, req.value)
    };

    insert_and_ref(state, kind, directory, &directory_path, &value).await?;
    Ok((StatusCode::OK, Json(value)))
}

async fn get_object(state: &AppState, view: &ViewDef, scope: &ScopeQuery, kind: ObjectKind, name: &str) -> ApiResult<Json<serde_json::Value>> {
    let variant = resolve_variant(state, scope).await?;
    let action = format!("system.{}.read", kind_segment(kind).trim_end_matches('s'));

    // `definition/<path>` (resources only) addresses the schema rather than the value; policy is
    // still evaluated against the underlying resource path either way.
    let addressed_name = name.strip_prefix(DEFINITION_PREFIX).unwrap_or(name);
    check_policy(state, view, &resource_path(kind_segment(kind), &[addressed_name])?, &action)?;

    let directory = directory_for(kind, &variant);
    let object_ref = state
        .store
        .get_ref(directory, name)
        .await?
        .ok_or_else(|| ApiError::not_found(kind_segment(kind), name))?;
    let object = state.store.get_object(state.tenant_id, &CatalogObject::hash_id_for(&object_ref.hash)).await?;
    let decompressed = snap::raw::Decoder::new()
        .decompress_vec(&object.compressed_payload)
        .map_err(|e| ApiError::new(ErrorCode::IntegrityError, format!("decompression failed: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&decompressed)?;
    Ok(Json(value))
}

async fn delete_object(state: &AppState, view: &ViewDef, scope: &ScopeQuery, kind: ObjectKind, name: &str) -> ApiResult<StatusCode> {
    let variant = resolve_variant(state, scope).await?;
    let action = format!("system.{}.write", kind_segment(kind).trim_end_matches('s'));
    let addressed_name = name.strip_prefix(DEFINITION_PREFIX).unwrap_or(name);
    check_policy(state, view, &resource_path(kind_segment(kind), &[addressed_name])?, &action)?;

    let directory = directory_for(kind, &variant);
    let object_ref = state.store.get_ref(directory, name).await?.ok_or_else(|| ApiError::not_found(kind_segment(kind), name))?;
    state.store.delete_ref(directory, name).await?;

    // Best-effort reference counting: only this one directory is known to this handler, so treat
    // "no longer present here" as "unreferenced" and let the store's own invariant (still
    // referenced elsewhere) reject the delete if another directory still points at the hash.
    let hash_id = CatalogObject::hash_id_for(&object_ref.hash);
    match state.store.delete_object_if_unreferenced(state.tenant_id, &hash_id, 0).await {
        Ok(()) => {}
        Err(CatalogError::StillReferenced { .. }) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(StatusCode::NO_CONTENT)
}
