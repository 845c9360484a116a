//! Shared application state for the tangent's Axum router.

use std::sync::Arc;

use crate::client::CatalogServerClient;
use crate::config::TangentConfig;
use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct TangentState {
    pub config: Arc<TangentConfig>,
    pub cs_client: Arc<CatalogServerClient>,
    pub sessions: Arc<SessionRegistry>,
}
