use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Store;
use crate::render::CardRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub renderer: Arc<CardRenderer>,
    /// Resolves bearer tokens to identities; used by the `AuthUser` and `AdminUser` extractors.
    pub auth: Arc<Authenticator>,
    pub config: Config,
}
