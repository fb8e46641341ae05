use std::sync::Arc;

use crate::resolver::Resolver;

/// Shared application state passed to all handlers via axum State extractor.
/// The resolver is the only shared object, and it is read-only: per-request
/// store connections mean no locking and no cross-request coupling.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}
