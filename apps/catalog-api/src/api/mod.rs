use axum::Router;
use domain_collections::{CollectionService, PgCollectionRepository};
use std::sync::Arc;

pub mod collections;
pub mod companies;
pub mod health;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix is added by the `create_router` helper.
///
/// One service instance backs both routers: the transfer endpoints and the
/// progress poller must share the same operation registry.
pub fn routes(state: &crate::state::AppState) -> Router {
    let repository = PgCollectionRepository::new(state.db.clone());
    let service = Arc::new(CollectionService::with_config(
        repository,
        state.config.transfer,
    ));

    Router::new()
        .nest("/collections", collections::router(service.clone()))
        .nest("/companies", companies::router(service))
}

/// Creates a router with the /ready endpoint that performs actual health
/// checks.
///
/// This router has state applied and can be merged with the stateless app
/// router from `create_router`.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
