use axum::Router;
use domain_collections::{handlers, CollectionService, PgCollectionRepository};
use std::sync::Arc;

pub fn router(service: Arc<CollectionService<PgCollectionRepository>>) -> Router {
    handlers::companies_router(service)
}
