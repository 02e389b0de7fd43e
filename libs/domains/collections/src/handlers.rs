use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
    UuidPath, ValidatedJson,
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::CollectionResult;
use crate::models::{
    AddCompaniesRequest, Collection, CollectionPage, CompanyPage, CompanyWithLiked,
    OperationProgress, OperationStarted, OperationStatus, PageQuery,
};
use crate::repository::CollectionRepository;
use crate::service::CollectionService;

const COLLECTIONS_TAG: &str = "collections";
const COMPANIES_TAG: &str = "companies";

/// OpenAPI documentation for the collections endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        list_collections,
        get_collection,
        add_companies,
        copy_collection,
        move_companies,
        operation_progress,
    ),
    components(
        schemas(
            Collection,
            CollectionPage,
            CompanyWithLiked,
            AddCompaniesRequest,
            OperationStarted,
            OperationProgress,
            OperationStatus
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = COLLECTIONS_TAG, description = "Collection management and bulk transfer endpoints")
    )
)]
pub struct CollectionsApiDoc;

/// OpenAPI documentation for the company catalog endpoints
#[derive(OpenApi)]
#[openapi(
    paths(list_companies),
    components(schemas(CompanyPage, CompanyWithLiked)),
    tags(
        (name = COMPANIES_TAG, description = "Company catalog endpoints")
    )
)]
pub struct CompaniesApiDoc;

/// Create the collections router with all HTTP endpoints.
///
/// Takes the service behind an `Arc` so the same instance (and with it the
/// operation registry) can back both this router and the companies router.
pub fn collections_router<R: CollectionRepository + 'static>(
    service: Arc<CollectionService<R>>,
) -> Router {
    Router::new()
        .route("/", get(list_collections))
        .route("/{id}", get(get_collection))
        .route("/{id}/companies", post(add_companies))
        .route("/{id}/copy-to/{target_id}", post(copy_collection))
        .route("/{id}/move-to/{target_id}", post(move_companies))
        .route("/operation-progress/{operation_id}", get(operation_progress))
        .with_state(service)
}

/// Create the company catalog router
pub fn companies_router<R: CollectionRepository + 'static>(
    service: Arc<CollectionService<R>>,
) -> Router {
    Router::new()
        .route("/", get(list_companies))
        .with_state(service)
}

/// List all collection metadata
#[utoipa::path(
    get,
    path = "",
    tag = COLLECTIONS_TAG,
    responses(
        (status = 200, description = "List of collections", body = Vec<Collection>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_collections<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
) -> CollectionResult<Json<Vec<Collection>>> {
    let collections = service.list_collections().await?;
    Ok(Json(collections))
}

/// Get one page of a collection's companies
#[utoipa::path(
    get,
    path = "/{id}",
    tag = COLLECTIONS_TAG,
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Collection page", body = CollectionPage),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_collection<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    UuidPath(id): UuidPath,
    Query(page): Query<PageQuery>,
) -> CollectionResult<Json<CollectionPage>> {
    let collection = service
        .get_collection_page(id, page.offset, page.limit)
        .await?;
    Ok(Json(collection))
}

/// Add companies to a collection, skipping ones already present
#[utoipa::path(
    post,
    path = "/{id}/companies",
    tag = COLLECTIONS_TAG,
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    request_body = AddCompaniesRequest,
    responses(
        (status = 200, description = "Companies added; first page of the collection", body = CollectionPage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn add_companies<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(request): ValidatedJson<AddCompaniesRequest>,
) -> CollectionResult<Json<CollectionPage>> {
    let collection = service.add_companies(id, request.company_ids).await?;
    Ok(Json(collection))
}

/// Start copying every company from one collection into another.
///
/// Returns immediately with an operation id; poll
/// `/operation-progress/{operation_id}` for completion.
#[utoipa::path(
    post,
    path = "/{id}/copy-to/{target_id}",
    tag = COLLECTIONS_TAG,
    params(
        ("id" = Uuid, Path, description = "Source collection ID"),
        ("target_id" = Uuid, Path, description = "Target collection ID")
    ),
    responses(
        (status = 200, description = "Transfer started", body = OperationStarted),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn copy_collection<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    Path((source_id, target_id)): Path<(Uuid, Uuid)>,
) -> CollectionResult<Json<OperationStarted>> {
    let started = service.copy_collection(source_id, target_id).await?;
    Ok(Json(started))
}

/// Start moving an explicit set of companies between collections.
///
/// Moved companies leave the source collection. Returns immediately with an
/// operation id to poll.
#[utoipa::path(
    post,
    path = "/{id}/move-to/{target_id}",
    tag = COLLECTIONS_TAG,
    params(
        ("id" = Uuid, Path, description = "Source collection ID"),
        ("target_id" = Uuid, Path, description = "Target collection ID")
    ),
    request_body = AddCompaniesRequest,
    responses(
        (status = 200, description = "Transfer started", body = OperationStarted),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn move_companies<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    Path((source_id, target_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<AddCompaniesRequest>,
) -> CollectionResult<Json<OperationStarted>> {
    let started = service
        .move_companies(source_id, target_id, request.company_ids)
        .await?;
    Ok(Json(started))
}

/// Poll the progress of a transfer operation
#[utoipa::path(
    get,
    path = "/operation-progress/{operation_id}",
    tag = COLLECTIONS_TAG,
    params(
        ("operation_id" = Uuid, Path, description = "Operation ID returned by copy-to/move-to")
    ),
    responses(
        (status = 200, description = "Current progress", body = OperationProgress),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn operation_progress<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    UuidPath(operation_id): UuidPath,
) -> CollectionResult<Json<OperationProgress>> {
    let progress = service.operation_progress(operation_id).await?;
    Ok(Json(progress))
}

/// List one page of the company catalog with liked flags
#[utoipa::path(
    get,
    path = "",
    tag = COMPANIES_TAG,
    params(PageQuery),
    responses(
        (status = 200, description = "Company page", body = CompanyPage),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_companies<R: CollectionRepository + 'static>(
    State(service): State<Arc<CollectionService<R>>>,
    Query(page): Query<PageQuery>,
) -> CollectionResult<Json<CompanyPage>> {
    let companies = service.list_companies(page.offset, page.limit).await?;
    Ok(Json(companies))
}
