use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Company catalog with named collections and asynchronous bulk collection transfers"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/collections", api = domain_collections::handlers::CollectionsApiDoc),
        (path = "/companies", api = domain_collections::handlers::CompaniesApiDoc)
    )
)]
pub struct ApiDoc;
