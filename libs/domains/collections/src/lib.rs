//! Collections Domain
//!
//! Company catalog organized into named collections, with an asynchronous
//! bulk transfer engine for moving memberships between collections.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌──────────────┐
//! │   Service   │────▶│   Transfer    │  ← background batch engine
//! └──────┬──────┘     │    Engine     │
//!        │            └──────┬───────┘
//!        │          progress │
//!        │            ┌──────▼───────┐
//!        │            │  Operation   │  ← poll-able progress table
//!        │            │  Registry    │
//!        │            └──────────────┘
//! ┌──────▼──────┐
//! │ Repository  │  ← data access (trait + implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← entities, DTOs, enums
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_collections::{
//!     handlers,
//!     repository::InMemoryCollectionRepository,
//!     service::CollectionService,
//! };
//!
//! // Create repository and service
//! let repository = InMemoryCollectionRepository::new();
//! let service = Arc::new(CollectionService::new(repository));
//!
//! // Create Axum routers
//! let collections = handlers::collections_router(service.clone());
//! let companies = handlers::companies_router(service);
//! ```

pub mod dedup;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod registry;
pub mod repository;
pub mod service;
pub mod transfer;

// Re-export commonly used types
pub use error::{CollectionError, CollectionResult};
pub use models::{
    AddCompaniesRequest, Collection, CollectionPage, Company, CompanyPage, CompanyWithLiked,
    Operation, OperationProgress, OperationStarted, OperationStatus, PageQuery, TransferMode,
    TransferScope, LIKED_COLLECTION_NAME,
};
pub use postgres::PgCollectionRepository;
pub use registry::OperationRegistry;
pub use repository::{CollectionRepository, InMemoryCollectionRepository};
pub use service::CollectionService;
pub use transfer::{TransferConfig, TransferEngine};
