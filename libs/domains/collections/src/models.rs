use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Name of the well-known collection whose membership drives the `liked`
/// flag on company listings. Seeded by migration.
pub const LIKED_COLLECTION_NAME: &str = "Liked";

/// Company entity - one row in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Company {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Collection entity - a named set of companies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Collection {
    /// Unique identifier
    pub id: Uuid,
    /// Collection name (unique)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Company row as rendered in listings, with its liked status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyWithLiked {
    pub id: Uuid,
    pub name: String,
    /// Whether the company is a member of the well-known "Liked" collection
    pub liked: bool,
}

/// One page of the company catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyPage {
    pub companies: Vec<CompanyWithLiked>,
    /// Total number of companies matching the query, across all pages
    pub total: u64,
}

/// One page of a collection's companies, plus the collection metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionPage {
    pub id: Uuid,
    pub name: String,
    pub companies: Vec<CompanyWithLiked>,
    /// Total member count of the collection, across all pages
    pub total: u64,
}

/// Query parameters for paginated listings
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PageQuery {
    /// The number of items to skip from the beginning
    #[serde(default)]
    pub offset: u64,
    /// The number of items to fetch
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
        }
    }
}

/// Request body naming an explicit set of companies
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddCompaniesRequest {
    #[validate(length(min = 1))]
    pub company_ids: Vec<Uuid>,
}

/// Which companies a transfer covers, fixed at operation start
#[derive(Debug, Clone)]
pub enum TransferScope {
    /// Every company currently in the source collection, snapshotted once
    AllMembers,
    /// An explicit, non-empty set of company ids
    Companies(Vec<Uuid>),
}

/// Whether transferred memberships stay in the source collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

/// Lifecycle state of a transfer operation
///
/// Transitions are one-directional: `InProgress` moves to exactly one of the
/// terminal states and never leaves it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationStatus {
    InProgress,
    Completed,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Error)
    }
}

/// One asynchronous transfer run, tracked independently of the request that
/// started it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Operation {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    /// Number of companies in scope, fixed at operation start
    pub total: u64,
    /// Companies considered so far; counts duplicates that produced no write
    pub processed: u64,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    /// Progress as a percentage in [0, 100].
    ///
    /// An empty scope is complete by definition.
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn progress_view(&self) -> OperationProgress {
        OperationProgress {
            progress: self.progress_percent(),
            status: self.status,
        }
    }
}

/// Response returned when a transfer is started
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationStarted {
    pub operation_id: Uuid,
}

/// Poll response for an in-flight or finished transfer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationProgress {
    /// Percentage in [0, 100]
    pub progress: f64,
    pub status: OperationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_empty_scope_is_complete() {
        let op = Operation {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            target_id: Uuid::new_v4(),
            total: 0,
            processed: 0,
            status: OperationStatus::Completed,
            created_at: Utc::now(),
        };
        assert_eq!(op.progress_percent(), 100.0);
    }

    #[test]
    fn test_progress_percent_partial() {
        let op = Operation {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            target_id: Uuid::new_v4(),
            total: 450,
            processed: 200,
            status: OperationStatus::InProgress,
            created_at: Utc::now(),
        };
        let progress = op.progress_percent();
        assert!((progress - 44.444).abs() < 0.01);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OperationStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(OperationStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_status_terminality() {
        assert!(!OperationStatus::InProgress.is_terminal());
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Error.is_terminal());
    }
}
