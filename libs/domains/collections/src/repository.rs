use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CollectionResult;
use crate::models::{Collection, Company};

/// Repository trait over the catalog and its membership relation.
///
/// The membership operations are the contract the transfer engine runs
/// against: `list_members` must return a stable ordering across calls so a
/// paginated scan within one operation never skips or repeats rows, and
/// `add_members` must silently skip rows that already exist rather than
/// failing the whole batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// List all collections
    async fn list_collections(&self) -> CollectionResult<Vec<Collection>>;

    /// Get a collection by ID
    async fn get_collection(&self, id: Uuid) -> CollectionResult<Option<Collection>>;

    /// Find a collection by its unique name
    async fn find_collection_by_name(&self, name: &str) -> CollectionResult<Option<Collection>>;

    /// One page of the company catalog, with the total count
    async fn list_companies(&self, offset: u64, limit: u64)
        -> CollectionResult<(Vec<Company>, u64)>;

    /// One page of a collection's companies, with the total member count
    async fn list_companies_in(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<(Vec<Company>, u64)>;

    /// Number of members in a collection
    async fn count_members(&self, collection_id: Uuid) -> CollectionResult<u64>;

    /// Member company ids in stable (created_at, company_id) order
    async fn list_members(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<Vec<Uuid>>;

    /// Which of the given companies are already members, in one lookup for
    /// the whole batch
    async fn list_members_among(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<HashSet<Uuid>>;

    /// Bulk-insert memberships; rows violating the uniqueness invariant are
    /// skipped, never an error
    async fn add_members(&self, collection_id: Uuid, company_ids: &[Uuid])
        -> CollectionResult<()>;

    /// Bulk-remove memberships, returning the number of rows deleted
    async fn remove_members(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<u64>;
}

#[derive(Default)]
struct Inner {
    companies: HashMap<Uuid, Company>,
    company_order: Vec<Uuid>,
    collections: HashMap<Uuid, Collection>,
    /// collection id -> member company ids in insertion order
    members: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory implementation of CollectionRepository (for development/testing)
///
/// A single lock over the whole store keeps every operation a consistent
/// snapshot, mirroring what a transactional database gives the Postgres
/// implementation.
#[derive(Default, Clone)]
pub struct InMemoryCollectionRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, name: &str) -> Company {
        let company = Company {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.company_order.push(company.id);
        inner.companies.insert(company.id, company.clone());
        company
    }

    pub async fn insert_collection(&self, name: &str) -> Collection {
        let collection = Collection {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.collections.insert(collection.id, collection.clone());
        collection
    }
}

#[async_trait]
impl CollectionRepository for InMemoryCollectionRepository {
    async fn list_collections(&self) -> CollectionResult<Vec<Collection>> {
        let inner = self.inner.read().await;
        let mut collections: Vec<Collection> = inner.collections.values().cloned().collect();
        collections.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(collections)
    }

    async fn get_collection(&self, id: Uuid) -> CollectionResult<Option<Collection>> {
        let inner = self.inner.read().await;
        Ok(inner.collections.get(&id).cloned())
    }

    async fn find_collection_by_name(&self, name: &str) -> CollectionResult<Option<Collection>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list_companies(
        &self,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<(Vec<Company>, u64)> {
        let inner = self.inner.read().await;
        let total = inner.company_order.len() as u64;
        let companies = inner
            .company_order
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|id| inner.companies.get(id).cloned())
            .collect();
        Ok((companies, total))
    }

    async fn list_companies_in(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<(Vec<Company>, u64)> {
        let inner = self.inner.read().await;
        let members = inner.members.get(&collection_id);
        let total = members.map(|m| m.len()).unwrap_or(0) as u64;
        let companies = members
            .map(|m| {
                m.iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .filter_map(|id| inner.companies.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok((companies, total))
    }

    async fn count_members(&self, collection_id: Uuid) -> CollectionResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .members
            .get(&collection_id)
            .map(|m| m.len())
            .unwrap_or(0) as u64)
    }

    async fn list_members(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .members
            .get(&collection_id)
            .map(|m| {
                m.iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_members_among(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<HashSet<Uuid>> {
        let inner = self.inner.read().await;
        let members: HashSet<Uuid> = inner
            .members
            .get(&collection_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        Ok(company_ids
            .iter()
            .copied()
            .filter(|id| members.contains(id))
            .collect())
    }

    async fn add_members(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<()> {
        let mut inner = self.inner.write().await;
        let members = inner.members.entry(collection_id).or_default();
        for id in company_ids {
            // uniqueness invariant: at most one membership per pair
            if !members.contains(id) {
                members.push(*id);
            }
        }
        Ok(())
    }

    async fn remove_members(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<u64> {
        let to_remove: HashSet<Uuid> = company_ids.iter().copied().collect();
        let mut inner = self.inner.write().await;
        let Some(members) = inner.members.get_mut(&collection_id) else {
            return Ok(0);
        };
        let before = members.len();
        members.retain(|id| !to_remove.contains(id));
        Ok((before - members.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_repo(company_count: usize) -> (InMemoryCollectionRepository, Collection, Vec<Uuid>) {
        let repo = InMemoryCollectionRepository::new();
        let collection = repo.insert_collection("test-collection").await;
        let mut ids = Vec::new();
        for i in 0..company_count {
            ids.push(repo.insert_company(&format!("company-{}", i)).await.id);
        }
        repo.add_members(collection.id, &ids).await.unwrap();
        (repo, collection, ids)
    }

    #[tokio::test]
    async fn test_add_members_skips_duplicates() {
        let (repo, collection, ids) = seeded_repo(3).await;

        // Re-adding the same ids must not create duplicate rows
        repo.add_members(collection.id, &ids).await.unwrap();

        assert_eq!(repo.count_members(collection.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_members_is_stable_and_paginated() {
        let (repo, collection, ids) = seeded_repo(5).await;

        let first = repo.list_members(collection.id, 0, 2).await.unwrap();
        let second = repo.list_members(collection.id, 2, 2).await.unwrap();
        let third = repo.list_members(collection.id, 4, 2).await.unwrap();

        let scanned: Vec<Uuid> = first.into_iter().chain(second).chain(third).collect();
        assert_eq!(scanned, ids);
    }

    #[tokio::test]
    async fn test_list_members_among_returns_intersection() {
        let (repo, collection, ids) = seeded_repo(4).await;
        let stranger = Uuid::now_v7();

        let probe = vec![ids[0], stranger, ids[3]];
        let found = repo
            .list_members_among(collection.id, &probe)
            .await
            .unwrap();

        assert_eq!(found, [ids[0], ids[3]].into_iter().collect());
    }

    #[tokio::test]
    async fn test_remove_members_reports_deleted_count() {
        let (repo, collection, ids) = seeded_repo(4).await;
        let stranger = Uuid::now_v7();

        let removed = repo
            .remove_members(collection.id, &[ids[1], stranger])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(repo.count_members(collection.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_companies_in_respects_membership_order() {
        let (repo, collection, ids) = seeded_repo(3).await;

        let (companies, total) = repo
            .list_companies_in(collection.id, 0, 10)
            .await
            .unwrap();

        assert_eq!(total, 3);
        let listed: Vec<Uuid> = companies.iter().map(|c| c.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_find_collection_by_name() {
        let repo = InMemoryCollectionRepository::new();
        let liked = repo.insert_collection("Liked").await;

        let found = repo.find_collection_by_name("Liked").await.unwrap();
        assert_eq!(found.unwrap().id, liked.id);

        assert!(repo
            .find_collection_by_name("Missing")
            .await
            .unwrap()
            .is_none());
    }
}
