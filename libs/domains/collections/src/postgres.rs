use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    entity::{collection, company, membership},
    error::{CollectionError, CollectionResult},
    models::{Collection, Company},
    repository::CollectionRepository,
};

pub struct PgCollectionRepository {
    db: DatabaseConnection,
}

impl PgCollectionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn store_err(e: sea_orm::DbErr) -> CollectionError {
        CollectionError::Store(format!("Database error: {}", e))
    }
}

#[async_trait]
impl CollectionRepository for PgCollectionRepository {
    async fn list_collections(&self) -> CollectionResult<Vec<Collection>> {
        let models = collection::Entity::find()
            .order_by_asc(collection::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    async fn get_collection(&self, id: Uuid) -> CollectionResult<Option<Collection>> {
        let model = collection::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok(model.map(|m| m.into()))
    }

    async fn find_collection_by_name(&self, name: &str) -> CollectionResult<Option<Collection>> {
        let model = collection::Entity::find()
            .filter(collection::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok(model.map(|m| m.into()))
    }

    async fn list_companies(
        &self,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<(Vec<Company>, u64)> {
        let query = company::Entity::find();

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(Self::store_err)?;

        let models = query
            .order_by_asc(company::Column::CreatedAt)
            .order_by_asc(company::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok((models.into_iter().map(|m| m.into()).collect(), total))
    }

    async fn list_companies_in(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<(Vec<Company>, u64)> {
        let query = company::Entity::find()
            .join(JoinType::InnerJoin, company::Relation::Membership.def())
            .filter(membership::Column::CollectionId.eq(collection_id));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(Self::store_err)?;

        let models = query
            .order_by_asc(membership::Column::CreatedAt)
            .order_by_asc(membership::Column::CompanyId)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok((models.into_iter().map(|m| m.into()).collect(), total))
    }

    async fn count_members(&self, collection_id: Uuid) -> CollectionResult<u64> {
        membership::Entity::find()
            .filter(membership::Column::CollectionId.eq(collection_id))
            .count(&self.db)
            .await
            .map_err(Self::store_err)
    }

    async fn list_members(
        &self,
        collection_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<Vec<Uuid>> {
        membership::Entity::find()
            .filter(membership::Column::CollectionId.eq(collection_id))
            .order_by_asc(membership::Column::CreatedAt)
            .order_by_asc(membership::Column::CompanyId)
            .offset(offset)
            .limit(limit)
            .select_only()
            .column(membership::Column::CompanyId)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(Self::store_err)
    }

    async fn list_members_among(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<HashSet<Uuid>> {
        if company_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<Uuid> = membership::Entity::find()
            .filter(membership::Column::CollectionId.eq(collection_id))
            .filter(membership::Column::CompanyId.is_in(company_ids.iter().copied()))
            .select_only()
            .column(membership::Column::CompanyId)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok(ids.into_iter().collect())
    }

    async fn add_members(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<()> {
        if company_ids.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let rows = company_ids.iter().map(|company_id| membership::ActiveModel {
            collection_id: Set(collection_id),
            company_id: Set(*company_id),
            created_at: Set(now.into()),
        });

        // The composite primary key enforces the uniqueness invariant;
        // conflicting rows are dropped instead of failing the batch.
        membership::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    membership::Column::CollectionId,
                    membership::Column::CompanyId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await
            .map_err(Self::store_err)?;

        tracing::debug!(
            %collection_id,
            count = company_ids.len(),
            "Bulk-inserted memberships"
        );
        Ok(())
    }

    async fn remove_members(
        &self,
        collection_id: Uuid,
        company_ids: &[Uuid],
    ) -> CollectionResult<u64> {
        if company_ids.is_empty() {
            return Ok(0);
        }

        let result = membership::Entity::delete_many()
            .filter(membership::Column::CollectionId.eq(collection_id))
            .filter(membership::Column::CompanyId.is_in(company_ids.iter().copied()))
            .exec(&self.db)
            .await
            .map_err(Self::store_err)?;

        Ok(result.rows_affected)
    }
}
