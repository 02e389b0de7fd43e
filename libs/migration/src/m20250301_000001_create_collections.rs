use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Collections::Table)
                    .if_not_exists()
                    .col(pk_uuid(Collections::Id))
                    .col(string_uniq(Collections::Name))
                    .col(
                        timestamp_with_time_zone(Collections::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Membership rows: the composite primary key is what makes bulk
        // inserts idempotent; a (collection, company) pair can exist once.
        manager
            .create_table(
                Table::create()
                    .table(CollectionMemberships::Table)
                    .if_not_exists()
                    .col(uuid(CollectionMemberships::CollectionId))
                    .col(uuid(CollectionMemberships::CompanyId))
                    .col(
                        timestamp_with_time_zone(CollectionMemberships::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(CollectionMemberships::CollectionId)
                            .col(CollectionMemberships::CompanyId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_collection_id")
                            .from(
                                CollectionMemberships::Table,
                                CollectionMemberships::CollectionId,
                            )
                            .to(Collections::Table, Collections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_company_id")
                            .from(
                                CollectionMemberships::Table,
                                CollectionMemberships::CompanyId,
                            )
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Paginated member reads order by (created_at, company_id); index
        // matches that access path.
        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_collection_created_at")
                    .table(CollectionMemberships::Table)
                    .col(CollectionMemberships::CollectionId)
                    .col(CollectionMemberships::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_company_id")
                    .table(CollectionMemberships::Table)
                    .col(CollectionMemberships::CompanyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(CollectionMemberships::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Collections::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Collections {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CollectionMemberships {
    Table,
    CollectionId,
    CompanyId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
}
