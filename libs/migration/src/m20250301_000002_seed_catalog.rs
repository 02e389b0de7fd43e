use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The two well-known collections exist by convention; everything else
        // is user-created at runtime.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO collections (id, name, created_at)
            VALUES
                ('01950b3c-7c5f-7000-8000-000000000001', 'My List', NOW()),
                ('01950b3c-7c5f-7001-8000-000000000002', 'Liked', NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
            )
            .await?;

        // Sample companies for local development
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO companies (id, name, created_at)
            VALUES
                ('01950b3c-7c5f-7002-8000-000000000003', 'Acme Analytics', NOW()),
                ('01950b3c-7c5f-7003-8000-000000000004', 'Borealis Biotech', NOW()),
                ('01950b3c-7c5f-7004-8000-000000000005', 'Cobalt Computing', NOW()),
                ('01950b3c-7c5f-7005-8000-000000000006', 'Drift Dynamics', NOW()),
                ('01950b3c-7c5f-7006-8000-000000000007', 'Ember Energy', NOW()),
                ('01950b3c-7c5f-7007-8000-000000000008', 'Foxglove Freight', NOW()),
                ('01950b3c-7c5f-7008-8000-000000000009', 'Granite Grid', NOW()),
                ('01950b3c-7c5f-7009-8000-00000000000a', 'Helix Health', NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
            )
            .await?;

        // Everything starts in "My List"
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO collection_memberships (collection_id, company_id, created_at)
            SELECT '01950b3c-7c5f-7000-8000-000000000001', id, NOW()
            FROM companies
            ON CONFLICT (collection_id, company_id) DO NOTHING
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            DELETE FROM collection_memberships
            WHERE collection_id IN (
                '01950b3c-7c5f-7000-8000-000000000001',
                '01950b3c-7c5f-7001-8000-000000000002'
            )
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
            DELETE FROM collections
            WHERE id IN (
                '01950b3c-7c5f-7000-8000-000000000001',
                '01950b3c-7c5f-7001-8000-000000000002'
            )
            "#,
            )
            .await?;

        Ok(())
    }
}
