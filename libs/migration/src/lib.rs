pub use sea_orm_migration::prelude::*;

mod m20250301_000000_create_companies;
mod m20250301_000001_create_collections;
mod m20250301_000002_seed_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000000_create_companies::Migration),
            Box::new(m20250301_000001_create_collections::Migration),
            Box::new(m20250301_000002_seed_catalog::Migration),
        ]
    }
}
