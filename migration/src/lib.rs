pub use sea_orm_migration::prelude::*;

mod m20241101_000001_create_tables;
mod m20241115_000001_add_imdb_rating;
mod m20241202_000001_create_box_office_and_progress;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241101_000001_create_tables::Migration),
            Box::new(m20241115_000001_add_imdb_rating::Migration),
            Box::new(m20241202_000001_create_box_office_and_progress::Migration),
        ]
    }
}
