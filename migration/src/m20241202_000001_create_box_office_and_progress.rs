use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BoxOffice::Table)
                    .if_not_exists()
                    .col(pk_auto(BoxOffice::Id))
                    .col(integer(BoxOffice::Year))
                    .col(integer(BoxOffice::Rank))
                    .col(string(BoxOffice::Title))
                    .col(big_integer(BoxOffice::WorldwideGross))
                    .col(big_integer_null(BoxOffice::DomesticGross))
                    .col(big_integer_null(BoxOffice::ForeignGross))
                    .col(big_integer(BoxOffice::FetchedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_box_office_year_title")
                    .table(BoxOffice::Table)
                    .col(BoxOffice::Year)
                    .col(BoxOffice::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FetchProgress::Table)
                    .if_not_exists()
                    .col(string(FetchProgress::Source))
                    .col(string(FetchProgress::Query))
                    .col(integer(FetchProgress::LastPage))
                    .col(integer_null(FetchProgress::TotalPages))
                    .col(big_integer(FetchProgress::UpdatedAt))
                    .primary_key(Index::create().col(FetchProgress::Source).col(FetchProgress::Query))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FetchProgress::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(BoxOffice::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum BoxOffice {
    Table,
    Id,
    Year,
    Rank,
    Title,
    WorldwideGross,
    DomesticGross,
    ForeignGross,
    FetchedAt,
}

#[derive(DeriveIden)]
enum FetchProgress {
    Table,
    Source,
    Query,
    LastPage,
    TotalPages,
    UpdatedAt,
}
