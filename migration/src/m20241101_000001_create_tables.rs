use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::ImdbId).primary_key())
                    .col(string(Movies::Title))
                    .col(string(Movies::Year))
                    .col(string(Movies::Type))
                    .col(string_null(Movies::Poster))
                    .col(big_integer(Movies::FetchedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_year")
                    .table(Movies::Table)
                    .col(Movies::Year)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LanguagesTmdb::Table)
                    .if_not_exists()
                    .col(pk_auto(LanguagesTmdb::LanguageId))
                    .col(string_uniq(LanguagesTmdb::LanguageCode))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviesTmdb::Table)
                    .if_not_exists()
                    .col(integer(MoviesTmdb::TmdbId).primary_key())
                    .col(string(MoviesTmdb::Title))
                    .col(string_null(MoviesTmdb::ReleaseDate))
                    .col(integer_null(MoviesTmdb::LanguageId))
                    .col(double_null(MoviesTmdb::VoteAverage))
                    .col(big_integer(MoviesTmdb::FetchedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_tmdb_language")
                            .from(MoviesTmdb::Table, MoviesTmdb::LanguageId)
                            .to(LanguagesTmdb::Table, LanguagesTmdb::LanguageId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GenresTmdb::Table)
                    .if_not_exists()
                    .col(integer(GenresTmdb::GenreId).primary_key())
                    .col(string(GenresTmdb::GenreName))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenresTmdb::Table)
                    .if_not_exists()
                    .col(integer(MovieGenresTmdb::TmdbId))
                    .col(integer(MovieGenresTmdb::GenreId))
                    .primary_key(
                        Index::create().col(MovieGenresTmdb::TmdbId).col(MovieGenresTmdb::GenreId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genres_movie")
                            .from(MovieGenresTmdb::Table, MovieGenresTmdb::TmdbId)
                            .to(MoviesTmdb::Table, MoviesTmdb::TmdbId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genres_genre")
                            .from(MovieGenresTmdb::Table, MovieGenresTmdb::GenreId)
                            .to(GenresTmdb::Table, GenresTmdb::GenreId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieGenresTmdb::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(GenresTmdb::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MoviesTmdb::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LanguagesTmdb::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    ImdbId,
    Title,
    Year,
    Type,
    Poster,
    FetchedAt,
}

#[derive(DeriveIden)]
enum LanguagesTmdb {
    Table,
    LanguageId,
    LanguageCode,
}

#[derive(DeriveIden)]
enum MoviesTmdb {
    Table,
    TmdbId,
    Title,
    ReleaseDate,
    LanguageId,
    VoteAverage,
    FetchedAt,
}

#[derive(DeriveIden)]
enum GenresTmdb {
    Table,
    GenreId,
    GenreName,
}

#[derive(DeriveIden)]
enum MovieGenresTmdb {
    Table,
    TmdbId,
    GenreId,
}
