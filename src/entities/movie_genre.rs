use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie_genres_tmdb")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tmdb_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub genre_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tmdb_movie::Entity",
        from = "Column::TmdbId",
        to = "super::tmdb_movie::Column::TmdbId"
    )]
    TmdbMovie,
    #[sea_orm(
        belongs_to = "super::genre::Entity",
        from = "Column::GenreId",
        to = "super::genre::Column::GenreId"
    )]
    Genre,
}

impl Related<super::tmdb_movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TmdbMovie.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Genre.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
