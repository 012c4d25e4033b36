use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "languages_tmdb")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub language_id: i32,
    #[sea_orm(unique)]
    pub language_code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tmdb_movie::Entity")]
    TmdbMovie,
}

impl Related<super::tmdb_movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TmdbMovie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
