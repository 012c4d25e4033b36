use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub fetched_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
