use std::collections::{BTreeMap, HashSet};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
    sea_query::OnConflict,
};
use tracing::debug;

use crate::{
    entities::{box_office, fetch_progress, genre, language, movie_genre, omdb_movie, tmdb_movie},
    error::AppResult,
    genres,
    models::{
        CountRow, LeaderboardEntry, OmdbMovieRecord, Progress, Source, TableCounts,
        TmdbMovieRecord,
    },
    years,
};

const LANGUAGE_COUNTS_SQL: &str = "
    SELECT l.language_code AS label, COUNT(m.tmdb_id) AS count
    FROM movies_tmdb m
    JOIN languages_tmdb l ON m.language_id = l.language_id
    GROUP BY l.language_code
    ORDER BY count DESC, label ASC";

const GENRE_COUNTS_SQL: &str = "
    SELECT g.genre_name AS label, COUNT(mg.tmdb_id) AS count
    FROM movie_genres_tmdb mg
    JOIN genres_tmdb g ON mg.genre_id = g.genre_id
    GROUP BY g.genre_id
    ORDER BY count DESC, label ASC, g.genre_id ASC";

const YEAR_COUNTS_SQL: &str = "
    SELECT year AS label, COUNT(*) AS count
    FROM movies
    GROUP BY year
    ORDER BY year";

#[derive(Debug, FromQueryResult)]
struct LabelCount {
    label: String,
    count: i64,
}

/// Append-only access to the movie database. Every write is an insert-or-ignore
/// keyed by the row's natural identifier.
#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn insert_omdb_movie(&self, record: &OmdbMovieRecord) -> AppResult<bool> {
        Ok(insert_omdb(&self.db, record, now_sec()).await? > 0)
    }

    /// Stores one OMDb search page and advances the progress marker in the same
    /// transaction, so a crash never leaves the marker ahead of the rows.
    pub async fn save_omdb_page(
        &self,
        query: &str,
        page: u32,
        total_pages: u32,
        records: &[OmdbMovieRecord],
    ) -> AppResult<u64> {
        let now = now_sec();
        let txn = self.db.begin().await?;

        let mut inserted = 0;
        for record in records {
            inserted += insert_omdb(&txn, record, now).await?;
        }
        save_progress(&txn, Source::OmdbSearch, query, page, total_pages, now).await?;

        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn known_imdb_ids(&self, ids: &[String]) -> AppResult<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = omdb_movie::Entity::find()
            .filter(omdb_movie::Column::ImdbId.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|m| m.imdb_id).collect())
    }

    pub async fn upsert_genres(&self, names: &BTreeMap<i32, String>) -> AppResult<u64> {
        let txn = self.db.begin().await?;
        let mut inserted = 0;
        for (id, name) in names {
            inserted += insert_genre(&txn, *id, name).await?;
        }
        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn language_id(&self, code: &str) -> AppResult<i32> {
        language_id(&self.db, code).await
    }

    /// Stores one TMDB popular page (languages, movies, genres, associations) and
    /// its progress marker atomically.
    pub async fn save_tmdb_page(
        &self,
        page: u32,
        total_pages: u32,
        movies: &[TmdbMovieRecord],
        genre_names: &BTreeMap<i32, String>,
    ) -> AppResult<u64> {
        let now = now_sec();
        let txn = self.db.begin().await?;

        let mut inserted = 0;
        for movie in movies {
            let language = match movie.language_code.as_deref() {
                Some(code) => Some(language_id(&txn, code).await?),
                None => None,
            };

            let model = tmdb_movie::ActiveModel {
                tmdb_id: Set(movie.tmdb_id),
                title: Set(movie.title.clone()),
                release_date: Set(movie.release_date.clone()),
                language_id: Set(language),
                vote_average: Set(movie.vote_average),
                fetched_at: Set(now),
            };
            inserted += tmdb_movie::Entity::insert(model)
                .on_conflict(OnConflict::column(tmdb_movie::Column::TmdbId).do_nothing().to_owned())
                .exec_without_returning(&txn)
                .await?;

            for genre_id in &movie.genre_ids {
                insert_genre(&txn, *genre_id, &genres::name_in(genre_names, *genre_id)).await?;

                let link = movie_genre::ActiveModel {
                    tmdb_id: Set(movie.tmdb_id),
                    genre_id: Set(*genre_id),
                };
                movie_genre::Entity::insert(link)
                    .on_conflict(
                        OnConflict::columns([
                            movie_genre::Column::TmdbId,
                            movie_genre::Column::GenreId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await?;
            }
        }
        save_progress(&txn, Source::TmdbPopular, "", page, total_pages, now).await?;

        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn insert_leaderboard(
        &self,
        year: i16,
        entries: &[LeaderboardEntry],
    ) -> AppResult<u64> {
        let now = now_sec();
        let txn = self.db.begin().await?;

        let mut inserted = 0;
        for entry in entries {
            let model = box_office::ActiveModel {
                id: Default::default(),
                year: Set(year as i32),
                rank: Set(entry.rank),
                title: Set(entry.title.clone()),
                worldwide_gross: Set(entry.worldwide_gross),
                domestic_gross: Set(entry.domestic_gross),
                foreign_gross: Set(entry.foreign_gross),
                fetched_at: Set(now),
            };
            inserted += box_office::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([box_office::Column::Year, box_office::Column::Title])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn progress(&self, source: Source, query: &str) -> AppResult<Progress> {
        let row = fetch_progress::Entity::find_by_id((source.as_str().to_string(), query.to_string()))
            .one(&self.db)
            .await?;

        Ok(match row {
            Some(row) => Progress {
                last_page: row.last_page.max(0) as u32,
                total_pages: row.total_pages.map(|t| t.max(0) as u32),
            },
            None => Progress { last_page: 0, total_pages: None },
        })
    }

    /// Stored TMDB movies with an id above `after`, lowest id first.
    pub async fn tmdb_titles_after(
        &self,
        after: i32,
        limit: u64,
    ) -> AppResult<Vec<(i32, String)>> {
        let rows = tmdb_movie::Entity::find()
            .filter(tmdb_movie::Column::TmdbId.gt(after))
            .order_by_asc(tmdb_movie::Column::TmdbId)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|m| (m.tmdb_id, m.title)).collect())
    }

    /// Highest `tmdb_id` whose title has been looked up on OMDb, 0 when none.
    pub async fn enriched_through(&self) -> AppResult<i32> {
        let row = fetch_progress::Entity::find_by_id((
            Source::OmdbEnrich.as_str().to_string(),
            String::new(),
        ))
        .one(&self.db)
        .await?;
        Ok(row.map(|r| r.last_page.max(0)).unwrap_or(0))
    }

    pub async fn mark_enriched_through(&self, tmdb_id: i32) -> AppResult<()> {
        let model = fetch_progress::ActiveModel {
            source: Set(Source::OmdbEnrich.as_str().to_string()),
            query: Set(String::new()),
            last_page: Set(tmdb_id),
            total_pages: Set(None),
            updated_at: Set(now_sec()),
        };
        upsert_progress(&self.db, model).await
    }

    pub async fn table_counts(&self) -> AppResult<TableCounts> {
        Ok(TableCounts {
            omdb_movies: omdb_movie::Entity::find().count(&self.db).await?,
            tmdb_movies: tmdb_movie::Entity::find().count(&self.db).await?,
            languages: language::Entity::find().count(&self.db).await?,
            genres: genre::Entity::find().count(&self.db).await?,
            movie_genres: movie_genre::Entity::find().count(&self.db).await?,
            box_office: box_office::Entity::find().count(&self.db).await?,
        })
    }

    /// OMDb titles per start year. Ranges such as `1950–1955` count towards 1950.
    pub async fn omdb_movies_per_year(&self) -> AppResult<Vec<CountRow>> {
        let rows = self.label_counts(YEAR_COUNTS_SQL).await?;

        let mut per_year: BTreeMap<i16, u64> = BTreeMap::new();
        let mut unparsed = 0u64;
        for row in rows {
            match years::parse_start_year(&row.label) {
                Some(year) => *per_year.entry(year).or_default() += row.count.max(0) as u64,
                None => unparsed += row.count.max(0) as u64,
            }
        }
        if unparsed > 0 {
            debug!(unparsed = unparsed, "skipped OMDb rows with unreadable year");
        }

        Ok(per_year
            .into_iter()
            .map(|(year, count)| CountRow { label: year.to_string(), count })
            .collect())
    }

    pub async fn tmdb_movies_per_language(&self) -> AppResult<Vec<CountRow>> {
        Ok(self.label_counts(LANGUAGE_COUNTS_SQL).await?.into_iter().map(to_count_row).collect())
    }

    pub async fn tmdb_movies_per_genre(&self) -> AppResult<Vec<CountRow>> {
        Ok(self.label_counts(GENRE_COUNTS_SQL).await?.into_iter().map(to_count_row).collect())
    }

    pub async fn omdb_ratings(&self) -> AppResult<Vec<f64>> {
        let rows = omdb_movie::Entity::find()
            .filter(omdb_movie::Column::ImdbRating.is_not_null())
            .order_by_asc(omdb_movie::Column::ImdbId)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|m| m.imdb_rating).collect())
    }

    pub async fn tmdb_releases_per_year(&self) -> AppResult<Vec<CountRow>> {
        let rows = tmdb_movie::Entity::find()
            .filter(tmdb_movie::Column::ReleaseDate.is_not_null())
            .all(&self.db)
            .await?;

        let mut per_year: BTreeMap<i16, u64> = BTreeMap::new();
        for row in rows {
            let Some(date) = row.release_date.and_then(|d| d.parse::<jiff::civil::Date>().ok())
            else {
                continue;
            };
            *per_year.entry(date.year()).or_default() += 1;
        }

        Ok(per_year
            .into_iter()
            .map(|(year, count)| CountRow { label: year.to_string(), count })
            .collect())
    }

    pub async fn leaderboard(&self, year: i16, limit: u64) -> AppResult<Vec<box_office::Model>> {
        Ok(box_office::Entity::find()
            .filter(box_office::Column::Year.eq(year as i32))
            .order_by_asc(box_office::Column::Rank)
            .order_by_asc(box_office::Column::Title)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    async fn label_counts(&self, sql: &str) -> AppResult<Vec<LabelCount>> {
        let stmt = Statement::from_string(self.db.get_database_backend(), sql.to_string());
        Ok(LabelCount::find_by_statement(stmt).all(&self.db).await?)
    }
}

async fn insert_omdb<C: ConnectionTrait>(
    db: &C,
    record: &OmdbMovieRecord,
    now: i64,
) -> AppResult<u64> {
    let model = omdb_movie::ActiveModel {
        imdb_id: Set(record.imdb_id.clone()),
        title: Set(record.title.clone()),
        year: Set(record.year.clone()),
        kind: Set(record.kind.clone()),
        poster: Set(record.poster.clone()),
        imdb_rating: Set(record.imdb_rating),
        fetched_at: Set(now),
    };

    Ok(omdb_movie::Entity::insert(model)
        .on_conflict(OnConflict::column(omdb_movie::Column::ImdbId).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?)
}

async fn insert_genre<C: ConnectionTrait>(db: &C, id: i32, name: &str) -> AppResult<u64> {
    let model = genre::ActiveModel { genre_id: Set(id), genre_name: Set(name.to_string()) };
    Ok(genre::Entity::insert(model)
        .on_conflict(OnConflict::column(genre::Column::GenreId).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?)
}

async fn language_id<C: ConnectionTrait>(db: &C, code: &str) -> AppResult<i32> {
    let model = language::ActiveModel {
        language_id: Default::default(),
        language_code: Set(code.to_string()),
    };
    language::Entity::insert(model)
        .on_conflict(OnConflict::column(language::Column::LanguageCode).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    let row = language::Entity::find()
        .filter(language::Column::LanguageCode.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("language {code} missing after insert"))?;
    Ok(row.language_id)
}

async fn save_progress<C: ConnectionTrait>(
    db: &C,
    source: Source,
    query: &str,
    page: u32,
    total_pages: u32,
    now: i64,
) -> AppResult<()> {
    let model = fetch_progress::ActiveModel {
        source: Set(source.as_str().to_string()),
        query: Set(query.to_string()),
        last_page: Set(page as i32),
        total_pages: Set(Some(total_pages as i32)),
        updated_at: Set(now),
    };
    upsert_progress(db, model).await
}

async fn upsert_progress<C: ConnectionTrait>(
    db: &C,
    model: fetch_progress::ActiveModel,
) -> AppResult<()> {
    fetch_progress::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([fetch_progress::Column::Source, fetch_progress::Column::Query])
                .update_columns([
                    fetch_progress::Column::LastPage,
                    fetch_progress::Column::TotalPages,
                    fetch_progress::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

fn to_count_row(row: LabelCount) -> CountRow {
    CountRow { label: row.label, count: row.count.max(0) as u64 }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
