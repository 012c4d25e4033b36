use std::{
    collections::BTreeMap,
    fmt::Write as _,
    path::{Path, PathBuf},
};

use futures::{StreamExt, stream};
use tracing::{info, warn};

use crate::{
    error::AppResult,
    genres,
    omdb::{NOT_AVAILABLE, OmdbClient, OmdbDetail},
    tmdb::{PopularMovie, TmdbClient},
};

pub const DETAILS_FILE: &str = "movies_with_details.txt";

#[derive(Clone, Debug, PartialEq)]
pub struct MovieDetails {
    pub title: String,
    pub genres: String,
    pub release_date: String,
    pub overview: String,
    pub imdb_rating: String,
    pub runtime: String,
    pub director: String,
}

impl MovieDetails {
    pub fn new(
        movie: &PopularMovie,
        genre_names: &BTreeMap<i32, String>,
        omdb: Option<&OmdbDetail>,
    ) -> Self {
        let genres = movie
            .genre_ids
            .iter()
            .map(|id| genres::name_in(genre_names, *id))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            title: movie.title.clone(),
            genres,
            release_date: movie
                .release_date
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            overview: movie.overview.clone().unwrap_or_default(),
            imdb_rating: omdb
                .and_then(|d| d.rating())
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            runtime: omdb.and_then(|d| d.runtime()).unwrap_or(NOT_AVAILABLE).to_string(),
            director: omdb.and_then(|d| d.director()).unwrap_or(NOT_AVAILABLE).to_string(),
        }
    }
}

/// Popular TMDB movies (first page) joined with OMDb details looked up by title.
pub async fn collect(
    tmdb: &TmdbClient,
    omdb: &OmdbClient,
    max_concurrent: usize,
) -> AppResult<Vec<MovieDetails>> {
    if !tmdb.is_configured() {
        return Err(anyhow::anyhow!("TMDB_API_KEY is required for movie details").into());
    }

    let popular = tmdb.popular_movies(1).await?;
    let from_api = match tmdb.genres().await {
        Ok(list) => list.into_iter().map(|g| (g.id, g.name)).collect(),
        Err(err) => {
            warn!(error = %err, "failed to fetch TMDB genres, using builtin table");
            Vec::new()
        },
    };
    let genre_names = genres::resolve(&from_api);

    let lookups = popular.results.into_iter().map(|movie| async move {
        let detail = if omdb.is_configured() {
            match omdb.by_title(&movie.title).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(title = %movie.title, error = %err, "failed OMDb title lookup");
                    None
                },
            }
        } else {
            None
        };
        (movie, detail)
    });

    // `buffered` keeps the TMDB popularity order.
    let joined: Vec<_> =
        stream::iter(lookups).buffered(max_concurrent.max(1)).collect().await;

    Ok(joined
        .iter()
        .map(|(movie, detail)| MovieDetails::new(movie, &genre_names, detail.as_ref()))
        .collect())
}

pub fn render(movies: &[MovieDetails]) -> String {
    let mut out = String::new();
    for m in movies {
        let _ = writeln!(out, "Title: {}", m.title);
        let _ = writeln!(out, "Genre: {}", m.genres);
        let _ = writeln!(out, "Release Date: {}", m.release_date);
        let _ = writeln!(out, "Overview: {}", m.overview);
        let _ = writeln!(out, "IMDB Rating: {}", m.imdb_rating);
        let _ = writeln!(out, "Runtime: {}", m.runtime);
        let _ = writeln!(out, "Director: {}", m.director);
        let _ = writeln!(out, "{}", "-".repeat(40));
    }
    out
}

pub fn save(dir: &Path, text: &str) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(DETAILS_FILE);
    std::fs::write(&path, text)?;
    info!(path = %path.display(), "saved movie details");
    Ok(path)
}
