use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

use crate::{error::AppResult, models::TmdbMovieRecord};

/// TMDB rejects listing pages above this even when `total_pages` is larger.
pub const MAX_PAGE: u32 = 500;

pub struct TmdbClient {
    client: wreq::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: wreq::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no TMDB_API_KEY provided, TMDB fetches are skipped");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        Self { client, api_key, base_url, limiter: Arc::new(RateLimiter::direct(quota)) }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn popular_movies(&self, page: u32) -> AppResult<PopularPage> {
        self.limiter.until_ready().await;

        debug!(page = page, "fetching TMDB popular movies");
        let resp: PopularPage = self
            .client
            .get(self.url("/movie/popular"))
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .query(&[("page", page)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }

    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        self.limiter.until_ready().await;

        let resp: GenreListResponse = self
            .client
            .get(self.url("/genre/movie/list"))
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.genres)
    }
}

#[derive(Debug, Deserialize)]
pub struct PopularPage {
    pub page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<PopularMovie>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PopularMovie {
    pub id: i32,
    pub title: String,
    pub release_date: Option<String>,
    pub original_language: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
}

impl PopularMovie {
    pub fn to_record(&self) -> TmdbMovieRecord {
        TmdbMovieRecord {
            tmdb_id: self.id,
            title: self.title.clone(),
            release_date: non_empty(self.release_date.as_deref()),
            language_code: non_empty(self.original_language.as_deref()),
            vote_average: self.vote_average,
            genre_ids: self.genre_ids.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPULAR: &str = r#"{
        "page": 2,
        "results": [
            {
                "adult": false,
                "genre_ids": [28, 878],
                "id": 823464,
                "original_language": "en",
                "overview": "Two ancient titans clash.",
                "release_date": "2024-03-27",
                "title": "Godzilla x Kong: The New Empire",
                "vote_average": 7.2
            },
            {
                "genre_ids": [],
                "id": 1,
                "original_language": "",
                "release_date": "",
                "title": "Untitled"
            }
        ],
        "total_pages": 500,
        "total_results": 10000
    }"#;

    #[test]
    fn decodes_popular_page() {
        let page: PopularPage = serde_json::from_str(POPULAR).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 500);
        assert_eq!(page.results.len(), 2);

        let record = page.results[0].to_record();
        assert_eq!(record.tmdb_id, 823464);
        assert_eq!(record.release_date.as_deref(), Some("2024-03-27"));
        assert_eq!(record.language_code.as_deref(), Some("en"));
        assert_eq!(record.genre_ids, vec![28, 878]);
    }

    #[test]
    fn blank_fields_become_none() {
        let page: PopularPage = serde_json::from_str(POPULAR).unwrap();
        let record = page.results[1].to_record();
        assert_eq!(record.release_date, None);
        assert_eq!(record.language_code, None);
        assert_eq!(record.vote_average, None);
    }

    #[test]
    fn decodes_genre_list() {
        let resp: GenreListResponse =
            serde_json::from_str(r#"{"genres":[{"id":28,"name":"Action"},{"id":12,"name":"Adventure"}]}"#)
                .unwrap();
        assert_eq!(resp.genres.len(), 2);
        assert_eq!(resp.genres[1].name, "Adventure");
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            join_url("https://api.themoviedb.org/3/", "/movie/popular"),
            "https://api.themoviedb.org/3/movie/popular"
        );
        assert_eq!(join_url("http://localhost:9", "/genre/movie/list"), "http://localhost:9/genre/movie/list");
    }
}
