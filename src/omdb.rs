use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

use crate::{error::AppResult, models::OmdbMovieRecord};

pub const NOT_AVAILABLE: &str = "N/A";
pub const PAGE_SIZE: u32 = 10;

pub struct OmdbClient {
    client: wreq::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    pub fn new(client: wreq::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no OMDB_API_KEY provided, OMDb fetches are skipped");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        Self { client, api_key, base_url, limiter: Arc::new(RateLimiter::direct(quota)) }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn search(&self, term: &str, page: u32) -> AppResult<SearchPage> {
        debug!(term = %term, page = page, "searching OMDb");
        let resp: SearchResponse =
            self.get(&[("s", term), ("type", "movie"), ("page", &page.to_string())]).await?;
        Ok(resp.into_page())
    }

    pub async fn by_id(&self, imdb_id: &str) -> AppResult<Option<OmdbDetail>> {
        let resp: DetailResponse = self.get(&[("i", imdb_id)]).await?;
        Ok(resp.into_detail())
    }

    pub async fn by_title(&self, title: &str) -> AppResult<Option<OmdbDetail>> {
        debug!(title = %title, "looking up OMDb title");
        let resp: DetailResponse = self.get(&[("t", title)]).await?;
        Ok(resp.into_detail())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> AppResult<T> {
        self.limiter.until_ready().await;

        let body = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Default)]
pub struct SearchPage {
    pub items: Vec<SearchItem>,
    pub total_results: u32,
}

impl SearchPage {
    pub fn total_pages(&self) -> u32 {
        self.total_results.div_ceil(PAGE_SIZE)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchItem {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Poster")]
    pub poster: Option<String>,
}

impl SearchItem {
    pub fn to_record(&self, imdb_rating: Option<f64>) -> OmdbMovieRecord {
        OmdbMovieRecord {
            imdb_id: self.imdb_id.clone(),
            title: self.title.clone(),
            year: self.year.clone(),
            kind: self.kind.clone(),
            poster: available(self.poster.as_deref()).map(str::to_string),
            imdb_rating,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OmdbDetail {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Poster")]
    pub poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
}

impl OmdbDetail {
    pub fn rating(&self) -> Option<f64> {
        available(self.imdb_rating.as_deref()).and_then(|r| r.parse().ok())
    }

    pub fn runtime(&self) -> Option<&str> {
        available(self.runtime.as_deref())
    }

    pub fn director(&self) -> Option<&str> {
        available(self.director.as_deref())
    }

    pub fn to_record(&self) -> OmdbMovieRecord {
        OmdbMovieRecord {
            imdb_id: self.imdb_id.clone(),
            title: self.title.clone(),
            year: self.year.clone(),
            kind: self.kind.clone(),
            poster: available(self.poster.as_deref()).map(str::to_string),
            imdb_rating: self.rating(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Search", default)]
    search: Vec<SearchItem>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl SearchResponse {
    fn into_page(self) -> SearchPage {
        if self.response != "True" {
            debug!(error = ?self.error, "OMDb search returned no results");
            return SearchPage::default();
        }
        let total_results =
            self.total_results.and_then(|t| t.trim().parse().ok()).unwrap_or(0);
        SearchPage { items: self.search, total_results }
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(flatten)]
    detail: Option<OmdbDetail>,
}

impl DetailResponse {
    fn into_detail(self) -> Option<OmdbDetail> {
        if self.response != "True" {
            debug!(error = ?self.error, "OMDb lookup returned no match");
            return None;
        }
        self.detail
    }
}

fn available(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty() && *s != NOT_AVAILABLE)
}
