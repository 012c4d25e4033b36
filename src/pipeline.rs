use std::collections::BTreeMap;

use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    genres,
    models::{OmdbMovieRecord, Source},
    omdb::{OmdbClient, OmdbDetail, SearchItem},
    scraper,
    store::MovieStore,
    tmdb::{self, TmdbClient},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchSummary {
    pub genres: u64,
    pub tmdb_movies: u64,
    pub omdb_movies: u64,
    pub enriched: u64,
    pub box_office: u64,
}

pub struct Fetcher<'a> {
    pub http: &'a wreq::Client,
    pub store: &'a MovieStore,
    pub tmdb: &'a TmdbClient,
    pub omdb: &'a OmdbClient,
    pub max_concurrent: usize,
}

impl Fetcher<'_> {
    /// Runs every fetch stage in order. Stages are best-effort: a failing stage
    /// is logged and the run moves on.
    pub async fn run(
        &self,
        max_pages: u32,
        search_term: &str,
        box_office_base_url: &str,
        leaderboard_year: i16,
    ) -> FetchSummary {
        let mut summary = FetchSummary::default();

        let genre_names = self.sync_genres().await;
        summary.genres = genre_names.len() as u64;

        summary.tmdb_movies =
            stage("tmdb popular", self.sync_tmdb_popular(max_pages, &genre_names)).await;
        summary.omdb_movies =
            stage("omdb search", self.sync_omdb_search(search_term, max_pages)).await;
        summary.enriched = stage("omdb enrich", self.enrich_from_tmdb_titles(20)).await;
        summary.box_office = stage(
            "box office",
            self.sync_leaderboard(box_office_base_url, leaderboard_year),
        )
        .await;

        info!(?summary, "fetch finished");
        summary
    }

    /// Genre names from the API layered over the builtin table. Falls back to the
    /// builtin table alone when TMDB is unavailable.
    pub async fn sync_genres(&self) -> BTreeMap<i32, String> {
        let from_api = if self.tmdb.is_configured() {
            match self.tmdb.genres().await {
                Ok(list) => list.into_iter().map(|g| (g.id, g.name)).collect(),
                Err(err) => {
                    warn!(error = %err, "failed to fetch TMDB genres, using builtin table");
                    Vec::new()
                },
            }
        } else {
            Vec::new()
        };

        let names = genres::resolve(&from_api);
        match self.store.upsert_genres(&names).await {
            Ok(inserted) => debug!(inserted = inserted, "stored genres"),
            Err(err) => warn!(error = %err, "failed to store genres"),
        }
        names
    }

    pub async fn sync_tmdb_popular(
        &self,
        max_pages: u32,
        genre_names: &BTreeMap<i32, String>,
    ) -> AppResult<u64> {
        if !self.tmdb.is_configured() {
            return Ok(0);
        }

        let mut inserted = 0;
        for _ in 0..max_pages {
            let progress = self.store.progress(Source::TmdbPopular, "").await?;
            let Some(page) = progress.next_page() else {
                debug!(last_page = progress.last_page, "TMDB popular listing exhausted");
                break;
            };

            let resp = match self.tmdb.popular_movies(page).await {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(page = page, error = %err, "failed to fetch TMDB popular page");
                    break;
                },
            };
            if resp.results.is_empty() {
                debug!(page = page, "TMDB returned an empty page");
                break;
            }

            let total_pages = resp.total_pages.min(tmdb::MAX_PAGE);
            let records: Vec<_> = resp.results.iter().map(|m| m.to_record()).collect();
            let added =
                self.store.save_tmdb_page(page, total_pages, &records, genre_names).await?;
            debug!(page = page, total_pages = total_pages, added = added, "stored TMDB page");
            inserted += added;
        }

        Ok(inserted)
    }

    pub async fn sync_omdb_search(&self, term: &str, max_pages: u32) -> AppResult<u64> {
        if !self.omdb.is_configured() {
            return Ok(0);
        }

        let mut inserted = 0;
        for _ in 0..max_pages {
            let progress = self.store.progress(Source::OmdbSearch, term).await?;
            let Some(page) = progress.next_page() else {
                debug!(term = %term, last_page = progress.last_page, "OMDb search exhausted");
                break;
            };

            let resp = match self.omdb.search(term, page).await {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(term = %term, page = page, error = %err, "failed to fetch OMDb search page");
                    break;
                },
            };
            if resp.items.is_empty() {
                debug!(term = %term, page = page, "OMDb returned an empty page");
                break;
            }

            let ids: Vec<String> = resp.items.iter().map(|i| i.imdb_id.clone()).collect();
            let known = self.store.known_imdb_ids(&ids).await?;
            let fresh: Vec<SearchItem> =
                resp.items.iter().filter(|i| !known.contains(&i.imdb_id)).cloned().collect();

            let records = self.rate(fresh).await;
            let added =
                self.store.save_omdb_page(term, page, resp.total_pages(), &records).await?;
            debug!(term = %term, page = page, added = added, "stored OMDb page");
            inserted += added;
        }

        Ok(inserted)
    }

    /// Looks up the IMDb rating for each item before its one-time insert.
    async fn rate(&self, items: Vec<SearchItem>) -> Vec<OmdbMovieRecord> {
        let omdb = self.omdb;
        let mut records: Vec<OmdbMovieRecord> = stream::iter(items)
            .map(|item| async move {
                let rating = match omdb.by_id(&item.imdb_id).await {
                    Ok(detail) => detail.and_then(|d| d.rating()),
                    Err(err) => {
                        warn!(imdb_id = %item.imdb_id, error = %err, "failed to fetch OMDb rating");
                        None
                    },
                };
                item.to_record(rating)
            })
            .buffer_unordered(self.max_concurrent.max(1))
            .collect()
            .await;

        records.sort_by(|a, b| a.imdb_id.cmp(&b.imdb_id));
        records
    }

    /// Title lookups on OMDb for the next `limit` stored TMDB movies, inserted
    /// into `movies`. The marker only moves past titles whose lookup completed,
    /// so a transport failure is retried on the next run.
    pub async fn enrich_from_tmdb_titles(&self, limit: u64) -> AppResult<u64> {
        if !self.omdb.is_configured() {
            return Ok(0);
        }

        let after = self.store.enriched_through().await?;
        let batch = self.store.tmdb_titles_after(after, limit).await?;
        if batch.is_empty() {
            debug!(after = after, "no TMDB titles left to enrich");
            return Ok(0);
        }

        let omdb = self.omdb;
        // `buffered` keeps id order so the marker can stop at the first failure.
        let lookups: Vec<(i32, AppResult<Option<OmdbDetail>>)> = stream::iter(batch)
            .map(|(tmdb_id, title)| async move {
                let result = omdb.by_title(&title).await;
                if let Err(err) = &result {
                    warn!(title = %title, error = %err, "failed OMDb title lookup");
                }
                (tmdb_id, result)
            })
            .buffered(self.max_concurrent.max(1))
            .collect()
            .await;

        let mut reached = after;
        let mut inserted = 0;
        for (tmdb_id, result) in &lookups {
            let detail = match result {
                Ok(detail) => detail,
                Err(_) => break,
            };
            if let Some(detail) = detail {
                let record = detail.to_record();
                match self.store.insert_omdb_movie(&record).await {
                    Ok(true) => inserted += 1,
                    Ok(false) => {},
                    Err(err) => {
                        warn!(imdb_id = %record.imdb_id, error = %err, "failed to store OMDb movie");
                        break;
                    },
                }
            }
            reached = *tmdb_id;
        }

        if reached > after {
            self.store.mark_enriched_through(reached).await?;
        }
        debug!(
            looked_up = lookups.len(),
            inserted = inserted,
            through = reached,
            "enriched from TMDB titles"
        );
        Ok(inserted)
    }

    pub async fn sync_leaderboard(&self, base_url: &str, year: i16) -> AppResult<u64> {
        let entries = scraper::fetch_leaderboard(self.http, base_url, year).await?;
        if entries.is_empty() {
            warn!(year = year, "box office leaderboard had no rows");
            return Ok(0);
        }
        self.store.insert_leaderboard(year, &entries).await
    }
}

async fn stage(name: &str, fut: impl Future<Output = AppResult<u64>>) -> u64 {
    match fut.await {
        Ok(count) => {
            info!(stage = name, inserted = count, "stage finished");
            count
        },
        Err(err) => {
            warn!(stage = name, error = %err, "stage failed");
            0
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::{db, error::AppError, models::TmdbMovieRecord};

    type Seen = Arc<Mutex<Vec<String>>>;

    /// Answers every request on a local port with `handler(request target)` as
    /// a JSON body and records the targets it saw.
    async fn serve(handler: impl Fn(&str) -> String + Send + Sync + 'static) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::default();
        let handler = Arc::new(handler);

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf);
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    log.lock().unwrap().push(target.clone());

                    let body = (*handler)(&target);
                    let resp = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(resp.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{addr}"), seen)
    }

    fn param(target: &str, key: &str) -> Option<String> {
        let query = target.split_once('?')?.1;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then(|| v.replace('+', " ").replace("%20", " "))
        })
    }

    fn values(seen: &Seen, key: &str) -> Vec<String> {
        seen.lock().unwrap().iter().filter_map(|t| param(t, key)).collect()
    }

    fn tmdb_client(http: &wreq::Client, base: &str) -> TmdbClient {
        TmdbClient::new(http.clone(), "test-key".into(), base.into(), 100)
    }

    fn omdb_client(http: &wreq::Client, base: &str) -> OmdbClient {
        OmdbClient::new(http.clone(), "test-key".into(), base.into(), 100)
    }

    fn popular_page(page: i32, total_pages: u32, count: i32) -> String {
        let results: Vec<_> = (1..=count)
            .map(|i| {
                let id = page * 100 + i;
                serde_json::json!({
                    "id": id,
                    "title": format!("Movie {id}"),
                    "original_language": "en",
                    "genre_ids": [28],
                })
            })
            .collect();
        serde_json::json!({ "page": page, "total_pages": total_pages, "results": results })
            .to_string()
    }

    #[tokio::test]
    async fn unconfigured_sources_are_skipped() {
        let store = MovieStore::new(db::memory().await);
        let http = wreq::Client::builder().build().unwrap();
        let tmdb = TmdbClient::new(http.clone(), String::new(), "http://127.0.0.1:9".into(), 1);
        let omdb = OmdbClient::new(http.clone(), String::new(), "http://127.0.0.1:9".into(), 1);
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 2 };

        let names = fetcher.sync_genres().await;
        assert_eq!(names.get(&28).map(String::as_str), Some("Action"));
        assert_eq!(store.table_counts().await.unwrap().genres, names.len() as u64);

        assert_eq!(fetcher.sync_tmdb_popular(3, &names).await.unwrap(), 0);
        assert_eq!(fetcher.sync_omdb_search("love", 3).await.unwrap(), 0);
        assert_eq!(fetcher.enrich_from_tmdb_titles(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tmdb_pages_resume_and_stop_at_total() {
        let (base, seen) = serve(|target| {
            let page = param(target, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
            popular_page(page, 3, 2)
        })
        .await;

        let store = MovieStore::new(db::memory().await);
        let http = wreq::Client::builder().build().unwrap();
        let tmdb = tmdb_client(&http, &base);
        let omdb = OmdbClient::new(http.clone(), String::new(), base.clone(), 1);
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 2 };
        let names = genres::resolve(&[]);

        assert_eq!(fetcher.sync_tmdb_popular(2, &names).await.unwrap(), 4);
        assert_eq!(values(&seen, "page"), vec!["1", "2"]);
        let progress = store.progress(Source::TmdbPopular, "").await.unwrap();
        assert_eq!((progress.last_page, progress.total_pages), (2, Some(3)));

        assert_eq!(fetcher.sync_tmdb_popular(5, &names).await.unwrap(), 2);
        assert_eq!(values(&seen, "page"), vec!["1", "2", "3"]);

        assert_eq!(fetcher.sync_tmdb_popular(5, &names).await.unwrap(), 0);
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(store.table_counts().await.unwrap().tmdb_movies, 6);
    }

    #[tokio::test]
    async fn tmdb_empty_page_stops_without_advancing() {
        let (base, seen) = serve(|target| {
            let page = param(target, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
            popular_page(page, 40_000, if page == 1 { 2 } else { 0 })
        })
        .await;

        let store = MovieStore::new(db::memory().await);
        let http = wreq::Client::builder().build().unwrap();
        let tmdb = tmdb_client(&http, &base);
        let omdb = OmdbClient::new(http.clone(), String::new(), base.clone(), 1);
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 2 };

        assert_eq!(fetcher.sync_tmdb_popular(5, &genres::resolve(&[])).await.unwrap(), 2);
        assert_eq!(values(&seen, "page"), vec!["1", "2"]);

        let progress = store.progress(Source::TmdbPopular, "").await.unwrap();
        assert_eq!(progress.last_page, 1);
        assert_eq!(progress.total_pages, Some(tmdb::MAX_PAGE));
        assert_eq!(progress.next_page(), Some(2));
    }

    #[tokio::test]
    async fn omdb_search_resumes_with_ratings() {
        let (base, seen) = serve(|target| {
            if let Some(page) = param(target, "page").and_then(|p| p.parse::<u32>().ok()) {
                let count = if page == 3 { 5 } else { 10 };
                let items: Vec<_> = (1..=count)
                    .map(|i| {
                        serde_json::json!({
                            "Title": format!("Love {page}-{i}"),
                            "Year": "2001",
                            "imdbID": format!("tt{page}{i:02}"),
                            "Type": "movie",
                            "Poster": "N/A",
                        })
                    })
                    .collect();
                serde_json::json!({ "Search": items, "totalResults": "25", "Response": "True" })
                    .to_string()
            } else {
                let id = param(target, "i").unwrap_or_default();
                serde_json::json!({
                    "Title": "Rated", "imdbID": id, "imdbRating": "7.5", "Response": "True"
                })
                .to_string()
            }
        })
        .await;

        let store = MovieStore::new(db::memory().await);
        let http = wreq::Client::builder().build().unwrap();
        let tmdb = TmdbClient::new(http.clone(), String::new(), base.clone(), 1);
        let omdb = omdb_client(&http, &base);
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 3 };

        assert_eq!(fetcher.sync_omdb_search("love", 2).await.unwrap(), 20);
        assert_eq!(values(&seen, "page"), vec!["1", "2"]);
        assert!(values(&seen, "s").iter().all(|s| s == "love"));

        assert_eq!(fetcher.sync_omdb_search("love", 5).await.unwrap(), 5);
        assert_eq!(values(&seen, "page"), vec!["1", "2", "3"]);
        assert_eq!(fetcher.sync_omdb_search("love", 5).await.unwrap(), 0);
        assert_eq!(values(&seen, "page").len(), 3);

        let progress = store.progress(Source::OmdbSearch, "love").await.unwrap();
        assert_eq!((progress.last_page, progress.total_pages), (3, Some(3)));
        assert_eq!(store.omdb_ratings().await.unwrap(), vec![7.5; 25]);
    }

    #[tokio::test]
    async fn enrichment_walks_through_stored_titles() {
        let (base, seen) = serve(|target| {
            let title = param(target, "t").unwrap_or_default();
            if title == "Movie 2" {
                return r#"{"Response":"False","Error":"Movie not found!"}"#.to_string();
            }
            let id = title.trim_start_matches("Movie ");
            serde_json::json!({
                "Title": title, "Year": "2020", "imdbID": format!("tt{id}"),
                "Type": "movie", "imdbRating": "6.0", "Response": "True"
            })
            .to_string()
        })
        .await;

        let store = MovieStore::new(db::memory().await);
        let movies: Vec<_> = (1..=3)
            .map(|id| TmdbMovieRecord {
                tmdb_id: id,
                title: format!("Movie {id}"),
                release_date: None,
                language_code: None,
                vote_average: None,
                genre_ids: vec![],
            })
            .collect();
        store.save_tmdb_page(1, 1, &movies, &genres::resolve(&[])).await.unwrap();

        let http = wreq::Client::builder().build().unwrap();
        let tmdb = TmdbClient::new(http.clone(), String::new(), base.clone(), 1);
        let omdb = omdb_client(&http, &base);
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 2 };

        assert_eq!(fetcher.enrich_from_tmdb_titles(2).await.unwrap(), 1);
        let mut looked_up = values(&seen, "t");
        looked_up.sort();
        assert_eq!(looked_up, vec!["Movie 1", "Movie 2"]);
        assert_eq!(store.enriched_through().await.unwrap(), 2);

        assert_eq!(fetcher.enrich_from_tmdb_titles(2).await.unwrap(), 1);
        assert_eq!(values(&seen, "t").last().map(String::as_str), Some("Movie 3"));
        assert_eq!(store.enriched_through().await.unwrap(), 3);

        assert_eq!(fetcher.enrich_from_tmdb_titles(2).await.unwrap(), 0);
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(store.table_counts().await.unwrap().omdb_movies, 2);
    }

    #[tokio::test]
    async fn unreachable_omdb_keeps_enrich_marker() {
        let store = MovieStore::new(db::memory().await);
        let movie = TmdbMovieRecord {
            tmdb_id: 1,
            title: "Movie 1".to_string(),
            release_date: None,
            language_code: None,
            vote_average: None,
            genre_ids: vec![],
        };
        store.save_tmdb_page(1, 1, &[movie], &genres::resolve(&[])).await.unwrap();

        let http = wreq::Client::builder().build().unwrap();
        let tmdb = TmdbClient::new(http.clone(), String::new(), "http://127.0.0.1:9".into(), 1);
        let omdb = omdb_client(&http, "http://127.0.0.1:9");
        let fetcher =
            Fetcher { http: &http, store: &store, tmdb: &tmdb, omdb: &omdb, max_concurrent: 2 };

        assert_eq!(fetcher.enrich_from_tmdb_titles(5).await.unwrap(), 0);
        assert_eq!(store.enriched_through().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failing_stage_reports_zero() {
        let failed =
            stage("broken", async { Err::<u64, AppError>(anyhow::anyhow!("boom").into()) }).await;
        assert_eq!(failed, 0);
        assert_eq!(stage("ok", async { Ok::<u64, AppError>(7) }).await, 7);
    }
}
