use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub box_office_base_url: String,
    pub leaderboard_year: i16,
    pub database_url: String,
    pub output_dir: PathBuf,
    pub omdb_search_term: String,
    pub max_pages_per_run: u32,
    pub tmdb_rps: u32,
    pub omdb_rps: u32,
    pub max_concurrent: usize,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let last_year = jiff::Zoned::now().year().saturating_sub(1);

        Ok(Self {
            tmdb_api_key: var("TMDB_API_KEY", ""),
            tmdb_base_url: var("TMDB_BASE_URL", "https://api.themoviedb.org/3"),
            omdb_api_key: var("OMDB_API_KEY", ""),
            omdb_base_url: var("OMDB_BASE_URL", "https://www.omdbapi.com/"),
            box_office_base_url: var("BOX_OFFICE_BASE_URL", "https://www.boxofficemojo.com"),
            leaderboard_year: parsed(&lookup, "LEADERBOARD_YEAR", last_year)?,
            database_url: var("DATABASE_URL", "sqlite://movies.db?mode=rwc"),
            output_dir: PathBuf::from(var("OUTPUT_DIR", "reports")),
            omdb_search_term: var("OMDB_SEARCH_TERM", "love"),
            max_pages_per_run: parsed(&lookup, "MAX_PAGES_PER_RUN", 5)?,
            tmdb_rps: parsed(&lookup, "TMDB_RPS", 4)?,
            omdb_rps: parsed(&lookup, "OMDB_RPS", 4)?,
            max_concurrent: parsed(&lookup, "MAX_CONCURRENT_REQUESTS", 5)?,
            request_timeout_secs: parsed(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().with_context(|| key.to_string()),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.tmdb_base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.database_url, "sqlite://movies.db?mode=rwc");
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.max_pages_per_run, 5);
        assert_eq!(config.max_concurrent, 5);
        assert!(config.tmdb_api_key.is_empty());
        assert!(config.omdb_api_key.is_empty());
    }

    #[test]
    fn values_override_defaults() {
        let config = config_from(&[
            ("TMDB_API_KEY", "abc"),
            ("MAX_PAGES_PER_RUN", "12"),
            ("LEADERBOARD_YEAR", "2019"),
            ("OUTPUT_DIR", "/tmp/out"),
        ])
        .unwrap();
        assert_eq!(config.tmdb_api_key, "abc");
        assert_eq!(config.max_pages_per_run, 12);
        assert_eq!(config.leaderboard_year, 2019);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn bad_number_names_the_key() {
        let err = config_from(&[("TMDB_RPS", "fast")]).unwrap_err();
        assert!(err.to_string().contains("TMDB_RPS"));
    }
}
