/// One OMDb title ready for insertion into `movies`.
#[derive(Clone, Debug, PartialEq)]
pub struct OmdbMovieRecord {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub kind: String,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
}

/// One TMDB popular-listing entry ready for insertion into `movies_tmdb`.
#[derive(Clone, Debug, PartialEq)]
pub struct TmdbMovieRecord {
    pub tmdb_id: i32,
    pub title: String,
    pub release_date: Option<String>,
    pub language_code: Option<String>,
    pub vote_average: Option<f64>,
    pub genre_ids: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub title: String,
    pub worldwide_gross: i64,
    pub domestic_gross: Option<i64>,
    pub foreign_gross: Option<i64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    TmdbPopular,
    OmdbSearch,
    /// Title lookups for stored TMDB movies. `last_page` holds the highest
    /// `tmdb_id` already looked up.
    OmdbEnrich,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::TmdbPopular => "tmdb_popular",
            Source::OmdbSearch => "omdb_search",
            Source::OmdbEnrich => "omdb_enrich",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Progress {
    pub last_page: u32,
    pub total_pages: Option<u32>,
}

impl Progress {
    pub fn next_page(&self) -> Option<u32> {
        match self.total_pages {
            Some(total) if self.last_page >= total => None,
            _ => Some(self.last_page + 1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CountRow {
    pub label: String,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TableCounts {
    pub omdb_movies: u64,
    pub tmdb_movies: u64,
    pub languages: u64,
    pub genres: u64,
    pub movie_genres: u64,
    pub box_office: u64,
}
