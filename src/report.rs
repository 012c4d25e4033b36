use std::io::Write;

use crate::{
    error::AppResult,
    models::{CountRow, TableCounts},
    store::MovieStore,
};

const RATING_BUCKETS: usize = 10;
const PIE_SLICES: usize = 8;
const BOX_OFFICE_TOP: u64 = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChartKind {
    Bar,
    Histogram,
    Pie,
}

/// One aggregate ready for printing, CSV export and charting. `labels` and
/// `values` always have the same length. `values` are exact; charts divide
/// them by `chart_scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub slug: &'static str,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub chart_scale: f64,
}

impl Series {
    fn from_counts(
        slug: &'static str,
        title: &str,
        x_label: &str,
        kind: ChartKind,
        rows: Vec<CountRow>,
    ) -> Self {
        let (labels, values) = rows.into_iter().map(|r| (r.label, r.count as f64)).unzip();
        Self {
            slug,
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: "Number of Movies".to_string(),
            kind,
            labels,
            values,
            chart_scale: 1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn chart_values(&self) -> Vec<f64> {
        self.values.iter().map(|v| v / self.chart_scale).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub counts: TableCounts,
    pub series: Vec<Series>,
}

pub async fn build(store: &MovieStore, leaderboard_year: i16) -> AppResult<Report> {
    let per_genre = store.tmdb_movies_per_genre().await?;

    let mut series = vec![
        Series::from_counts(
            "omdb_movies_per_year",
            "Number of Movies Released Each Year (OMDb Data)",
            "Year",
            ChartKind::Bar,
            store.omdb_movies_per_year().await?,
        ),
        Series::from_counts(
            "tmdb_movies_per_language",
            "Number of Movies Per Language (TMDB Data)",
            "Language Code",
            ChartKind::Bar,
            store.tmdb_movies_per_language().await?,
        ),
        Series::from_counts(
            "tmdb_movies_per_genre",
            "Number of Movies Per Genre (TMDB Data)",
            "Genre",
            ChartKind::Bar,
            per_genre.clone(),
        ),
        Series::from_counts(
            "tmdb_genre_share",
            "Genre Share (TMDB Data)",
            "Genre",
            ChartKind::Pie,
            top_with_other(per_genre, PIE_SLICES),
        ),
        rating_histogram(&store.omdb_ratings().await?),
        Series::from_counts(
            "tmdb_releases_per_year",
            "TMDB Releases Per Year",
            "Release Year",
            ChartKind::Bar,
            store.tmdb_releases_per_year().await?,
        ),
    ];

    let top = store.leaderboard(leaderboard_year, BOX_OFFICE_TOP).await?;
    let (labels, values) = top
        .into_iter()
        .map(|m| (format!("#{} {}", m.rank, m.title), m.worldwide_gross as f64))
        .unzip();
    series.push(Series {
        slug: "box_office_top",
        title: format!("Worldwide Box Office {leaderboard_year} (Top {BOX_OFFICE_TOP})"),
        x_label: "Release".to_string(),
        y_label: "Worldwide Gross (USD millions)".to_string(),
        kind: ChartKind::Bar,
        labels,
        values,
        chart_scale: 1_000_000.0,
    });

    Ok(Report { counts: store.table_counts().await?, series })
}

/// Buckets ratings into ten 1.0-wide bins over 0..=10. A perfect 10 lands in
/// the last bin; anything outside the scale is dropped.
pub fn rating_histogram(ratings: &[f64]) -> Series {
    let mut buckets = [0u64; RATING_BUCKETS];
    let mut seen = 0;
    for rating in ratings {
        if !(0.0..=10.0).contains(rating) {
            continue;
        }
        let bucket = (rating.floor() as usize).min(RATING_BUCKETS - 1);
        buckets[bucket] += 1;
        seen += 1;
    }

    let (labels, values) = if seen == 0 {
        (Vec::new(), Vec::new())
    } else {
        (0..RATING_BUCKETS)
            .map(|i| (format!("{}-{}", i, i + 1), buckets[i] as f64))
            .unzip()
    };

    Series {
        slug: "omdb_rating_histogram",
        title: "IMDb Rating Distribution (OMDb Data)".to_string(),
        x_label: "IMDb Rating".to_string(),
        y_label: "Number of Movies".to_string(),
        kind: ChartKind::Histogram,
        labels,
        values,
        chart_scale: 1.0,
    }
}

/// Keeps the first `keep - 1` rows and folds the rest into "Other".
fn top_with_other(rows: Vec<CountRow>, keep: usize) -> Vec<CountRow> {
    if rows.len() <= keep {
        return rows;
    }
    let mut rows = rows;
    let rest = rows.split_off(keep.saturating_sub(1));
    let other: u64 = rest.iter().map(|r| r.count).sum();
    rows.push(CountRow { label: "Other".to_string(), count: other });
    rows
}

pub fn print_summary(report: &Report, out: &mut impl Write) -> std::io::Result<()> {
    let c = &report.counts;
    writeln!(
        out,
        "Stored: {} OMDb movies, {} TMDB movies, {} languages, {} genres, {} genre links, {} box office rows",
        c.omdb_movies, c.tmdb_movies, c.languages, c.genres, c.movie_genres, c.box_office
    )?;

    for series in &report.series {
        writeln!(out)?;
        writeln!(out, "{}:", series.title)?;
        if series.is_empty() {
            writeln!(out, "  (no data)")?;
            continue;
        }
        for (label, value) in series.rows() {
            writeln!(out, "  {}: {}", label, format_value(value))?;
        }
    }

    Ok(())
}

/// Whole numbers print without a fraction, everything else with two decimals.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 { format!("{}", value as i64) } else { format!("{value:.2}") }
}
