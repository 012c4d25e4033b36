mod charts;
mod config;
mod db;
mod details;
mod entities;
mod error;
mod export;
mod genres;
mod models;
mod omdb;
mod pipeline;
mod report;
mod scraper;
mod store;
mod tmdb;
mod years;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};

use crate::{
    config::Config, omdb::OmdbClient, pipeline::Fetcher, store::MovieStore, tmdb::TmdbClient,
};

#[derive(Parser)]
#[command(name = "reelstats", version, about = "Collect movie metadata and chart simple statistics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, then report (default)
    Run,

    /// Fetch from TMDB, OMDb and the box office leaderboard into the database
    Fetch {
        /// Page budget per paginated source for this run
        #[arg(long)]
        pages: Option<u32>,

        /// OMDb search term
        #[arg(long)]
        search: Option<String>,
    },

    /// Print aggregates and write CSV files and charts
    Report {
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Leaderboard year to report on
        #[arg(long)]
        year: Option<i16>,
    },

    /// Print popular TMDB movies with OMDb details and save them to a text file
    Details {
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelstats=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let http = wreq::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let tmdb = TmdbClient::new(
        http.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    );
    let omdb = OmdbClient::new(
        http.clone(),
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        config.omdb_rps,
    );

    match cli.command.unwrap_or(Command::Run) {
        Command::Details { out } => {
            let movies = details::collect(&tmdb, &omdb, config.max_concurrent).await?;
            let text = details::render(&movies);
            print!("{text}");
            let path = details::save(&out.unwrap_or_else(|| config.output_dir.clone()), &text)?;
            println!("Movies have been saved to '{}'.", path.display());
        },
        command => {
            let db = db::connect_and_migrate(&config.database_url).await?;
            let store = MovieStore::new(db);
            let fetcher = Fetcher {
                http: &http,
                store: &store,
                tmdb: &tmdb,
                omdb: &omdb,
                max_concurrent: config.max_concurrent,
            };

            match command {
                Command::Fetch { pages, search } => {
                    run_fetch(&fetcher, &config, pages, search.as_deref()).await;
                },
                Command::Report { out, year } => {
                    let out = out.unwrap_or_else(|| config.output_dir.clone());
                    run_report(&store, &out, year.unwrap_or(config.leaderboard_year)).await?;
                },
                Command::Run => {
                    run_fetch(&fetcher, &config, None, None).await;
                    run_report(&store, &config.output_dir, config.leaderboard_year).await?;
                },
                Command::Details { .. } => unreachable!("details runs without a database"),
            }
        },
    }

    Ok(())
}

async fn run_fetch(
    fetcher: &Fetcher<'_>,
    config: &Config,
    pages: Option<u32>,
    search: Option<&str>,
) {
    println!("Fetching movies...");
    let summary = fetcher
        .run(
            pages.unwrap_or(config.max_pages_per_run),
            search.unwrap_or(&config.omdb_search_term),
            &config.box_office_base_url,
            config.leaderboard_year,
        )
        .await;
    println!(
        "Fetched {} TMDB movies, {} OMDb movies ({} via title lookup), {} box office rows",
        summary.tmdb_movies, summary.omdb_movies, summary.enriched, summary.box_office
    );
}

async fn run_report(store: &MovieStore, out: &Path, year: i16) -> anyhow::Result<()> {
    let built = report::build(store, year).await?;
    report::print_summary(&built, &mut std::io::stdout().lock())?;

    for series in &built.series {
        export::write_csv(out, series)?;
        if let Some(path) = charts::render(out, series)? {
            tracing::info!(path = %path.display(), "chart written");
        }
    }

    println!("\nReports written to '{}'.", out.display());
    Ok(())
}
