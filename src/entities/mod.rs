pub mod box_office;
pub mod fetch_progress;
pub mod genre;
pub mod language;
pub mod movie_genre;
pub mod omdb_movie;
pub mod tmdb_movie;
