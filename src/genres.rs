use std::collections::BTreeMap;

pub const UNKNOWN_GENRE: &str = "Unknown";

/// TMDB movie genres as published by `/genre/movie/list`.
const TMDB_MOVIE_GENRES: [(i32, &str); 19] = [
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

pub fn genre_name(id: i32) -> &'static str {
    TMDB_MOVIE_GENRES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_GENRE)
}

/// Genre names keyed by id: the builtin table, overridden by whatever the API returned.
pub fn resolve(from_api: &[(i32, String)]) -> BTreeMap<i32, String> {
    let mut names: BTreeMap<i32, String> =
        TMDB_MOVIE_GENRES.iter().map(|(id, name)| (*id, name.to_string())).collect();
    for (id, name) in from_api {
        let name = name.trim();
        if !name.is_empty() {
            names.insert(*id, name.to_string());
        }
    }
    names
}

pub fn name_in(names: &BTreeMap<i32, String>, id: i32) -> String {
    names.get(&id).cloned().unwrap_or_else(|| genre_name(id).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_map_to_names() {
        assert_eq!(genre_name(28), "Action");
        assert_eq!(genre_name(878), "Science Fiction");
    }

    #[test]
    fn unmapped_ids_fall_back_to_unknown() {
        assert_eq!(genre_name(-1), UNKNOWN_GENRE);
        assert_eq!(genre_name(424242), UNKNOWN_GENRE);
        assert_eq!(name_in(&resolve(&[]), 424242), UNKNOWN_GENRE);
    }

    #[test]
    fn api_names_override_builtin_table() {
        let names = resolve(&[(28, "Action & Adventure".to_string()), (99999, "Anime".into())]);
        assert_eq!(names[&28], "Action & Adventure");
        assert_eq!(names[&99999], "Anime");
        assert_eq!(names[&18], "Drama");
    }

    #[test]
    fn blank_api_names_are_ignored() {
        let names = resolve(&[(35, "  ".to_string())]);
        assert_eq!(names[&35], "Comedy");
    }
}
