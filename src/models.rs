use jiff::Timestamp;
use serde::Deserialize;

/// One row of `movies.csv`. The title still carries its `(YYYY)` suffix and
/// the genres are a single pipe-delimited string.
#[derive(Clone, Debug, Deserialize)]
pub struct RawMovie {
    #[serde(rename = "movieId")]
    pub movie_id: i32,
    pub title: String,
    pub genres: String,
}

/// One row of `ratings.csv`.
#[derive(Clone, Debug, Deserialize)]
pub struct RawRating {
    #[serde(rename = "userId")]
    pub user_id: i32,
    #[serde(rename = "movieId")]
    pub movie_id: i32,
    pub rating: f64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieDetails {
    pub director: Option<String>,
    pub plot: Option<String>,
    pub box_office: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Movie {
    pub movie_id: i32,
    pub title: String,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub plot: Option<String>,
    pub box_office: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rating {
    pub user_id: i32,
    pub movie_id: i32,
    pub rating: f64,
    pub rating_timestamp: Timestamp,
}
