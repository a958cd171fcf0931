use std::{path::PathBuf, time::Duration};

use anyhow::Context;

use crate::loader::RatingPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub omdb_timeout: Duration,
    pub movies_path: PathBuf,
    pub ratings_path: PathBuf,
    pub movie_limit: usize,
    pub api_delay: Duration,
    pub rating_policy: RatingPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movies.db?mode=rwc".to_string());

        let omdb_api_key = std::env::var("OMDB_API_KEY").unwrap_or_else(|_| "".to_string());
        let omdb_base_url = std::env::var("OMDB_BASE_URL")
            .unwrap_or_else(|_| "http://www.omdbapi.com".to_string());

        let omdb_timeout_secs: u64 =
            std::env::var("OMDB_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "Data".to_string()));
        let movies_file = std::env::var("MOVIES_FILE").unwrap_or_else(|_| "movies.csv".to_string());
        let ratings_file =
            std::env::var("RATINGS_FILE").unwrap_or_else(|_| "ratings.csv".to_string());

        let movie_limit: usize = std::env::var("MOVIE_LIMIT")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .context("MOVIE_LIMIT")?;

        let api_delay_ms: u64 =
            std::env::var("API_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(150);

        let rating_policy = match std::env::var("RATINGS_POLICY") {
            Ok(s) => s.parse().context("RATINGS_POLICY")?,
            Err(_) => RatingPolicy::default(),
        };

        Ok(Self {
            database_url,
            omdb_api_key,
            omdb_base_url,
            omdb_timeout: Duration::from_secs(omdb_timeout_secs),
            movies_path: data_dir.join(movies_file),
            ratings_path: data_dir.join(ratings_file),
            movie_limit,
            api_delay: Duration::from_millis(api_delay_ms),
            rating_policy,
        })
    }
}
