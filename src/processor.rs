use std::{collections::HashSet, time::Duration};

use anyhow::Context;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use jiff::Timestamp;
use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    models::{Movie, MovieDetails, RawMovie, RawRating, Rating},
    omdb::MovieLookup,
    title::{clean_title, extract_year},
};

pub const GENRE_DELIMITER: char = '|';

#[derive(Clone, Copy, Debug)]
pub struct TransformOptions {
    pub movie_limit: usize,
    pub api_delay: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct TransformOutput {
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
    pub enrichment: EnrichmentStats,
}

pub async fn transform<L: MovieLookup>(
    mut movies: Vec<RawMovie>,
    ratings: Vec<RawRating>,
    lookup: &L,
    options: TransformOptions,
) -> AppResult<TransformOutput> {
    movies.truncate(options.movie_limit);
    info!(movies = movies.len(), limit = options.movie_limit, "transforming movies");

    // No quota for a zero delay, which leaves lookups unpaced.
    let pacer: Option<DefaultDirectRateLimiter> = if lookup.is_enabled() {
        Quota::with_period(options.api_delay).map(RateLimiter::direct)
    } else {
        debug!("lookups disabled, skipping pacing");
        None
    };

    let mut stats = EnrichmentStats::default();
    let mut out = Vec::with_capacity(movies.len());
    for raw in movies {
        let title = clean_title(&raw.title);
        let release_year = extract_year(&raw.title);

        if let Some(pacer) = &pacer {
            pacer.until_ready().await;
        }
        let details = enrich(lookup, raw.movie_id, &title, &mut stats).await;

        out.push(Movie {
            movie_id: raw.movie_id,
            title,
            release_year,
            director: details.director,
            plot: details.plot,
            box_office: details.box_office,
            genres: split_genres(&raw.genres),
        });
    }

    info!(
        found = stats.found,
        not_found = stats.not_found,
        failed = stats.failed,
        "enrichment finished"
    );

    let ratings = convert_ratings(ratings, &out)?;

    Ok(TransformOutput { movies: out, ratings, enrichment: stats })
}

async fn enrich<L: MovieLookup>(
    lookup: &L,
    movie_id: i32,
    title: &str,
    stats: &mut EnrichmentStats,
) -> MovieDetails {
    match lookup.fetch_details(title).await {
        Ok(details) => {
            stats.found += 1;
            details
        },
        Err(err) if err.is_expected() => {
            stats.not_found += 1;
            debug!(movie_id = movie_id, title = %title, reason = %err, "no details");
            MovieDetails::default()
        },
        Err(err) => {
            stats.failed += 1;
            warn!(movie_id = movie_id, title = %title, error = %err, "lookup failed");
            MovieDetails::default()
        },
    }
}

/// Splits a pipe-delimited genre string. An empty string has no genres.
pub fn split_genres(genres: &str) -> Vec<String> {
    if genres.is_empty() {
        return Vec::new();
    }
    genres.split(GENRE_DELIMITER).map(str::to_string).collect()
}

/// Converts epoch seconds to timestamps, keeping only ratings of retained movies.
fn convert_ratings(ratings: Vec<RawRating>, movies: &[Movie]) -> AppResult<Vec<Rating>> {
    let retained: HashSet<i32> = movies.iter().map(|m| m.movie_id).collect();
    let total = ratings.len();

    let mut out = Vec::with_capacity(total);
    for raw in ratings {
        if !retained.contains(&raw.movie_id) {
            continue;
        }
        let rating_timestamp = Timestamp::from_second(raw.timestamp).with_context(|| {
            format!(
                "rating by user {} for movie {} has out-of-range timestamp {}",
                raw.user_id, raw.movie_id, raw.timestamp
            )
        })?;
        out.push(Rating {
            user_id: raw.user_id,
            movie_id: raw.movie_id,
            rating: raw.rating,
            rating_timestamp,
        });
    }

    debug!(kept = out.len(), dropped = total - out.len(), "ratings converted");
    Ok(out)
}
