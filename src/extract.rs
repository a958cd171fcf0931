use std::{fs::File, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    error::AppResult,
    models::{RawMovie, RawRating},
};

pub fn extract(
    movies_path: &Path,
    ratings_path: &Path,
) -> AppResult<(Vec<RawMovie>, Vec<RawRating>)> {
    let movies: Vec<RawMovie> = read_csv(movies_path)?;
    let ratings: Vec<RawRating> = read_csv(ratings_path)?;
    info!(movies = movies.len(), ratings = ratings.len(), "csv loaded");
    Ok((movies, ratings))
}

/// Reads every record of a headed CSV file. Any missing column or unparsable
/// field fails the whole read.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr =
        csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::Headers).from_reader(file);

    let mut out = Vec::new();
    for (idx, record) in rdr.deserialize().enumerate() {
        let row: T =
            record.with_context(|| format!("{}: malformed record {}", path.display(), idx + 1))?;
        out.push(row);
    }
    Ok(out)
}
