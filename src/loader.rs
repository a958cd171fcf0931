use std::{
    collections::{BTreeSet, HashMap, HashSet},
    str::FromStr,
};

use anyhow::anyhow;
use jiff::Timestamp;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait, prelude::DateTimeUtc, sea_query::OnConflict,
};
use tracing::{debug, info, warn};

use crate::{
    entities::{genre, movie, movie_genre, rating},
    error::AppResult,
    models::{Movie, Rating},
};

const RATING_CHUNK: usize = 500;

/// What to do with a rating that is already stored. The `ratings` table has
/// no natural key, so reruns duplicate rows unless asked not to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RatingPolicy {
    #[default]
    Append,
    SkipExisting,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ratings policy {0:?}, expected `append` or `skip-existing`")]
pub struct UnknownRatingPolicy(String);

impl FromStr for RatingPolicy {
    type Err = UnknownRatingPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(RatingPolicy::Append),
            "skip-existing" | "skip_existing" => Ok(RatingPolicy::SkipExisting),
            _ => Err(UnknownRatingPolicy(s.to_string())),
        }
    }
}

/// Rows actually written by one load. Conflicting rows are not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub movies: u64,
    pub genres: u64,
    pub movie_genres: u64,
    pub ratings: u64,
    pub ratings_skipped: u64,
}

/// Writes one transformed batch. Each phase runs in its own transaction and
/// commits before the next starts, so a failure leaves earlier phases applied.
pub async fn load(
    db: &DatabaseConnection,
    movies: &[Movie],
    ratings: &[Rating],
    policy: RatingPolicy,
) -> AppResult<LoadSummary> {
    let mut summary = LoadSummary::default();

    let txn = db.begin().await?;
    summary.movies = insert_movies(&txn, movies).await?;
    txn.commit().await?;
    info!(inserted = summary.movies, total = movies.len(), "movies loaded");

    let names = distinct_genres(movies);
    let txn = db.begin().await?;
    summary.genres = insert_genres(&txn, &names).await?;
    txn.commit().await?;
    info!(inserted = summary.genres, total = names.len(), "genres loaded");

    let txn = db.begin().await?;
    summary.movie_genres = insert_movie_genres(&txn, movies).await?;
    txn.commit().await?;
    info!(inserted = summary.movie_genres, "movie genres loaded");

    let txn = db.begin().await?;
    let (inserted, skipped) = insert_ratings(&txn, ratings, policy).await?;
    txn.commit().await?;
    summary.ratings = inserted;
    summary.ratings_skipped = skipped;
    info!(inserted, skipped, policy = ?policy, "ratings loaded");

    Ok(summary)
}

/// Sorted, de-duplicated genre names across all movies.
pub fn distinct_genres(movies: &[Movie]) -> Vec<String> {
    movies
        .iter()
        .flat_map(|m| m.genres.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

async fn insert_movies(txn: &DatabaseTransaction, movies: &[Movie]) -> AppResult<u64> {
    let mut inserted = 0;
    for m in movies {
        let model = movie::ActiveModel {
            movie_id: Set(m.movie_id),
            title: Set(m.title.clone()),
            release_year: Set(m.release_year),
            director: Set(m.director.clone()),
            plot: Set(m.plot.clone()),
            box_office: Set(m.box_office.clone()),
        };

        inserted += movie::Entity::insert(model)
            .on_conflict(OnConflict::column(movie::Column::MovieId).do_nothing().to_owned())
            .exec_without_returning(txn)
            .await?;
    }
    Ok(inserted)
}

async fn insert_genres(txn: &DatabaseTransaction, names: &[String]) -> AppResult<u64> {
    let mut inserted = 0;
    for name in names {
        let model =
            genre::ActiveModel { genre_id: Default::default(), genre_name: Set(name.clone()) };

        inserted += genre::Entity::insert(model)
            .on_conflict(OnConflict::column(genre::Column::GenreName).do_nothing().to_owned())
            .exec_without_returning(txn)
            .await?;
    }
    Ok(inserted)
}

async fn insert_movie_genres(txn: &DatabaseTransaction, movies: &[Movie]) -> AppResult<u64> {
    // Ids are resolved inside this phase; rows skipped on conflict earlier
    // keep whatever id the store gave them in a previous run.
    let mut resolved: HashMap<&str, Option<i32>> = HashMap::new();
    let mut inserted = 0;

    for m in movies {
        for name in &m.genres {
            let genre_id = match resolved.get(name.as_str()) {
                Some(id) => *id,
                None => {
                    let id = genre::Entity::find()
                        .filter(genre::Column::GenreName.eq(name.as_str()))
                        .one(txn)
                        .await?
                        .map(|g| g.genre_id);
                    resolved.insert(name.as_str(), id);
                    id
                },
            };

            let Some(genre_id) = genre_id else {
                warn!(movie_id = m.movie_id, genre = %name, "genre not found, skipping link");
                continue;
            };

            let model =
                movie_genre::ActiveModel { movie_id: Set(m.movie_id), genre_id: Set(genre_id) };
            inserted += movie_genre::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        movie_genre::Column::MovieId,
                        movie_genre::Column::GenreId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
    }
    Ok(inserted)
}

async fn insert_ratings(
    txn: &DatabaseTransaction,
    ratings: &[Rating],
    policy: RatingPolicy,
) -> AppResult<(u64, u64)> {
    let mut inserted = 0;
    let mut skipped = 0;
    // Repeats inside one batch are invisible to the count until their chunk is written.
    let mut seen: HashSet<(i32, i32, DateTimeUtc)> = HashSet::new();

    for chunk in ratings.chunks(RATING_CHUNK) {
        let mut models = Vec::with_capacity(chunk.len());
        for r in chunk {
            let rating_timestamp = to_db_time(r.rating_timestamp)?;

            if policy == RatingPolicy::SkipExisting {
                if !seen.insert((r.user_id, r.movie_id, rating_timestamp)) {
                    skipped += 1;
                    continue;
                }
                let existing = rating::Entity::find()
                    .filter(rating::Column::UserId.eq(r.user_id))
                    .filter(rating::Column::MovieId.eq(r.movie_id))
                    .filter(rating::Column::RatingTimestamp.eq(rating_timestamp))
                    .count(txn)
                    .await?;
                if existing > 0 {
                    skipped += 1;
                    continue;
                }
            }

            models.push(rating::ActiveModel {
                rating_id: Default::default(),
                user_id: Set(r.user_id),
                movie_id: Set(r.movie_id),
                rating: Set(r.rating),
                rating_timestamp: Set(rating_timestamp),
            });
        }

        if models.is_empty() {
            continue;
        }
        inserted += rating::Entity::insert_many(models).exec_without_returning(txn).await?;
        debug!(inserted, skipped, "ratings chunk written");
    }

    Ok((inserted, skipped))
}

fn to_db_time(ts: Timestamp) -> AppResult<DateTimeUtc> {
    let (mut secs, mut nanos) = (ts.as_second(), ts.subsec_nanosecond());
    if nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    chrono::DateTime::from_timestamp(secs, nanos as u32)
        .ok_or_else(|| anyhow!("timestamp {ts} is out of range for the datastore").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn movie(movie_id: i32, title: &str, genres: &[&str]) -> Movie {
        Movie {
            movie_id,
            title: title.to_string(),
            release_year: Some(1995),
            director: None,
            plot: None,
            box_office: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn rating(user_id: i32, movie_id: i32, value: f64, secs: i64) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            rating_timestamp: Timestamp::from_second(secs).unwrap(),
        }
    }

    async fn counts(db: &DatabaseConnection) -> (u64, u64, u64, u64) {
        (
            movie::Entity::find().count(db).await.unwrap(),
            genre::Entity::find().count(db).await.unwrap(),
            movie_genre::Entity::find().count(db).await.unwrap(),
            rating::Entity::find().count(db).await.unwrap(),
        )
    }

    #[test]
    fn parses_rating_policy() {
        assert_eq!("append".parse::<RatingPolicy>().unwrap(), RatingPolicy::Append);
        assert_eq!(" Skip-Existing ".parse::<RatingPolicy>().unwrap(), RatingPolicy::SkipExisting);
        assert!("dedupe".parse::<RatingPolicy>().is_err());
    }

    #[test]
    fn genres_are_distinct_and_sorted() {
        let movies = [
            movie(1, "Toy Story", &["Children", "Animation"]),
            movie(2, "Jumanji", &["Adventure", "Children"]),
            movie(3, "Nothing", &[]),
        ];
        assert_eq!(distinct_genres(&movies), ["Adventure", "Animation", "Children"]);
    }

    #[test]
    fn db_time_keeps_instant() {
        let ts = Timestamp::from_second(819595200).unwrap();
        assert_eq!(to_db_time(ts).unwrap().to_rfc3339(), "1995-12-22T01:20:00+00:00");

        let before_epoch = "1969-12-31T23:59:59.5Z".parse::<Timestamp>().unwrap();
        assert_eq!(to_db_time(before_epoch).unwrap().timestamp_millis(), -500);
    }

    #[tokio::test]
    async fn second_load_is_a_no_op_for_movies_and_genres() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let movies = [
            movie(1, "Toy Story", &["Adventure", "Animation", "Children"]),
            movie(2, "Jumanji", &["Adventure", "Children", "Fantasy"]),
        ];

        let first = load(&db, &movies, &[], RatingPolicy::Append).await.unwrap();
        assert_eq!(first.movies, 2);
        assert_eq!(first.genres, 4);
        assert_eq!(first.movie_genres, 6);
        let after_first = counts(&db).await;

        let second = load(&db, &movies, &[], RatingPolicy::Append).await.unwrap();
        assert_eq!(second, LoadSummary::default());
        assert_eq!(counts(&db).await, after_first);
    }

    #[tokio::test]
    async fn conflicting_movie_is_not_overwritten() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        load(&db, &[movie(1, "Toy Story", &[])], &[], RatingPolicy::Append).await.unwrap();

        let mut changed = movie(1, "Toy Story 2", &[]);
        changed.director = Some("John Lasseter".to_string());
        load(&db, &[changed], &[], RatingPolicy::Append).await.unwrap();

        let stored = movie::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.title, "Toy Story");
        assert_eq!(stored.director, None);
    }

    #[tokio::test]
    async fn links_resolve_genres_created_by_earlier_runs() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        load(&db, &[movie(1, "Heat", &["Crime", "Thriller"])], &[], RatingPolicy::Append)
            .await
            .unwrap();

        let summary =
            load(&db, &[movie(2, "Se7en", &["Mystery", "Thriller"])], &[], RatingPolicy::Append)
                .await
                .unwrap();
        assert_eq!(summary.genres, 1);
        assert_eq!(summary.movie_genres, 2);

        let thriller = genre::Entity::find()
            .filter(genre::Column::GenreName.eq("Thriller"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let linked = movie_genre::Entity::find()
            .filter(movie_genre::Column::GenreId.eq(thriller.genre_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(linked, 2);
    }

    #[tokio::test]
    async fn ratings_follow_policy_on_rerun() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let movies = [movie(1, "Toy Story", &["Animation"])];
        let ratings = [rating(10, 1, 4.5, 819595200), rating(11, 1, 3.0, 964982703)];

        load(&db, &movies, &ratings, RatingPolicy::SkipExisting).await.unwrap();
        let rerun = load(&db, &movies, &ratings, RatingPolicy::SkipExisting).await.unwrap();
        assert_eq!(rerun.ratings, 0);
        assert_eq!(rerun.ratings_skipped, 2);
        assert_eq!(counts(&db).await.3, 2);

        let appended = load(&db, &movies, &ratings, RatingPolicy::Append).await.unwrap();
        assert_eq!(appended.ratings, 2);
        assert_eq!(counts(&db).await.3, 4);
    }

    #[tokio::test]
    async fn skip_existing_drops_repeats_within_one_batch() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let movies = [movie(1, "Toy Story", &[])];
        let ratings =
            [rating(10, 1, 4.5, 819595200), rating(10, 1, 4.5, 819595200), rating(10, 1, 4.0, 1)];

        let summary = load(&db, &movies, &ratings, RatingPolicy::SkipExisting).await.unwrap();
        assert_eq!(summary.ratings, 2);
        assert_eq!(summary.ratings_skipped, 1);
        assert_eq!(counts(&db).await.3, 2);
    }

    #[tokio::test]
    async fn rating_before_epoch_round_trips() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let movies = [movie(1, "Metropolis", &[])];
        load(&db, &movies, &[rating(10, 1, 3.5, -1_000_000_000)], RatingPolicy::Append)
            .await
            .unwrap();

        let stored = rating::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(stored.rating_timestamp.timestamp(), -1_000_000_000);
    }

    #[tokio::test]
    async fn ratings_span_multiple_chunks() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let movies = [movie(1, "Toy Story", &[])];
        let ratings: Vec<Rating> =
            (0..(RATING_CHUNK as i32 * 2 + 7)).map(|u| rating(u, 1, 3.5, 964982703)).collect();

        let summary = load(&db, &movies, &ratings, RatingPolicy::Append).await.unwrap();
        assert_eq!(summary.ratings, ratings.len() as u64);
    }
}
