//! Aggregate reads over the loaded tables, as used by the dashboard.

use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, Statement};

use crate::error::AppResult;

pub const MOVIE_MIN_RATINGS: i64 = 5;
pub const GENRE_MIN_RATINGS: i64 = 20;

#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct MovieScore {
    pub movie_id: i32,
    pub title: String,
    pub avg_rating: f64,
    pub num_ratings: i64,
}

#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct GenreScore {
    pub genre_name: String,
    pub avg_rating: f64,
    pub num_ratings: i64,
}

const TOP_MOVIES: &str = "
    SELECT m.movie_id, m.title,
           ROUND(AVG(r.rating), 2) AS avg_rating, COUNT(r.rating) AS num_ratings
    FROM ratings r
    JOIN movies m ON r.movie_id = m.movie_id
    GROUP BY m.movie_id, m.title
    HAVING COUNT(r.rating) >= ?
    ORDER BY avg_rating DESC, num_ratings DESC, m.movie_id
    LIMIT ?";

const TOP_GENRES: &str = "
    SELECT g.genre_name,
           ROUND(AVG(r.rating), 2) AS avg_rating, COUNT(r.rating) AS num_ratings
    FROM ratings r
    JOIN movie_genres mg ON r.movie_id = mg.movie_id
    JOIN genres g ON mg.genre_id = g.genre_id
    GROUP BY g.genre_name
    HAVING COUNT(r.rating) >= ?
    ORDER BY avg_rating DESC, num_ratings DESC, g.genre_name
    LIMIT ?";

/// Best rated movies with at least `min_ratings` ratings. Ties go to the
/// movie with more ratings.
pub async fn top_movies(
    db: &DatabaseConnection,
    min_ratings: i64,
    limit: u32,
) -> AppResult<Vec<MovieScore>> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        TOP_MOVIES,
        [min_ratings.into(), limit.into()],
    );
    Ok(MovieScore::find_by_statement(stmt).all(db).await?)
}

/// Best rated genres with at least `min_ratings` ratings across their movies.
pub async fn top_genres(
    db: &DatabaseConnection,
    min_ratings: i64,
    limit: u32,
) -> AppResult<Vec<GenreScore>> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        TOP_GENRES,
        [min_ratings.into(), limit.into()],
    );
    Ok(GenreScore::find_by_statement(stmt).all(db).await?)
}
