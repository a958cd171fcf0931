use anyhow::Context;
use movie_etl::{
    config::Config,
    db, extract,
    loader::{self, LoadSummary},
    omdb::OmdbClient,
    processor::{self, TransformOptions},
    queries,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movie_etl=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("movie-etl/0.1")
        .timeout(config.omdb_timeout)
        .build()?;

    let db = db::connect_and_migrate(&config.database_url)
        .await
        .context("connecting to database")?;
    tracing::info!("database connected");

    let omdb = OmdbClient::new(http, config.omdb_api_key.clone(), config.omdb_base_url.clone());

    let (movies, ratings) = extract::extract(&config.movies_path, &config.ratings_path)?;

    let out = processor::transform(
        movies,
        ratings,
        &omdb,
        TransformOptions { movie_limit: config.movie_limit, api_delay: config.api_delay },
    )
    .await?;

    let LoadSummary { movies, genres, movie_genres, ratings, ratings_skipped } =
        loader::load(&db, &out.movies, &out.ratings, config.rating_policy).await?;
    tracing::info!(movies, genres, movie_genres, ratings, ratings_skipped, "etl completed");

    let top = queries::top_movies(&db, queries::MOVIE_MIN_RATINGS, 5).await?;
    for (rank, m) in top.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            title = %m.title,
            avg_rating = m.avg_rating,
            num_ratings = m.num_ratings,
            "top movie"
        );
    }

    Ok(())
}
