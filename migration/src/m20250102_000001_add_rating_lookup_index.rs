use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Not unique: ratings are allowed to accumulate across runs.
        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_user_movie_ts")
                    .table(Ratings::Table)
                    .col(Ratings::UserId)
                    .col(Ratings::MovieId)
                    .col(Ratings::RatingTimestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_movie")
                    .table(Ratings::Table)
                    .col(Ratings::MovieId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_ratings_movie").table(Ratings::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop().name("idx_ratings_user_movie_ts").table(Ratings::Table).to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    UserId,
    MovieId,
    RatingTimestamp,
}
