use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Connection as _, Executor};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    BEGIN_WRITE, Batch, ChosenDB, ListingParams,
    error::{Error, Result},
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    #[serde(skip_serializing)]
    pub title_id: i64,
    pub text: String,
    pub author: String,
    #[serde(skip_serializing)]
    pub author_id: i64,
    pub score: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReview {
    #[garde(required, length(min = 1))]
    pub text: Option<String>,
    #[garde(required, range(min = 1, max = 10))]
    pub score: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReview {
    #[garde(length(min = 1))]
    pub text: Option<String>,
    #[garde(range(min = 1, max = 10))]
    pub score: Option<i32>,
}

const SELECT_REVIEW: &str = "SELECT r.id, r.title_id, r.text, u.username AS author, r.author_id, r.score, r.pub_date
FROM review r JOIN users u ON r.author_id = u.id";

/// Sets title rating to integer mean of its review scores, NULL when title has no reviews.
pub(crate) async fn recompute_rating<'c, E>(title_id: i64, executor: E) -> Result<()>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query(
        "UPDATE title SET rating = (SELECT SUM(score) / COUNT(score) FROM review WHERE title_id = ?1)
        WHERE id = ?1",
    )
    .bind(title_id)
    .execute(executor)
    .await?;
    debug!("Recomputed rating of title {title_id}");
    Ok(())
}

pub(crate) async fn ensure_title<'c, E>(title_id: i64, executor: E) -> Result<()>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_scalar::<_, i64>("SELECT id FROM title WHERE id = ?")
        .bind(title_id)
        .fetch_optional(executor)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::RecordNotFound("Title".to_string()))
}

async fn get<'c, E>(title_id: i64, id: i64, executor: E) -> Result<Review>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, Review>(&format!("{SELECT_REVIEW} WHERE r.id = ? AND r.title_id = ?"))
        .bind(id)
        .bind(title_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
}

// UNIQUE(author_id, title_id) in storage backs the check done in `create`
fn duplicate_review(e: sqlx::Error) -> Error {
    match Error::from_unique_violation(e) {
        Error::Duplicate { .. } => Error::DuplicateReview,
        other => other,
    }
}

pub type ReviewRepository = ReviewRepositoryImpl<crate::Pool>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Reviews of the title, newest first.
    pub async fn list(&self, title_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        ensure_title(title_id, &self.executor).await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} WHERE r.title_id = ? ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(title_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            rows,
            total,
        })
    }

    pub async fn get(&self, title_id: i64, id: i64) -> Result<Review> {
        get(title_id, id, &self.executor).await
    }

    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        ensure_title(title_id, &mut *tx).await?;
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE author_id = ? AND title_id = ?")
                .bind(author_id)
                .bind(title_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(Error::DuplicateReview);
        }

        let result = sqlx::query(
            "INSERT INTO review (title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(payload.score)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(duplicate_review)?;
        let id = result.last_insert_rowid();

        recompute_rating(title_id, &mut *tx).await?;
        let record = get(title_id, id, &mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn update(&self, title_id: i64, id: i64, payload: UpdateReview) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let result = sqlx::query(
            "UPDATE review SET text = COALESCE(?, text), score = COALESCE(?, score)
            WHERE id = ? AND title_id = ?",
        )
        .bind(&payload.text)
        .bind(payload.score)
        .bind(id)
        .bind(title_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Review".to_string()));
        }

        recompute_rating(title_id, &mut *tx).await?;
        let record = get(title_id, id, &mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn delete(&self, title_id: i64, id: i64) -> Result<()> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let res = sqlx::query("DELETE FROM review WHERE id = ? AND title_id = ?")
            .bind(id)
            .bind(title_id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Review".to_string()));
        }

        recompute_rating(title_id, &mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT_REVIEW: &str = "INSERT INTO review (title_id, author_id, text, score, pub_date)
        VALUES (1, 1, 'Great', 5, '2024-01-01T00:00:00Z')";

    #[tokio::test]
    async fn test_storage_rejects_duplicate_review() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate(&pool).await.unwrap();
        sqlx::query("INSERT INTO users (id, username, email, role) VALUES (1, 'pepa', 'pepa@example.com', 'user')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO title (id, name, year) VALUES (1, 'Solaris', 1972)")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query(INSERT_REVIEW).execute(&pool).await.unwrap();
        let err = sqlx::query(INSERT_REVIEW).execute(&pool).await.unwrap_err();
        match &err {
            sqlx::Error::Database(db_error) => assert!(db_error.is_unique_violation()),
            other => panic!("Unexpected error {other}"),
        }
        assert!(matches!(duplicate_review(err), Error::DuplicateReview));

        let err = duplicate_review(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
    }
}
