use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Executor;
use time::OffsetDateTime;

use crate::{
    Batch, ChosenDB, ListingParams,
    error::{Error, Result},
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    #[serde(skip_serializing)]
    pub review_id: i64,
    pub text: String,
    pub author: String,
    #[serde(skip_serializing)]
    pub author_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComment {
    #[garde(required, length(min = 1))]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComment {
    #[garde(length(min = 1))]
    pub text: Option<String>,
}

const SELECT_COMMENT: &str = "SELECT c.id, c.review_id, c.text, u.username AS author, c.author_id, c.pub_date
FROM comment c JOIN users u ON c.author_id = u.id";

pub type CommentRepository = CommentRepositoryImpl<crate::Pool>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    // Review must exist and belong to the title from the path
    async fn ensure_review(&self, title_id: i64, review_id: i64) -> Result<()> {
        crate::review::ensure_title(title_id, &self.executor).await?;
        sqlx::query_scalar::<_, i64>("SELECT id FROM review WHERE id = ? AND title_id = ?")
            .bind(review_id)
            .bind(title_id)
            .fetch_optional(&self.executor)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn list(
        &self,
        title_id: i64,
        review_id: i64,
        params: ListingParams,
    ) -> Result<Batch<Comment>> {
        self.ensure_review(title_id, review_id).await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM comment WHERE review_id = ?")
            .bind(review_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.review_id = ? ORDER BY c.pub_date DESC, c.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(review_id)
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

    pub async fn get(&self, title_id: i64, review_id: i64, id: i64) -> Result<Comment> {
        self.ensure_review(title_id, review_id).await?;
        sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.id = ? AND c.review_id = ?"
        ))
        .bind(id)
        .bind(review_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn create(
        &self,
        title_id: i64,
        review_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        self.ensure_review(title_id, review_id).await?;
        let result = sqlx::query(
            "INSERT INTO comment (review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?)",
        )
        .bind(review_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(title_id, review_id, id).await
    }

    pub async fn update(
        &self,
        title_id: i64,
        review_id: i64,
        id: i64,
        payload: UpdateComment,
    ) -> Result<Comment> {
        self.ensure_review(title_id, review_id).await?;
        let result = sqlx::query(
            "UPDATE comment SET text = COALESCE(?, text) WHERE id = ? AND review_id = ?",
        )
        .bind(&payload.text)
        .bind(id)
        .bind(review_id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            self.get(title_id, review_id, id).await
        }
    }

    pub async fn delete(&self, title_id: i64, review_id: i64, id: i64) -> Result<()> {
        self.ensure_review(title_id, review_id).await?;
        let res = sqlx::query("DELETE FROM comment WHERE id = ? AND review_id = ?")
            .bind(id)
            .bind(review_id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            Ok(())
        }
    }
}
