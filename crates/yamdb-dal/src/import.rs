//! Bulk load of reference and sample data with explicit ids.
//!
//! Records whose id already exists are left untouched, so loading the same
//! fixtures twice is harmless.

use serde::Deserialize;
use sqlx::{Acquire, Connection as _, Executor};
use time::OffsetDateTime;
use tracing::{debug, info};
use yamdb_types::claim::Role;

use crate::{BEGIN_WRITE, ChosenDB, error::Result};

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupFixture {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleFixture {
    pub id: i64,
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub description: Option<String>,
    /// Category id
    pub category: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreTitleFixture {
    pub title_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewFixture {
    pub id: i64,
    pub title_id: i64,
    pub text: String,
    /// Author user id
    pub author: i64,
    pub score: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentFixture {
    pub id: i64,
    pub review_id: i64,
    pub text: String,
    /// Author user id
    pub author: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub users: Vec<UserFixture>,
    pub categories: Vec<LookupFixture>,
    pub genres: Vec<LookupFixture>,
    pub titles: Vec<TitleFixture>,
    pub genre_title: Vec<GenreTitleFixture>,
    pub reviews: Vec<ReviewFixture>,
    pub comments: Vec<CommentFixture>,
}

/// Numbers of newly inserted records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub users: u64,
    pub categories: u64,
    pub genres: u64,
    pub titles: u64,
    pub genre_links: u64,
    pub reviews: u64,
    pub comments: u64,
}

pub struct Importer<E> {
    executor: E,
}

impl<'c, E> Importer<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Loads all fixtures in one transaction, then recomputes all title ratings.
    pub async fn import(&self, fixtures: &Fixtures) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        for user in &fixtures.users {
            let res = sqlx::query(
                "INSERT INTO users (id, username, email, role, bio, first_name, last_name)
                VALUES (?, ?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(&user.bio)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .execute(&mut *tx)
            .await?;
            stats.users += res.rows_affected();
        }

        for genre in &fixtures.genres {
            let res = sqlx::query(
                "INSERT INTO genre (id, name, slug) VALUES (?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(genre.id)
            .bind(&genre.name)
            .bind(&genre.slug)
            .execute(&mut *tx)
            .await?;
            stats.genres += res.rows_affected();
        }

        for category in &fixtures.categories {
            let res = sqlx::query(
                "INSERT INTO category (id, name, slug) VALUES (?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .execute(&mut *tx)
            .await?;
            stats.categories += res.rows_affected();
        }

        for title in &fixtures.titles {
            let res = sqlx::query(
                "INSERT INTO title (id, name, year, description, category_id)
                VALUES (?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(title.id)
            .bind(&title.name)
            .bind(title.year)
            .bind(&title.description)
            .bind(title.category)
            .execute(&mut *tx)
            .await?;
            stats.titles += res.rows_affected();
        }

        for link in &fixtures.genre_title {
            let res =
                sqlx::query("INSERT OR IGNORE INTO title_genre (title_id, genre_id) VALUES (?, ?)")
                    .bind(link.title_id)
                    .bind(link.genre_id)
                    .execute(&mut *tx)
                    .await?;
            stats.genre_links += res.rows_affected();
        }

        for review in &fixtures.reviews {
            let res = sqlx::query(
                "INSERT INTO review (id, title_id, author_id, text, score, pub_date)
                VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(review.id)
            .bind(review.title_id)
            .bind(review.author)
            .bind(&review.text)
            .bind(review.score)
            .bind(review.pub_date)
            .execute(&mut *tx)
            .await?;
            stats.reviews += res.rows_affected();
        }

        for comment in &fixtures.comments {
            let res = sqlx::query(
                "INSERT INTO comment (id, review_id, author_id, text, pub_date)
                VALUES (?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
            )
            .bind(comment.id)
            .bind(comment.review_id)
            .bind(comment.author)
            .bind(&comment.text)
            .bind(comment.pub_date)
            .execute(&mut *tx)
            .await?;
            stats.comments += res.rows_affected();
        }

        let res = sqlx::query(
            "UPDATE title SET rating =
            (SELECT SUM(score) / COUNT(score) FROM review WHERE review.title_id = title.id)",
        )
        .execute(&mut *tx)
        .await?;
        debug!("Recomputed rating of {} titles", res.rows_affected());

        tx.commit().await?;
        info!("Imported fixtures: {stats:?}");
        Ok(stats)
    }
}
