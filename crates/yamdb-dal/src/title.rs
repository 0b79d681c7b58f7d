use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Acquire, Connection as _, Executor, QueryBuilder, Row};
use tracing::debug;
use yamdb_types::general::{not_in_future, valid_slug};

use crate::{
    BEGIN_WRITE, Batch, ChosenDB, ChosenRow, ListingParams,
    category::Category,
    error::{Error, Result},
    genre::Genre,
};

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<i64>,
    pub description: Option<String>,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

impl sqlx::FromRow<'_, ChosenRow> for Title {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<Option<i64>, _>("category_id")? {
            Some(id) => Some(Category {
                id,
                name: row.try_get("category_name")?,
                slug: row.try_get("category_slug")?,
            }),
            None => None,
        };
        let genres: String = row.try_get("genres")?;
        let genre = serde_json::from_str(&genres).map_err(|e| sqlx::Error::ColumnDecode {
            index: "genres".to_string(),
            source: Box::new(e),
        })?;
        Ok(Title {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            rating: row.try_get("rating")?,
            description: row.try_get("description")?,
            genre,
            category,
        })
    }
}

/// Query filters for title listing, all must match. Empty values are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TitleFilter {
    /// Category slug
    #[garde(length(max = 50))]
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    /// Genre slug
    #[garde(length(max = 50))]
    #[serde(default, deserialize_with = "empty_as_none")]
    pub genre: Option<String>,
    /// Substring of name
    #[garde(length(max = 256))]
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
    #[garde(skip)]
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTitle {
    #[garde(required, length(min = 1, max = 256))]
    pub name: Option<String>,
    #[garde(required, range(min = 0), inner(custom(not_in_future)))]
    pub year: Option<i32>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(required, length(min = 1), inner(inner(custom(valid_slug))))]
    pub genre: Option<Vec<String>>,
    #[garde(required, inner(custom(valid_slug)))]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: Option<String>,
    #[garde(range(min = 0), inner(custom(not_in_future)))]
    pub year: Option<i32>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(length(min = 1), inner(inner(custom(valid_slug))))]
    pub genre: Option<Vec<String>>,
    #[garde(inner(custom(valid_slug)))]
    pub category: Option<String>,
}

const SELECT_TITLE: &str = r#"SELECT t.id, t.name, t.year, t.rating, t.description,
c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
(SELECT json_group_array(json_object('id', g.id, 'name', g.name, 'slug', g.slug))
    FROM (SELECT g.id, g.name, g.slug FROM title_genre tg JOIN genre g ON tg.genre_id = g.id
        WHERE tg.title_id = t.id ORDER BY g.name) g) AS genres
FROM title t
LEFT JOIN category c ON t.category_id = c.id"#;

fn push_filter<'a>(builder: &mut QueryBuilder<'a, ChosenDB>, filter: &'a TitleFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(category) = filter.category.as_deref() {
        builder
            .push(" AND t.category_id IN (SELECT id FROM category WHERE slug = ")
            .push_bind(category)
            .push(")");
    }
    if let Some(genre) = filter.genre.as_deref() {
        builder
            .push(" AND t.id IN (SELECT tg.title_id FROM title_genre tg JOIN genre g ON tg.genre_id = g.id WHERE g.slug = ")
            .push_bind(genre)
            .push(")");
    }
    if let Some(name) = filter.name.as_deref() {
        builder
            .push(" AND t.name LIKE ")
            .push_bind(crate::like_pattern(name))
            .push(" ESCAPE '\\'");
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ").push_bind(year);
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<Title>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, Title>(&format!("{SELECT_TITLE} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Title".to_string()))
}

async fn category_id<'c, E>(slug: &str, executor: E) -> Result<i64>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_scalar("SELECT id FROM category WHERE slug = ?")
        .bind(slug)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::InvalidReference {
            field: "category",
            value: slug.to_string(),
        })
}

async fn genre_id<'c, E>(slug: &str, executor: E) -> Result<i64>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_scalar("SELECT id FROM genre WHERE slug = ?")
        .bind(slug)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::InvalidReference {
            field: "genre",
            value: slug.to_string(),
        })
}

pub type TitleRepository = TitleRepositoryImpl<crate::Pool>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Titles ordered by name and year.
    pub async fn list(&self, params: ListingParams, filter: &TitleFilter) -> Result<Batch<Title>> {
        let mut count_query = QueryBuilder::new("SELECT count(*) FROM title t");
        push_filter(&mut count_query, filter);
        let total: u64 = count_query
            .build_query_scalar()
            .fetch_one(&self.executor)
            .await?;

        let mut query = QueryBuilder::new(SELECT_TITLE);
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY t.name, t.year, t.id LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = query
            .build_query_as::<Title>()
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

    pub async fn get(&self, id: i64) -> Result<Title> {
        get(id, &self.executor).await
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let category_id = match payload.category.as_deref() {
            Some(slug) => Some(category_id(slug, &mut *tx).await?),
            None => None,
        };
        let result = sqlx::query(
            "INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        for slug in payload.genre.iter().flatten() {
            let genre_id = genre_id(slug, &mut *tx).await?;
            sqlx::query("INSERT OR IGNORE INTO title_genre (title_id, genre_id) VALUES (?, ?)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        let record = get(id, &mut *tx).await?;
        tx.commit().await?;
        debug!("Created title {id}");
        Ok(record)
    }

    /// Partial update, when genres are given they replace current ones.
    pub async fn update(&self, id: i64, payload: UpdateTitle) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let category_id = match payload.category.as_deref() {
            Some(slug) => Some(category_id(slug, &mut *tx).await?),
            None => None,
        };
        let result = sqlx::query(
            "UPDATE title SET
            name = COALESCE(?, name),
            year = COALESCE(?, year),
            description = COALESCE(?, description),
            category_id = COALESCE(?, category_id)
            WHERE id = ?",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Title".to_string()));
        }

        if let Some(genres) = payload.genre.as_ref() {
            sqlx::query("DELETE FROM title_genre WHERE title_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for slug in genres {
                let genre_id = genre_id(slug, &mut *tx).await?;
                sqlx::query("INSERT OR IGNORE INTO title_genre (title_id, genre_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let record = get(id, &mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Reviews and their comments go with the title.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Title".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_title_validation() {
        let payload: CreateTitle = serde_json::from_str(
            r#"{"name": "Forrest Gump", "year": 1994, "genre": ["drama"], "category": "movie"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());

        let payload: CreateTitle = serde_json::from_str(
            r#"{"name": "Future", "year": 3000, "genre": ["drama"], "category": "movie"}"#,
        )
        .unwrap();
        let report = payload.validate().unwrap_err();
        assert!(report.iter().any(|(path, _)| path.to_string() == "year"));

        let payload: CreateTitle =
            serde_json::from_str(r#"{"name": "No category", "year": 1994, "genre": ["drama"]}"#)
                .unwrap();
        assert!(payload.validate().is_err());

        let payload: CreateTitle = serde_json::from_str(
            r#"{"name": "Bad genre", "year": 1994, "genre": ["no spaces"], "category": "movie"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_filter_sql() {
        let filter = TitleFilter {
            category: Some("movie".into()),
            genre: None,
            name: Some("gump".into()),
            year: Some(1994),
        };
        let mut builder = QueryBuilder::<ChosenDB>::new("SELECT count(*) FROM title t");
        push_filter(&mut builder, &filter);
        let sql = builder.sql();
        assert!(sql.contains("t.category_id IN"));
        assert!(!sql.contains("title_genre"));
        assert!(sql.contains("t.name LIKE"));
        assert!(sql.contains("t.year ="));
    }

    #[test]
    fn test_empty_filter_values() {
        let filter: TitleFilter =
            serde_json::from_str(r#"{"category": "", "genre": "", "name": "", "year": ""}"#)
                .unwrap();
        assert!(filter.category.is_none());
        assert!(filter.genre.is_none());
        assert!(filter.name.is_none());
        assert!(filter.year.is_none());

        let filter: TitleFilter = serde_json::from_str(r#"{"genre": "drama", "year": "1994"}"#).unwrap();
        assert_eq!(filter.genre.as_deref(), Some("drama"));
        assert_eq!(filter.year, Some(1994));

        assert!(serde_json::from_str::<TitleFilter>(r#"{"year": "last"}"#).is_err());
    }
}
