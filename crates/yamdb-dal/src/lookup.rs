/// Name + slug reference table with its repository, addressed by slug.
macro_rules! lookup_entity {
    ($entity:ident, $create:ident, $repo:ident, $repo_impl:ident, $table:literal) => {
        use futures::TryStreamExt as _;
        use garde::Validate;
        use serde::{Deserialize, Serialize};
        use yamdb_types::general::valid_slug;

        use crate::{
            Batch, ListingParams,
            error::{Error, Result},
        };

        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
        pub struct $entity {
            #[serde(skip_serializing)]
            pub id: i64,
            pub name: String,
            pub slug: String,
        }

        #[derive(Debug, Clone, Deserialize, Validate)]
        pub struct $create {
            #[garde(required, length(min = 1, max = 256))]
            pub name: Option<String>,
            #[garde(required, inner(custom(valid_slug)))]
            pub slug: Option<String>,
        }

        pub type $repo = $repo_impl<crate::Pool>;

        pub struct $repo_impl<E> {
            executor: E,
        }

        impl<'c, E> $repo_impl<E>
        where
            for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
        {
            pub fn new(executor: E) -> Self {
                Self { executor }
            }

            pub async fn create(&self, payload: $create) -> Result<$entity> {
                let record = sqlx::query_as::<_, $entity>(concat!(
                    "INSERT INTO ",
                    $table,
                    " (name, slug) VALUES (?, ?) RETURNING id, name, slug"
                ))
                .bind(&payload.name)
                .bind(&payload.slug)
                .fetch_one(&self.executor)
                .await
                .map_err(Error::from_unique_violation)?;
                tracing::debug!("Created {} {}", $table, record.slug);
                Ok(record)
            }

            pub async fn list(
                &self,
                params: ListingParams,
                search: Option<&str>,
            ) -> Result<Batch<$entity>> {
                let pattern = search.map(crate::like_pattern);
                let total: u64 = sqlx::query_scalar(concat!(
                    "SELECT count(*) FROM ",
                    $table,
                    " WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\'"
                ))
                .bind(&pattern)
                .fetch_one(&self.executor)
                .await?;
                let rows = sqlx::query_as::<_, $entity>(concat!(
                    "SELECT id, name, slug FROM ",
                    $table,
                    " WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\' ORDER BY name LIMIT ?2 OFFSET ?3"
                ))
                .bind(&pattern)
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

            pub async fn get_by_slug(&self, slug: &str) -> Result<$entity> {
                sqlx::query_as::<_, $entity>(concat!(
                    "SELECT id, name, slug FROM ",
                    $table,
                    " WHERE slug = ?"
                ))
                .bind(slug)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::RecordNotFound(stringify!($entity).to_string()))
            }

            pub async fn delete_by_slug(&self, slug: &str) -> Result<()> {
                let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                    .bind(slug)
                    .execute(&self.executor)
                    .await?;

                if res.rows_affected() == 0 {
                    Err(Error::RecordNotFound(stringify!($entity).to_string()))
                } else {
                    Ok(())
                }
            }
        }
    };
}

pub(crate) use lookup_entity;
