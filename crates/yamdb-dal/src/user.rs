use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Result as HashResult, SaltString, rand_core::OsRng},
};

use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Connection as _, Executor};
use tracing::debug;
use yamdb_types::{
    claim::Role,
    general::{ValidEmail, valid_username},
};

use crate::{
    BEGIN_WRITE, Batch, ChosenDB, ListingParams,
    error::{Error, Result},
    review::recompute_rating,
};

fn hash_code(code: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let code_hash = argon2.hash_password(code.as_bytes(), &salt)?.to_string();
    Ok(code_hash)
}

fn verify_code(code: &str, code_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(code_hash)?;
    let res = Argon2::default().verify_password(code.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid confirmation code, error {e}");
    }
    Ok(res.is_ok())
}

pub fn is_valid_role(role: &str, _ctx: &()) -> garde::Result {
    role.parse::<Role>().map_err(garde::Error::new).map(|_| ())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(required, inner(custom(valid_username)))]
    pub username: Option<String>,
    #[garde(required, dive)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
    #[garde(inner(custom(is_valid_role)))]
    pub role: Option<String>,
    #[garde(skip)]
    pub bio: Option<String>,
    #[serde(skip)]
    #[garde(skip)]
    pub is_superuser: bool,
}

/// Partial profile update, absent fields are left unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateUser {
    #[garde(inner(custom(valid_username)))]
    pub username: Option<String>,
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(length(max = 150))]
    pub first_name: Option<String>,
    #[garde(length(max = 150))]
    pub last_name: Option<String>,
    #[garde(inner(custom(is_valid_role)))]
    pub role: Option<String>,
    #[garde(skip)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    pub is_superuser: bool,
}

impl User {
    /// Admin role or superuser flag.
    pub fn is_staff(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, bio, is_superuser";

pub type UserRepository = UserRepositoryImpl<crate::Pool>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Creates user with hashed `code` as its confirmation code.
    pub async fn create(&self, payload: CreateUser, code: &str) -> Result<User> {
        let code = hash_code(code)?;
        let email = payload.email.as_ref().map(|e| e.as_ref());
        let role = payload
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| {
                debug!("Role should be validated before: {e}");
                Error::InvalidReference {
                    field: "role",
                    value: payload.role.clone().unwrap_or_default(),
                }
            })?
            .unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, role, bio, is_superuser, confirmation_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.username)
        .bind(email)
        .bind(payload.first_name.as_deref().unwrap_or_default())
        .bind(payload.last_name.as_deref().unwrap_or_default())
        .bind(role.as_str())
        .bind(&payload.bio)
        .bind(payload.is_superuser)
        .bind(code)
        .execute(&self.executor)
        .await
        .map_err(Error::from_unique_violation)?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Batch<User>> {
        let pattern = search.map(crate::like_pattern);
        let total: u64 = sqlx::query_scalar(
            "SELECT count(*) FROM users WHERE ?1 IS NULL OR username LIKE ?1 ESCAPE '\\'",
        )
        .bind(&pattern)
        .fetch_one(&self.executor)
        .await?;
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ?1 IS NULL OR username LIKE ?1 ESCAPE '\\'
            ORDER BY role, username LIMIT ?2 OFFSET ?3"
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

    pub async fn get(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
                .bind(username)
                .fetch_optional(&self.executor)
                .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.executor)
                .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    pub async fn update(&self, id: i64, payload: UpdateUser) -> Result<User> {
        let email = payload.email.as_ref().map(|e| e.as_ref());
        let role = payload
            .role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .map(|r| r.as_str());
        let result = sqlx::query(
            "UPDATE users SET
            username = COALESCE(?, username),
            email = COALESCE(?, email),
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            role = COALESCE(?, role),
            bio = COALESCE(?, bio)
            WHERE id = ?",
        )
        .bind(&payload.username)
        .bind(email)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(role)
        .bind(&payload.bio)
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(Error::from_unique_violation)?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            self.get(id).await
        }
    }

    /// Deletes user with all their reviews and comments, ratings of affected titles are recomputed.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let reviewed_titles: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT title_id FROM review WHERE author_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::RecordNotFound("User".to_string()));
        }

        for title_id in reviewed_titles {
            recompute_rating(title_id, &mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Replaces stored confirmation code, previous one stops working.
    pub async fn set_confirmation_code(&self, id: i64, code: &str) -> Result<()> {
        let code = hash_code(code)?;
        let res = sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
            .bind(code)
            .bind(id)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    /// Unknown username is [`Error::RecordNotFound`], wrong or unset code is [`Error::InvalidCredentials`].
    pub async fn check_confirmation_code(&self, username: &str, code: &str) -> Result<User> {
        let (id, code_hash): (i64, Option<String>) =
            sqlx::query_as("SELECT id, confirmation_code FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        if let Some(code_hash) = code_hash {
            if verify_code(code, &code_hash).unwrap_or(false) {
                return self.get(id).await;
            }
        }
        Err(Error::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_hash() {
        let hash = hash_code("abcd1234").unwrap();
        assert_ne!(hash, "abcd1234");
        assert!(verify_code("abcd1234", &hash).unwrap());
        assert!(!verify_code("abcd1235", &hash).unwrap());
    }

    #[test]
    fn test_create_user_validation() {
        let payload: CreateUser =
            serde_json::from_str(r#"{"username": "me", "email": "me@example.com"}"#).unwrap();
        let report = payload.validate().unwrap_err();
        assert!(report.iter().any(|(path, _)| path.to_string() == "username"));

        let payload: CreateUser = serde_json::from_str(r#"{"username": "pepa"}"#).unwrap();
        let report = payload.validate().unwrap_err();
        assert!(report.iter().any(|(path, _)| path.to_string() == "email"));

        let payload: CreateUser = serde_json::from_str(
            r#"{"username": "pepa", "email": "pepa@example.com", "role": "owner"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());

        let payload: CreateUser = serde_json::from_str(
            r#"{"username": "pepa", "email": "pepa@example.com", "role": "moderator", "is_superuser": true}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
        assert!(!payload.is_superuser);
    }
}
