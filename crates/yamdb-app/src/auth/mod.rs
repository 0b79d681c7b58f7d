pub mod token;

use axum::{extract::State, response::IntoResponse, routing::post, Json};
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use yamdb_auth::generate_confirmation_code;
use yamdb_dal::user::{CreateUser, User, UserRepository};
use yamdb_types::{
    claim::ApiClaim,
    general::{valid_username, ValidEmail},
};

use crate::{
    error::{ApiError, ApiResult},
    mail::Message,
    state::AppState,
    validate::Garde,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[garde(required, inner(custom(valid_username)))]
    pub username: Option<String>,
    #[garde(required, dive)]
    pub email: Option<ValidEmail>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TokenRequest {
    #[garde(required, length(min = 1, max = 150))]
    pub username: Option<String>,
    #[garde(required, length(min = 1, max = 255))]
    pub confirmation_code: Option<String>,
}

fn required(field: &str) -> ApiError {
    ApiError::field(field, "This field is required.")
}

async fn send_code(state: &AppState, user: &User, code: &str) -> ApiResult<()> {
    let message =
        Message::confirmation_code(&state.config().mail_from, &user.email, &user.username, code);
    state.mailer().send(message).await?;
    debug!("Confirmation code sent to {}", user.email);
    Ok(())
}

/// Registers new user or re-sends code to existing one with the same username and email.
pub async fn signup(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<SignupRequest>>,
) -> ApiResult<impl IntoResponse> {
    let username = payload.username.ok_or_else(|| required("username"))?;
    let email = payload.email.ok_or_else(|| required("email"))?;

    let by_username = repository.find_by_username(&username).await?;
    let by_email = repository.find_by_email(email.as_ref()).await?;
    let code = generate_confirmation_code();
    let user = match (by_username, by_email) {
        (Some(user), Some(other)) if user.id == other.id => {
            repository.set_confirmation_code(user.id, &code).await?;
            debug!("Re-sending confirmation code to {}", user.username);
            user
        }
        (Some(_), _) => {
            return Err(ApiError::field(
                "username",
                "A user with that username already exists.",
            ))
        }
        (None, Some(_)) => {
            return Err(ApiError::field(
                "email",
                "A user with that email already exists.",
            ))
        }
        (None, None) => {
            let new_user = CreateUser {
                username: Some(username),
                email: Some(email),
                first_name: None,
                last_name: None,
                role: None,
                bio: None,
                is_superuser: false,
            };
            let user = repository.create(new_user, &code).await?;
            info!("New user {} signed up", user.username);
            user
        }
    };

    send_code(&state, &user, &code).await?;
    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Exchanges confirmation code for access token, the code is used up.
pub async fn token(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<TokenRequest>>,
) -> ApiResult<impl IntoResponse> {
    let username = payload.username.ok_or_else(|| required("username"))?;
    let code = payload
        .confirmation_code
        .ok_or_else(|| required("confirmation_code"))?;

    let user = repository.check_confirmation_code(&username, &code).await?;
    repository
        .set_confirmation_code(user.id, &generate_confirmation_code())
        .await?;
    let access = state.tokens().issue(ApiClaim::new_expired(user.id))?;
    debug!("Issued access token for {}", user.username);

    Ok((StatusCode::OK, Json(json!({ "access": access }))))
}

/// Builds authentication router - must be nested on /auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validation() {
        let payload: SignupRequest =
            serde_json::from_str(r#"{"username": "me", "email": "me@example.com"}"#).unwrap();
        let report = payload.validate().unwrap_err();
        assert!(report.to_string().contains("reserved"));

        let payload: SignupRequest = serde_json::from_str(r#"{"username": "jan"}"#).unwrap();
        let errors = crate::error::FieldErrors::from(&payload.validate().unwrap_err());
        assert!(errors.get("email").is_some());
        assert!(errors.get("username").is_none());

        let payload: SignupRequest =
            serde_json::from_str(r#"{"username": "jan.novak+1", "email": "jan@example.com"}"#)
                .unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_token_request_validation() {
        let payload: TokenRequest = serde_json::from_str(r#"{"username": "jan"}"#).unwrap();
        let errors = crate::error::FieldErrors::from(&payload.validate().unwrap_err());
        assert!(errors.get("confirmation_code").is_some());
    }
}
