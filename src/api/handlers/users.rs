//! User management endpoints.
//!
//! All routes sit behind the session gate. Deletion is soft: the record is
//! marked inactive and returned. Listings exclude inactive users while
//! lookup-by-id still returns them (admin lookup vs. public listing).

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::users::{repo, User};

use super::super::envelope::{ApiError, Envelope};
use super::{normalize_email, normalize_optional, valid_email, NAME_MAX_LENGTH};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created.", body = UserData),
        (status = 400, description = "Invalid input or email already in use."),
        (status = 401, description = "Missing or invalid session cookie.")
    ),
    tag = "users"
)]
pub async fn create_user(
    pool: Extension<PgPool>,
    payload: Option<Json<CreateUserRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return ApiError::Validation("Missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return ApiError::Validation("email must be an email".to_string()).into_response();
    }
    let name = match validate_name(request.name) {
        Ok(name) => name,
        Err(err) => return err.into_response(),
    };

    match repo::create(&pool, &email, name.as_deref()).await {
        Ok(user) => Envelope::new(UserData::from(user)).into_response(),
        Err(err) if repo::is_unique_violation(&err) => {
            ApiError::Validation("Email already in use".to_string()).into_response()
        }
        Err(err) => ApiError::Internal(err.into()).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All active users, newest first.", body = [UserData]),
        (status = 401, description = "Missing or invalid session cookie.")
    ),
    tag = "users"
)]
pub async fn list_users(pool: Extension<PgPool>) -> impl IntoResponse {
    match repo::list_active(&pool).await {
        Ok(users) => {
            let data: Vec<UserData> = users.into_iter().map(UserData::from).collect();
            Envelope::new(data).into_response()
        }
        Err(err) => ApiError::Internal(err.into()).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found (soft-deleted users included).", body = UserData),
        (status = 400, description = "Invalid user id."),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 404, description = "User not found.")
    ),
    tag = "users"
)]
pub async fn get_user(Path(id): Path<String>, pool: Extension<PgPool>) -> impl IntoResponse {
    let user_id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match repo::fetch(&pool, user_id).await {
        Ok(Some(user)) => Envelope::new(UserData::from(user)).into_response(),
        Ok(None) => ApiError::NotFound("User not found").into_response(),
        Err(err) => ApiError::Internal(err.into()).into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    request_body = UpdateUserRequest,
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User updated.", body = UserData),
        (status = 400, description = "Invalid input."),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 404, description = "User not found.")
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    payload: Option<Json<UpdateUserRequest>>,
) -> impl IntoResponse {
    let user_id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    // An absent body is an empty update: the record is returned unchanged.
    let name = payload.and_then(|Json(request)| request.name);
    let name = match validate_name(name) {
        Ok(name) => name,
        Err(err) => return err.into_response(),
    };

    match repo::update_name(&pool, user_id, name.as_deref()).await {
        Ok(Some(user)) => Envelope::new(UserData::from(user)).into_response(),
        Ok(None) => ApiError::NotFound("User not found").into_response(),
        Err(err) => ApiError::Internal(err.into()).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User soft-deleted; returns the updated record.", body = UserData),
        (status = 400, description = "Invalid user id."),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 404, description = "User not found.")
    ),
    tag = "users"
)]
pub async fn delete_user(Path(id): Path<String>, pool: Extension<PgPool>) -> impl IntoResponse {
    let user_id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match repo::soft_delete(&pool, user_id).await {
        Ok(Some(user)) => Envelope::new(UserData::from(user)).into_response(),
        Ok(None) => ApiError::NotFound("User not found").into_response(),
        Err(err) => ApiError::Internal(err.into()).into_response(),
    }
}

fn parse_user_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::Validation("Validation failed (uuid is expected)".to_string()))
}

fn validate_name(name: Option<String>) -> Result<Option<String>, ApiError> {
    let name = normalize_optional(name);
    if let Some(name) = &name {
        if name.chars().count() > NAME_MAX_LENGTH {
            return Err(ApiError::Validation(format!(
                "name must be shorter than or equal to {NAME_MAX_LENGTH} characters"
            )));
        }
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::http::StatusCode;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<Extension<PgPool>> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .context("failed to build lazy pool")?;
        Ok(Extension(pool))
    }

    #[tokio::test]
    async fn create_user_missing_payload() -> Result<()> {
        let response = create_user(lazy_pool()?, None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn create_user_invalid_email() -> Result<()> {
        let response = create_user(
            lazy_pool()?,
            Some(Json(CreateUserRequest {
                email: "nope".to_string(),
                name: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn create_user_name_too_long() -> Result<()> {
        let response = create_user(
            lazy_pool()?,
            Some(Json(CreateUserRequest {
                email: "a@example.com".to_string(),
                name: Some("x".repeat(NAME_MAX_LENGTH + 1)),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn get_user_rejects_non_uuid() -> Result<()> {
        let response = get_user(Path("not-a-uuid".to_string()), lazy_pool()?)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn update_user_rejects_non_uuid() -> Result<()> {
        let response = update_user(Path("42".to_string()), lazy_pool()?, None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn delete_user_rejects_non_uuid() -> Result<()> {
        let response = delete_user(Path(String::new()), lazy_pool()?)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[test]
    fn validate_name_normalizes_and_bounds() {
        assert!(matches!(validate_name(None), Ok(None)));
        assert!(matches!(validate_name(Some("  ".to_string())), Ok(None)));
        assert_eq!(
            validate_name(Some(" Bob ".to_string())).ok().flatten(),
            Some("Bob".to_string())
        );
        assert!(validate_name(Some("x".repeat(NAME_MAX_LENGTH + 1))).is_err());
        assert!(validate_name(Some("x".repeat(NAME_MAX_LENGTH))).is_ok());
    }

    #[test]
    fn user_data_serializes_camel_case() -> Result<()> {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: None,
            is_active: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(UserData::from(user))?;
        assert_eq!(value["isActive"], serde_json::Value::Bool(false));
        assert!(value.get("createdAt").is_some());
        Ok(())
    }
}
