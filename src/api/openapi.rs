//! OpenAPI document assembly for the Swagger UI mounted at `/docs`.

use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::request_code,
        handlers::auth::confirm_code,
        handlers::auth::refresh,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(schemas(
        handlers::auth::RequestCodeRequest,
        handlers::auth::RequestCodeData,
        handlers::auth::ConfirmCodeRequest,
        handlers::auth::ConfirmCodeData,
        handlers::users::CreateUserRequest,
        handlers::users::UpdateUserRequest,
        handlers::users::UserData,
    )),
    tags(
        (name = "auth", description = "Passwordless email-code authentication"),
        (name = "users", description = "User management (soft delete)"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
