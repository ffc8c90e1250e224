use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Json,
};
use axum_valid::Garde;
use garde::Validate;
use http::StatusCode;
use kritika_dal::user::{CreateUser, UpdateUser, UserRepository};
use kritika_types::{
    claim::ApiClaim,
    general::{ValidEmail, ValidUsername},
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    policy::{Action, USER_POLICY},
    repository_from_request,
    state::AppState,
};

repository_from_request!(UserRepository);

async fn list_users(
    api_user: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    USER_POLICY.authorize(Some(&api_user), Action::List, None)?;
    let users = user_registry.list(kritika_dal::MAX_LIMIT).await?;
    Ok((StatusCode::OK, Json(users)))
}

async fn create_user(
    api_user: ApiClaim,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    USER_POLICY.authorize(Some(&api_user), Action::Create, None)?;
    let user = user_registry.create(payload).await.map_err(|e| match e {
        // Duplicate identity at user creation is a client error, not a race.
        kritika_dal::Error::AlreadyExists(what) => {
            ApiError::BadRequest(format!("{what} already exists"))
        }
        other => ApiError::Dal(other),
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    Path(username): Path<String>,
    api_user: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    USER_POLICY.authorize(Some(&api_user), Action::Retrieve, None)?;
    let user = user_registry.get_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

async fn update_user(
    Path(username): Path<String>,
    api_user: ApiClaim,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    USER_POLICY.authorize(Some(&api_user), Action::Update, None)?;
    let user = user_registry.get_by_username(&username).await?;
    let updated = user_registry.update(user.id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

async fn delete_user(
    Path(username): Path<String>,
    api_user: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    USER_POLICY.authorize(Some(&api_user), Action::Delete, None)?;
    let user = user_registry.get_by_username(&username).await?;
    user_registry.delete(user.id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

/// Self-service profile update. Role and superuser stay out of reach here,
/// changing them is admin territory.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct UpdateProfile {
    #[garde(dive)]
    username: Option<ValidUsername>,
    #[garde(dive)]
    email: Option<ValidEmail>,
    #[garde(length(max = 5000))]
    bio: Option<String>,
}

async fn me_get(
    api_user: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let id = api_user.user_id().ok_or(ApiError::Unauthorized)?;
    let user = user_registry.get(id).await?;
    Ok((StatusCode::OK, Json(user)))
}

async fn me_patch(
    api_user: ApiClaim,
    user_registry: UserRepository,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<impl IntoResponse> {
    if payload.get("role").is_some() {
        return Err(ApiError::Field(
            "role",
            "Role cannot be changed on own profile".to_string(),
        ));
    }
    let update: UpdateProfile = serde_json::from_value(payload)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    update.validate()?;

    let id = api_user.user_id().ok_or(ApiError::Unauthorized)?;
    let updated = user_registry
        .update(
            id,
            UpdateUser {
                username: update.username,
                email: update.email,
                role: None,
                superuser: None,
                bio: update.bio,
            },
        )
        .await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub fn users_router() -> axum::Router<AppState> {
    // Unregistered methods fall back to 405, which covers PUT on any user
    // path and DELETE on the own profile.
    axum::Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me_get).patch(me_patch))
        .route("/{username}", get(get_user).patch(update_user).delete(delete_user))
}
