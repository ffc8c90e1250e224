use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use kritika_dal::{
    review::{CreateReview, ReviewRepository, UpdateReview},
    title::TitleRepository,
};
use kritika_types::claim::ApiClaim;

use crate::{
    error::{ApiError, ApiResult},
    policy::{Action, REVIEW_POLICY},
    repository_from_request,
    state::AppState,
};

repository_from_request!(ReviewRepository);

pub async fn list(
    Path(title_id): Path<i64>,
    titles: TitleRepository,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    titles.exists(title_id).await?;
    let reviews = repository.list_for_title(title_id).await?;
    Ok((StatusCode::OK, Json(reviews)))
}

pub async fn get_one(
    Path((title_id, id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get_for_title(title_id, id).await?;
    Ok((StatusCode::OK, Json(review)))
}

pub async fn create(
    Path(title_id): Path<i64>,
    api_user: ApiClaim,
    titles: TitleRepository,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    titles.exists(title_id).await?;
    REVIEW_POLICY.authorize(Some(&api_user), Action::Create, None)?;
    let author_id = api_user.user_id().ok_or(ApiError::Unauthorized)?;
    let review = repository.create(title_id, author_id, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update(
    Path((title_id, id)): Path<(i64, i64)>,
    api_user: ApiClaim,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<UpdateReview>>,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get_for_title(title_id, id).await?;
    REVIEW_POLICY.authorize(Some(&api_user), Action::Update, Some(review.author_id))?;
    let updated = repository.update(review.id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub async fn delete_one(
    Path((title_id, id)): Path<(i64, i64)>,
    api_user: ApiClaim,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get_for_title(title_id, id).await?;
    REVIEW_POLICY.authorize(Some(&api_user), Action::Delete, Some(review.author_id))?;
    repository.delete(review.id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    // Param name must match the nested comment path under the same prefix.
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{review_id}", get(get_one).patch(update).delete(delete_one))
}
