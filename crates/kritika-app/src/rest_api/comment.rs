use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use kritika_dal::{
    comment::{CommentRepository, CreateComment, UpdateComment},
    review::ReviewRepository,
};
use kritika_types::claim::ApiClaim;

use crate::{
    error::{ApiError, ApiResult},
    policy::{Action, COMMENT_POLICY},
    repository_from_request,
    state::AppState,
};

repository_from_request!(CommentRepository);

pub async fn list(
    Path((title_id, review_id)): Path<(i64, i64)>,
    reviews: ReviewRepository,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    // Resolving through the title catches a review reached by the wrong path.
    let review = reviews.get_for_title(title_id, review_id).await?;
    let comments = repository.list_for_review(review.id).await?;
    Ok((StatusCode::OK, Json(comments)))
}

pub async fn get_one(
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    reviews: ReviewRepository,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let review = reviews.get_for_title(title_id, review_id).await?;
    let comment = repository.get_for_review(review.id, id).await?;
    Ok((StatusCode::OK, Json(comment)))
}

pub async fn create(
    Path((title_id, review_id)): Path<(i64, i64)>,
    api_user: ApiClaim,
    reviews: ReviewRepository,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let review = reviews.get_for_title(title_id, review_id).await?;
    COMMENT_POLICY.authorize(Some(&api_user), Action::Create, None)?;
    let author_id = api_user.user_id().ok_or(ApiError::Unauthorized)?;
    let comment = repository.create(review.id, author_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update(
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    api_user: ApiClaim,
    reviews: ReviewRepository,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<UpdateComment>>,
) -> ApiResult<impl IntoResponse> {
    let review = reviews.get_for_title(title_id, review_id).await?;
    let comment = repository.get_for_review(review.id, id).await?;
    COMMENT_POLICY.authorize(Some(&api_user), Action::Update, Some(comment.author_id))?;
    let updated = repository.update(comment.id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub async fn delete_one(
    Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
    api_user: ApiClaim,
    reviews: ReviewRepository,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let review = reviews.get_for_title(title_id, review_id).await?;
    let comment = repository.get_for_review(review.id, id).await?;
    COMMENT_POLICY.authorize(Some(&api_user), Action::Delete, Some(comment.author_id))?;
    repository.delete(comment.id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).patch(update).delete(delete_one))
}
