use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use kritika_dal::title::{CreateTitle, TitleFilter, TitleRepository};
use kritika_types::claim::Role;
use serde::Deserialize;

use crate::{
    auth::token::RequiredRolesLayer,
    error::ApiResult,
    repository_from_request,
    rest_api::{Page, Paging},
    state::AppState,
};

repository_from_request!(TitleRepository);

#[derive(Debug, Clone, Deserialize)]
pub struct TitleQuery {
    category: Option<String>,
    genre: Option<String>,
    name: Option<String>,
    year: Option<i64>,
}

impl From<TitleQuery> for TitleFilter {
    fn from(value: TitleQuery) -> Self {
        TitleFilter {
            category: value.category,
            genre: value.genre,
            name: value.name,
            year: value.year,
        }
    }
}

pub async fn list(
    repository: TitleRepository,
    State(state): State<AppState>,
    Query(filter): Query<TitleQuery>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size: u32 = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params, filter.into()).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn get_one(
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(payload).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    Path(id): Path<i64>,
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.update(id, payload).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn delete_one(
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    // Param name must match the nested review path under the same prefix.
    axum::Router::new()
        .route("/", post(create))
        .route("/{title_id}", put(update).delete(delete_one))
        .layer(RequiredRolesLayer::new([Role::Admin]))
        .route("/", get(list))
        .route("/{title_id}", get(get_one))
}
