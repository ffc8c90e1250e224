pub mod category;
pub mod comment;
pub mod genre;
pub mod paging;
pub mod review;
pub mod title;

pub use paging::{Page, Paging};

/// Taxonomy entities expose the same surface: public list, admin-only
/// create and delete, records addressed by slug.
#[macro_export]
macro_rules! value_api {
    ($entity:ident) => {
        paste::paste! {
            use kritika_dal::[<$entity:lower>]::{[<Create $entity>], [<$entity Repository>]};

            $crate::repository_from_request!([<$entity Repository>]);

            pub mod crud_api {
                use super::*;
                use axum::{
                    extract::{Path, Query},
                    response::IntoResponse,
                    Json,
                };
                use axum_valid::Garde;
                use http::StatusCode;
                use $crate::error::ApiResult;
                use $crate::rest_api::paging::SearchQuery;

                pub async fn create(
                    repository: [<$entity Repository>],
                    Garde(Json(payload)): Garde<Json<[<Create $entity>]>>,
                ) -> ApiResult<impl IntoResponse> {
                    let record = repository.create(payload).await?;

                    Ok((StatusCode::CREATED, Json(record)))
                }

                pub async fn list(
                    repository: [<$entity Repository>],
                    Query(query): Query<SearchQuery>,
                ) -> ApiResult<impl IntoResponse> {
                    let records = repository.list(query.search.as_deref()).await?;
                    Ok((StatusCode::OK, Json(records)))
                }

                pub async fn get(
                    Path(slug): Path<String>,
                    repository: [<$entity Repository>],
                ) -> ApiResult<impl IntoResponse> {
                    let record = repository.get_by_slug(&slug).await?;

                    Ok((StatusCode::OK, Json(record)))
                }

                pub async fn delete(
                    Path(slug): Path<String>,
                    repository: [<$entity Repository>],
                ) -> ApiResult<impl IntoResponse> {
                    repository.delete_by_slug(&slug).await?;

                    Ok((StatusCode::NO_CONTENT, ()))
                }
            }

            pub fn router() -> axum::Router<$crate::state::AppState> {
                use $crate::auth::token::RequiredRolesLayer;
                use axum::routing::{delete, get, post};
                use kritika_types::claim::Role;
                axum::Router::new()
                    .route("/", post(crud_api::create))
                    .route("/{slug}", delete(crud_api::delete))
                    .layer(RequiredRolesLayer::new([Role::Admin]))
                    .route("/", get(crud_api::list))
                    .route("/{slug}", get(crud_api::get))
            }
        }
    };
}
