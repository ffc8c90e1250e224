use axum::{extract::State, response::IntoResponse, routing::post, Json};
use axum_valid::Garde;
use garde::Validate;
use http::StatusCode;
use kritika_auth::confirmation;
use kritika_dal::user::UserRepository;
use kritika_types::general::{ValidEmail, ValidUsername};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    mail::OutgoingMail,
    state::AppState,
};

pub mod token;

const CONFIRMATION_SUBJECT: &str = "Confirmation code";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(dive)]
    pub username: ValidUsername,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TokenRequest {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 255))]
    pub confirmation_code: String,
}

/// Creates or refetches the identity, rotates its confirmation code and
/// sends the code out of band. The response never carries the code.
pub async fn signup(
    State(state): State<AppState>,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<SignupRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry
        .ensure_identity(&payload.email, &payload.username)
        .await?;

    let issued = confirmation::generate_code();
    user_registry.set_confirmation(user.id, &issued.digest).await?;

    state
        .mailer()
        .send(OutgoingMail {
            subject: CONFIRMATION_SUBJECT.to_string(),
            body: format!("Confirmation code: {}", issued.code),
            sender: state.config().sender_email.clone(),
            recipients: vec![user.email.clone()],
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Exchanges a pending confirmation code for the access/refresh pair.
/// A code mints exactly one pair, replay requires a fresh signup.
pub async fn token(
    State(state): State<AppState>,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<TokenRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get_by_username(&payload.username).await?;

    let digest = user_registry.confirmation_digest(user.id).await?;
    let matches = digest
        .as_deref()
        .map(|d| confirmation::check_code(&payload.confirmation_code, d))
        .unwrap_or(false);
    if !matches {
        debug!("Confirmation code mismatch for {}", user.username);
        return Err(ApiError::Field(
            "confirmation_code",
            "Invalid confirmation code".to_string(),
        ));
    }

    user_registry.clear_confirmation(user.id).await?;
    let pair = state
        .tokens()
        .issue_pair(user.id, &user.username, user.role, user.is_superuser)?;

    Ok((StatusCode::OK, Json(pair)))
}

/// Builds authentication router - must be nested on /auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
}
