use std::sync::Arc;

use axum::extract::FromRef;
use kritika_auth::token::TokenManager;
use kritika_dal::Pool;

use crate::mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl FromRef<AppState> for () {
    fn from_ref(_input: &AppState) -> Self {}
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, tokens: TokenManager, mailer: Mailer) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                tokens,
                mailer,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn mailer(&self) -> &Mailer {
        &self.state.mailer
    }
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    mailer: Mailer,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub sender_email: String,
    pub default_page_size: u32,
}
