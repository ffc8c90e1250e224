use clap::Parser;
use kritika_types::{
    claim::Role,
    config::BackendConfig,
    general::{ValidEmail, ValidUsername},
};

use crate::commands::Executor;

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name")]
    pub username: ValidUsername,
    #[arg(short, long, help = "User email")]
    pub email: ValidEmail,
    #[arg(
        short,
        long,
        help = "Role of the user (user, moderator or admin), defaults to plain user"
    )]
    pub role: Option<Role>,
    #[arg(long, help = "Grant the superuser override")]
    pub superuser: bool,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let db_url = self.backend.database_url();
        let pool = kritika_dal::new_pool(&db_url).await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;

        let repository = kritika_dal::user::UserRepository::new(pool);
        let new_user = kritika_dal::user::CreateUser {
            username: self.username,
            email: self.email,
            role: self.role,
            superuser: Some(self.superuser),
            bio: None,
        };
        let user = repository.create(new_user).await?;
        tracing::info!("Created user {} with role {}", user.username, user.role);

        Ok(())
    }
}
