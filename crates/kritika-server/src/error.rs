pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] kritika_dal::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid arguments: {0}")]
    Config(#[from] clap::Error),

    #[error("Invalid listen address: {0}")]
    ListenAddress(#[from] std::net::AddrParseError),
}
