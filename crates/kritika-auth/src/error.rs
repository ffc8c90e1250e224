pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    pub fn is_expired(&self) -> bool {
        let Error::TokenError(e) = self;
        matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
    }
}
