use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use kritika_types::claim::{ApiClaim, RefreshClaim, Role, TimeLimited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// Access and refresh credentials issued together at token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenManager {
    keys: Keys,
    access_validity: std::time::Duration,
    refresh_validity: std::time::Duration,
    header: Header,
    validation: Validation,
}

impl TokenManager {
    pub fn new(
        secret: impl AsRef<[u8]>,
        access_validity: std::time::Duration,
        refresh_validity: std::time::Duration,
    ) -> Self {
        let validation = Validation::default();
        let header = Header::default();
        Self {
            keys: Keys::new(secret),
            access_validity,
            refresh_validity,
            header,
            validation,
        }
    }

    fn issue_with_validity(
        &self,
        mut claims: impl serde::Serialize + TimeLimited,
        validity: std::time::Duration,
    ) -> Result<String> {
        let now = std::time::SystemTime::now();
        claims.set_validity(now + validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    pub fn issue(&self, claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        self.issue_with_validity(claims, self.access_validity)
    }

    /// Issues the access/refresh pair bound to one user identity.
    pub fn issue_pair(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
        superuser: bool,
    ) -> Result<TokenPair> {
        let access = ApiClaim::new_expired(user_id, username, role, superuser);
        let refresh = RefreshClaim::new_expired(user_id);
        Ok(TokenPair {
            access_token: self.issue_with_validity(access, self.access_validity)?,
            refresh_token: self.issue_with_validity(refresh, self.refresh_validity)?,
        })
    }

    #[cfg(test)]
    pub fn issue_expired(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let now = std::time::SystemTime::now();
        claims.set_validity(now - self.access_validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    pub fn validate<T>(&self, token: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let data = decode::<T>(token, &self.keys.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn access_validity(&self) -> std::time::Duration {
        self.access_validity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(
            "secret",
            std::time::Duration::from_secs(3600),
            std::time::Duration::from_secs(24 * 3600),
        )
    }

    #[test]
    fn test_token() {
        let claim = ApiClaim::new_expired(123, "bob", Role::Moderator, false);
        let manager = manager();
        let token = manager.issue(claim).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        assert!(res.is_ok());
        let claim = res.unwrap();
        assert_eq!(claim.sub, "123");
        assert_eq!(claim.username, "bob");
        assert!(claim.role.is_moderator());
        assert!(claim.check_validity());
    }

    #[test]
    fn test_token_pair() {
        let manager = manager();
        let pair = manager.issue_pair(7, "alice", Role::User, true).unwrap();
        let access = manager.validate::<ApiClaim>(&pair.access_token).unwrap();
        assert_eq!(access.user_id(), Some(7));
        assert!(access.superuser);
        let refresh = manager
            .validate::<RefreshClaim>(&pair.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, "7");
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_token_expiration() {
        let claim = ApiClaim::new_expired(123, "bob", Role::User, false);
        let manager = manager();
        let token = manager.issue_expired(claim).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        assert!(res.is_err());
        assert!(res.unwrap_err().is_expired());
    }
}
